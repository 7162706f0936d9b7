//! Throttled, deduplicated queries against the upstream OSM services.
//!
//! The queue mediates every call to Overpass and the OSM REST API. Calls
//! share one [`Throttle`], tiles are claimed before their query is issued so
//! the same tile is never fetched twice, and failures are logged and counted
//! rather than propagated. A failed tile is released so a later call can
//! retry it.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use slippy_tiles::Tile;
use tracing::{debug, info, warn};

use crate::domain::Error;
use crate::domain::element::{ElementKey, ElementType, LonLat};
use crate::domain::ports::{
    ElementBatch, ElementSourceError, OsmApiSource, OverpassQuery, OverpassSource,
};
use crate::domain::working_set::{SharedWorkingSet, lock_working_set};

mod templates;
mod throttle;

pub use templates::QueryTemplate;
pub use throttle::{DEFAULT_COOLDOWN, Throttle, ThrottlePermit};

/// Default cap on ids per REST request.
pub const DEFAULT_MAX_IDS_PER_REQUEST: usize = 100;

/// Queue tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryQueueConfig {
    /// Minimum spacing between outbound requests.
    pub cooldown: Duration,
    /// Maximum ids in one REST request.
    pub max_ids_per_request: usize,
}

impl Default for QueryQueueConfig {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            max_ids_per_request: DEFAULT_MAX_IDS_PER_REQUEST,
        }
    }
}

/// Upstream sources used by the queue.
#[derive(Clone)]
pub struct QueryQueuePorts {
    /// Overpass endpoint.
    pub overpass: Arc<dyn OverpassSource>,
    /// OSM REST API.
    pub osm_api: Arc<dyn OsmApiSource>,
}

/// Outcome of a tile query call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileQueryReport {
    /// Tiles fetched successfully.
    pub queried: usize,
    /// Tiles already fetched or in flight.
    pub skipped: usize,
    /// Tiles whose query failed; they may be retried.
    pub failed: usize,
    /// Elements newly inserted into the working set.
    pub inserted: usize,
}

/// Outcome of an id query call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdQueryReport {
    /// Ids requested from the REST API, way nodes included.
    pub requested: usize,
    /// Requested ids that were already loaded.
    pub skipped: usize,
    /// REST calls issued.
    pub batches: usize,
    /// REST calls that failed.
    pub failed_batches: usize,
    /// Elements newly inserted into the working set.
    pub inserted: usize,
}

/// Outcome of [`QueryQueue::load_features`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureLoadReport {
    /// Features that were not loaded when the call started.
    pub missing: usize,
    /// Id lookups for the missing nodes and ways.
    pub ids: IdQueryReport,
    /// Stop queries for the tiles around the missing features.
    pub tiles: TileQueryReport,
}

/// Query mediator bound to one working set.
pub struct QueryQueue {
    working_set: SharedWorkingSet,
    overpass: Arc<dyn OverpassSource>,
    osm_api: Arc<dyn OsmApiSource>,
    throttle: Throttle,
    max_ids_per_request: usize,
    queried_tiles: Mutex<HashSet<String>>,
}

impl QueryQueue {
    /// Build a queue feeding `working_set`.
    pub fn new(
        working_set: SharedWorkingSet,
        ports: QueryQueuePorts,
        config: QueryQueueConfig,
    ) -> Self {
        Self {
            working_set,
            overpass: ports.overpass,
            osm_api: ports.osm_api,
            throttle: Throttle::new(config.cooldown),
            max_ids_per_request: config.max_ids_per_request.max(1),
            queried_tiles: Mutex::new(HashSet::new()),
        }
    }

    /// Working set fed by this queue.
    pub fn working_set(&self) -> &SharedWorkingSet {
        &self.working_set
    }

    /// Whether `template` has been fetched, or is in flight, for `tile`.
    ///
    /// # Errors
    /// Returns [`Error::internal`] when the tile registry lock is poisoned.
    pub fn is_tile_queried(&self, template: QueryTemplate, tile: &Tile) -> Result<bool, Error> {
        Ok(self.tiles()?.contains(&template.dedup_key(tile)))
    }

    /// Fetch transit stops for every tile not yet queried.
    ///
    /// # Errors
    /// Returns [`Error::internal`] only when shared state is poisoned;
    /// upstream failures are counted in the report.
    pub async fn query_stops_for_tiles(&self, tiles: &[Tile]) -> Result<TileQueryReport, Error> {
        self.query_tiles(QueryTemplate::Stops, tiles).await
    }

    /// Fetch route and route master relations for every tile not yet
    /// queried for routes.
    ///
    /// # Errors
    /// Returns [`Error::internal`] only when shared state is poisoned.
    pub async fn query_routes_for_tiles(&self, tiles: &[Tile]) -> Result<TileQueryReport, Error> {
        self.query_tiles(QueryTemplate::Routes, tiles).await
    }

    async fn query_tiles(
        &self,
        template: QueryTemplate,
        tiles: &[Tile],
    ) -> Result<TileQueryReport, Error> {
        let mut report = TileQueryReport::default();

        for tile in tiles {
            let key = template.dedup_key(tile);
            if !self.tiles()?.insert(key.clone()) {
                report.skipped += 1;
                continue;
            }

            let query = OverpassQuery::new(template.render(tile));
            debug!(
                request_id = %query.request_id,
                template = template.as_str(),
                tile = %tile,
                "issuing overpass query"
            );
            let result = {
                let _permit = self.throttle.acquire().await;
                self.overpass.run_query(&query).await
            };

            match result {
                Ok(batch) => {
                    report.inserted += self.ingest(batch)?;
                    report.queried += 1;
                }
                Err(error) => {
                    warn!(
                        request_id = %query.request_id,
                        template = template.as_str(),
                        tile = %tile,
                        retryable = error.is_retryable(),
                        error = %error,
                        "tile query failed"
                    );
                    self.tiles()?.remove(&key);
                    report.failed += 1;
                }
            }
        }

        info!(
            template = template.as_str(),
            queried = report.queried,
            skipped = report.skipped,
            failed = report.failed,
            inserted = report.inserted,
            "tile queries finished"
        );
        Ok(report)
    }

    /// Fetch specific nodes and ways by id, then any nodes the requested
    /// ways reference that are still missing.
    ///
    /// Ids already loaded are skipped. Each REST call carries at most the
    /// configured number of ids; a failed call is logged and counted.
    ///
    /// # Errors
    /// Returns [`Error::internal`] only when shared state is poisoned.
    pub async fn query_data_by_ids(
        &self,
        node_ids: &[i64],
        way_ids: &[i64],
    ) -> Result<IdQueryReport, Error> {
        let mut report = IdQueryReport::default();

        let missing_ways = self.missing_ids(ElementType::Way, way_ids, &mut report)?;
        self.fetch_in_batches(ElementType::Way, &missing_ways, &mut report)
            .await?;

        let mut missing_nodes = self.missing_ids(ElementType::Node, node_ids, &mut report)?;
        let way_nodes = lock_working_set(&self.working_set)?.missing_way_node_ids(way_ids);
        let mut seen = missing_nodes.iter().copied().collect::<HashSet<_>>();
        missing_nodes.extend(way_nodes.into_iter().filter(|id| seen.insert(*id)));
        self.fetch_in_batches(ElementType::Node, &missing_nodes, &mut report)
            .await?;

        info!(
            requested = report.requested,
            skipped = report.skipped,
            batches = report.batches,
            failed_batches = report.failed_batches,
            inserted = report.inserted,
            "id queries finished"
        );
        Ok(report)
    }

    /// Load report features that are not in the working set yet: fetch the
    /// missing nodes and ways by id, then the stops on the tiles around
    /// every missing feature so their neighbours are available for matching.
    ///
    /// Relations are only covered by the tile queries.
    ///
    /// # Errors
    /// Returns [`Error::invalid_request`] when `zoom` is not a valid tile
    /// zoom, and [`Error::internal`] when shared state is poisoned.
    pub async fn load_features(
        &self,
        features: &[(ElementKey, LonLat)],
        zoom: u8,
    ) -> Result<FeatureLoadReport, Error> {
        let missing = {
            let working_set = lock_working_set(&self.working_set)?;
            features
                .iter()
                .filter(|(key, _)| working_set.get(*key).is_none())
                .copied()
                .collect::<Vec<_>>()
        };
        let mut report = FeatureLoadReport {
            missing: missing.len(),
            ..FeatureLoadReport::default()
        };
        if missing.is_empty() {
            return Ok(report);
        }

        let tiles = missing
            .iter()
            .map(|(_, position)| Tile::containing(position.lon, position.lat, zoom))
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(|error| Error::invalid_request(error.to_string()))?
            .into_iter()
            .collect::<Vec<_>>();

        let ids_of = |element_type: ElementType| {
            missing
                .iter()
                .filter(|(key, _)| key.element_type == element_type)
                .map(|(key, _)| key.id)
                .collect::<Vec<_>>()
        };
        report.ids = self
            .query_data_by_ids(&ids_of(ElementType::Node), &ids_of(ElementType::Way))
            .await?;
        report.tiles = self.query_stops_for_tiles(&tiles).await?;
        Ok(report)
    }

    fn missing_ids(
        &self,
        element_type: ElementType,
        ids: &[i64],
        report: &mut IdQueryReport,
    ) -> Result<Vec<i64>, Error> {
        let working_set = lock_working_set(&self.working_set)?;
        let mut seen = HashSet::new();
        let mut missing = Vec::new();
        for id in ids.iter().copied().filter(|id| seen.insert(*id)) {
            if working_set.get(ElementKey::new(element_type, id)).is_some() {
                report.skipped += 1;
            } else {
                missing.push(id);
            }
        }
        Ok(missing)
    }

    async fn fetch_in_batches(
        &self,
        element_type: ElementType,
        ids: &[i64],
        report: &mut IdQueryReport,
    ) -> Result<(), Error> {
        for chunk in ids.chunks(self.max_ids_per_request) {
            report.requested += chunk.len();
            report.batches += 1;
            debug!(%element_type, count = chunk.len(), "issuing osm api lookup");

            let result = {
                let _permit = self.throttle.acquire().await;
                self.fetch_chunk(element_type, chunk).await
            };
            match result {
                Ok(batch) => report.inserted += self.ingest(batch)?,
                Err(error) => {
                    warn!(
                        %element_type,
                        count = chunk.len(),
                        first_id = chunk.first().copied(),
                        retryable = error.is_retryable(),
                        error = %error,
                        "osm api lookup failed"
                    );
                    report.failed_batches += 1;
                }
            }
        }
        Ok(())
    }

    async fn fetch_chunk(
        &self,
        element_type: ElementType,
        ids: &[i64],
    ) -> Result<ElementBatch, ElementSourceError> {
        match element_type {
            ElementType::Node => self.osm_api.fetch_nodes(ids).await,
            ElementType::Way => self.osm_api.fetch_ways(ids).await,
            ElementType::Relation => Err(ElementSourceError::invalid_request(
                "relations cannot be fetched by id",
            )),
        }
    }

    fn ingest(&self, batch: ElementBatch) -> Result<usize, Error> {
        debug!(
            elements = batch.elements.len(),
            transfer_bytes = batch.transfer_bytes,
            "ingesting batch"
        );
        let mut working_set = lock_working_set(&self.working_set)?;
        Ok(working_set.update_overpass_data(batch.elements))
    }

    fn tiles(&self) -> Result<MutexGuard<'_, HashSet<String>>, Error> {
        self.queried_tiles
            .lock()
            .map_err(|_| Error::internal("queried tile registry poisoned"))
    }
}
