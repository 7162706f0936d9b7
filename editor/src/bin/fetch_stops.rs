//! Fetch transit stops covering a bounding box into a fresh working set.
//!
//! # Examples
//! ```sh
//! OSM_GTFS_CONTACT=maps@example.org \
//!   cargo run --bin fetch-stops -- --bbox -3.21,55.94,-3.17,55.96 --export out
//! ```
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use ortho_config::OrthoConfig;
use osm_gtfs_editor::EditorSettings;
use osm_gtfs_editor::domain::{
    ChangesetWriter, OsmElement, QueryQueue, QueryQueuePorts, WorkingSet, lock_working_set,
};
use osm_gtfs_editor::outbound::changeset_file::write_changeset;
use osm_gtfs_editor::outbound::osm_api::OsmApiHttpSource;
use osm_gtfs_editor::outbound::overpass::OverpassHttpSource;
use slippy_tiles::{BoundingBox, Tile};
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use url::Url;

/// `fetch-stops` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "fetch-stops",
    about = "Load OSM transit stops for an area and optionally export the changeset",
    version
)]
struct CliArgs {
    /// Area as `min_lng,min_lat,max_lng,max_lat`.
    #[arg(
        long = "bbox",
        value_name = "min_lng,min_lat,max_lng,max_lat",
        value_parser = parse_bbox
    )]
    bbox: [f64; 4],
    /// Also fetch route and route master relations.
    #[arg(long = "routes")]
    routes: bool,
    /// Directory receiving `gtfs-changes.osm`.
    #[arg(long = "export", value_name = "dir")]
    export: Option<PathBuf>,
}

fn main() -> io::Result<()> {
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %error, "tracing init failed");
    }

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    // Command-line flags belong to this binary; settings come from the
    // environment and configuration files only.
    let settings = EditorSettings::load_from_iter([OsString::from("fetch-stops")])
        .map_err(|error| io::Error::other(format!("load settings: {error}")))?;

    let queue = build_queue(&settings)?;
    let tiles = area_tiles(args.bbox, settings.tile_zoom(), settings.max_tiles())?;
    info!(tiles = tiles.len(), zoom = settings.tile_zoom(), "fetching area");

    let stops = queue
        .query_stops_for_tiles(&tiles)
        .await
        .map_err(|error| io::Error::other(format!("query stops: {error}")))?;
    println!(
        "stops: queried={} failed={} inserted={}",
        stops.queried, stops.failed, stops.inserted
    );
    if args.routes {
        let routes = queue
            .query_routes_for_tiles(&tiles)
            .await
            .map_err(|error| io::Error::other(format!("query routes: {error}")))?;
        println!(
            "routes: queried={} failed={} inserted={}",
            routes.queried, routes.failed, routes.inserted
        );
    }

    let working_set = lock_working_set(queue.working_set())
        .map_err(|error| io::Error::other(error.to_string()))?;
    for element in working_set.elements().iter().filter(|element| is_stop(element)) {
        let Some(position) = working_set.get_lon_lat(element) else {
            continue;
        };
        println!(
            "{} {} {} {}",
            element.key(),
            position.lon,
            position.lat,
            element.tags().get("name").map_or("-", String::as_str)
        );
    }

    if let Some(dir) = args.export {
        let xml = working_set.export_changeset(&ChangesetWriter::new(settings.generator()));
        let path = write_changeset(&dir, &xml)
            .map_err(|error| io::Error::other(format!("export '{}': {error}", dir.display())))?;
        println!("wrote {}", path.display());
    }

    Ok(())
}

fn build_queue(settings: &EditorSettings) -> io::Result<QueryQueue> {
    let overpass_url = parse_url(settings.overpass_url())?;
    let osm_api_url = parse_url(settings.osm_api_url())?;
    let identity = settings.http_identity();

    let overpass = OverpassHttpSource::with_identity(
        overpass_url,
        settings.request_timeout(),
        identity.clone(),
    )
    .map_err(|error| io::Error::other(format!("build overpass client: {error}")))?;
    let osm_api = OsmApiHttpSource::new(osm_api_url, settings.request_timeout(), identity)
        .map_err(|error| io::Error::other(format!("build osm api client: {error}")))?;

    Ok(QueryQueue::new(
        WorkingSet::new().into_shared(),
        QueryQueuePorts {
            overpass: Arc::new(overpass),
            osm_api: Arc::new(osm_api),
        },
        settings.query_queue_config(),
    ))
}

fn parse_url(raw: &str) -> io::Result<Url> {
    Url::parse(raw).map_err(|error| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid URL '{raw}': {error}"),
        )
    })
}

fn is_stop(element: &OsmElement) -> bool {
    let tags = element.tags();
    tags.get("highway").is_some_and(|value| value == "bus_stop")
        || tags
            .get("public_transport")
            .is_some_and(|value| value == "platform" || value == "stop_position")
        || tags.get("railway").is_some_and(|value| value == "tram_stop")
}

/// Tiles covering `bbox`, refusing areas over the configured tile budget
/// before any tile is enumerated.
fn area_tiles(bbox: [f64; 4], zoom: u8, max_tiles: u64) -> io::Result<Vec<Tile>> {
    BoundingBox::from_lng_lat_bounds(bbox)
        .covering_tiles_at_most(zoom, max_tiles)
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidInput, error.to_string()))
}

fn parse_bbox(raw: &str) -> Result<[f64; 4], String> {
    let values = raw
        .split(',')
        .map(str::trim)
        .map(str::parse::<f64>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| format!("failed to parse bbox value: {error}"))?;
    let bounds: [f64; 4] = values
        .try_into()
        .map_err(|_| "bbox must contain exactly four comma-separated numeric values".to_owned())?;
    let [min_lng, min_lat, max_lng, max_lat] = bounds;
    if min_lng > max_lng || min_lat > max_lat {
        return Err("bbox minimum must not exceed maximum".to_owned());
    }
    Ok(bounds)
}
