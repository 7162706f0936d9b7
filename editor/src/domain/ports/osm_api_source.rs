//! Driven port for OSM REST API lookups by id.

use async_trait::async_trait;

use super::{ElementBatch, ElementSourceError};

/// Port for batched node and way lookups.
///
/// Callers keep batches within the service's per-request id limit.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OsmApiSource: Send + Sync {
    /// Fetch the given nodes.
    async fn fetch_nodes(&self, ids: &[i64]) -> Result<ElementBatch, ElementSourceError>;

    /// Fetch the given ways. Referenced nodes are not included.
    async fn fetch_ways(&self, ids: &[i64]) -> Result<ElementBatch, ElementSourceError>;
}

/// Fixture implementation returning empty batches.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureOsmApiSource;

#[async_trait]
impl OsmApiSource for FixtureOsmApiSource {
    async fn fetch_nodes(&self, _ids: &[i64]) -> Result<ElementBatch, ElementSourceError> {
        Ok(ElementBatch::default())
    }

    async fn fetch_ways(&self, _ids: &[i64]) -> Result<ElementBatch, ElementSourceError> {
        Ok(ElementBatch::default())
    }
}
