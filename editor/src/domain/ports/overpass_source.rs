//! Driven port for running Overpass QL queries.

use async_trait::async_trait;
use uuid::Uuid;

use super::{ElementBatch, ElementSourceError};

/// One rendered Overpass query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverpassQuery {
    /// Identifier for log correlation.
    pub request_id: Uuid,
    /// Overpass QL text.
    pub query: String,
}

impl OverpassQuery {
    /// Wrap `query` with a fresh request id.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            query: query.into(),
        }
    }
}

/// Port for the shared Overpass endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OverpassSource: Send + Sync {
    /// Run one query and decode its `elements`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use osm_gtfs_editor::domain::ports::{FixtureOverpassSource, OverpassQuery, OverpassSource};
    ///
    /// # async fn demo() -> Result<(), osm_gtfs_editor::domain::ports::ElementSourceError> {
    /// let batch = FixtureOverpassSource
    ///     .run_query(&OverpassQuery::new("[out:json];node(1);out;"))
    ///     .await?;
    /// assert!(batch.elements.is_empty());
    /// # Ok(())
    /// # }
    /// ```
    async fn run_query(&self, query: &OverpassQuery) -> Result<ElementBatch, ElementSourceError>;
}

/// Fixture implementation returning an empty batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureOverpassSource;

#[async_trait]
impl OverpassSource for FixtureOverpassSource {
    async fn run_query(&self, _query: &OverpassQuery) -> Result<ElementBatch, ElementSourceError> {
        Ok(ElementBatch::default())
    }
}
