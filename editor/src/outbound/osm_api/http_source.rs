//! Reqwest-backed OSM REST API adapter for node and way lookups.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use crate::domain::ports::{ElementBatch, ElementSourceError, OsmApiSource};
use crate::outbound::http_support::{
    HttpIdentity, map_status_error, map_transport_error, parse_elements,
};

/// Adapter issuing `GET /api/0.6/{nodes,ways}.json` requests.
pub struct OsmApiHttpSource {
    client: Client,
    base: Url,
    identity: HttpIdentity,
}

impl OsmApiHttpSource {
    /// Build an adapter for the API rooted at `base`, e.g.
    /// `https://api.openstreetmap.org`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        base: Url,
        timeout: Duration,
        identity: HttpIdentity,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: normalise_base(base),
            identity,
        })
    }

    fn lookup_url(&self, collection: &str, ids: &[i64]) -> Result<Url, ElementSourceError> {
        let mut url = self
            .base
            .join(&format!("api/0.6/{collection}.json"))
            .map_err(|error| ElementSourceError::invalid_request(error.to_string()))?;
        let joined = ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        url.set_query(Some(&format!("{collection}={joined}")));
        Ok(url)
    }

    async fn lookup(
        &self,
        collection: &str,
        ids: &[i64],
    ) -> Result<ElementBatch, ElementSourceError> {
        if ids.is_empty() {
            return Ok(ElementBatch::default());
        }
        let url = self.lookup_url(collection, ids)?;
        debug!(%url, count = ids.len(), "osm api lookup");

        let response = self
            .identity
            .apply(self.client.get(url))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        Ok(ElementBatch {
            transfer_bytes: body.len() as u64,
            elements: parse_elements(body.as_ref())?,
        })
    }
}

#[async_trait]
impl OsmApiSource for OsmApiHttpSource {
    async fn fetch_nodes(&self, ids: &[i64]) -> Result<ElementBatch, ElementSourceError> {
        self.lookup("nodes", ids).await
    }

    async fn fetch_ways(&self, ids: &[i64]) -> Result<ElementBatch, ElementSourceError> {
        self.lookup("ways", ids).await
    }
}

// `Url::join` drops the last path segment unless it ends with a slash.
fn normalise_base(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}
