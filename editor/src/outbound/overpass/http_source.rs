//! Reqwest-backed Overpass adapter.
//!
//! Owns transport details only: form encoding of the query, identity
//! headers, HTTP error mapping, and JSON decoding into domain elements.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use crate::domain::ports::{ElementBatch, ElementSourceError, OverpassQuery, OverpassSource};
use crate::outbound::http_support::{
    HttpIdentity, map_status_error, map_transport_error, parse_elements,
};

/// Overpass adapter issuing form-encoded POST requests against one endpoint.
pub struct OverpassHttpSource {
    client: Client,
    endpoint: Url,
    identity: HttpIdentity,
}

impl OverpassHttpSource {
    /// Build an adapter with the default identity.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        Self::with_identity(endpoint, timeout, HttpIdentity::default())
    }

    /// Build an adapter with an explicit identity.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_identity(
        endpoint: Url,
        timeout: Duration,
        identity: HttpIdentity,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            identity,
        })
    }

    /// Target endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl OverpassSource for OverpassHttpSource {
    async fn run_query(&self, query: &OverpassQuery) -> Result<ElementBatch, ElementSourceError> {
        if query.query.trim().is_empty() {
            return Err(ElementSourceError::invalid_request("query must not be blank"));
        }

        let response = self
            .identity
            .apply(self.client.post(self.endpoint.clone()))
            .form(&[("data", query.query.as_str())])
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        let transfer_bytes = body.len() as u64;
        let elements = parse_elements(body.as_ref())?;
        debug!(
            request_id = %query.request_id,
            elements = elements.len(),
            transfer_bytes,
            "overpass response decoded"
        );
        Ok(ElementBatch {
            elements,
            transfer_bytes,
        })
    }
}
