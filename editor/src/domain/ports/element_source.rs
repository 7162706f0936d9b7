//! Shared response contract for OSM element query services.

use crate::domain::element::OsmElement;

use super::define_port_error;

/// Decoded elements returned by one upstream call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementBatch {
    /// Elements in response order.
    pub elements: Vec<OsmElement>,
    /// Response body size in bytes.
    pub transfer_bytes: u64,
}

impl ElementBatch {
    /// Batch with no transfer accounting.
    pub fn from_elements(elements: Vec<OsmElement>) -> Self {
        Self {
            elements,
            transfer_bytes: 0,
        }
    }
}

define_port_error! {
    /// Errors surfaced while calling an element query service.
    pub enum ElementSourceError {
        /// Network transport failed before receiving a response.
        Transport { message: String } =>
            "element source transport failed: {message}",
        /// The call exceeded its timeout.
        Timeout { message: String } =>
            "element source timeout: {message}",
        /// The service rate-limited the request.
        RateLimited { message: String } =>
            "element source rate limited request: {message}",
        /// Response could not be decoded into elements.
        Decode { message: String } =>
            "element source response decode failed: {message}",
        /// Request was rejected before or by the service.
        InvalidRequest { message: String } =>
            "element source request invalid: {message}",
    }
    retryable [Transport, Timeout, RateLimited]
}
