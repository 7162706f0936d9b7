//! Outbound adapters implementing the domain ports.
//!
//! - **overpass**: Overpass QL over form-encoded POST.
//! - **osm_api**: OSM REST API node and way lookups.
//! - **changeset_file**: capability-scoped export of the changeset document.
//!
//! Adapters translate between transport formats and domain types only.

pub mod changeset_file;
mod element_dto;
mod http_support;
pub mod osm_api;
pub mod overpass;

pub use http_support::{DEFAULT_USER_AGENT, HttpIdentity};
