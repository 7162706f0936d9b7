//! OSM working set, edit tracking, and changeset export for matching GTFS
//! stops against OpenStreetMap.
//!
//! The [`domain`] module owns the element model and every rule about edits;
//! [`outbound`] holds the HTTP and filesystem adapters behind its ports.

pub mod config;
pub mod domain;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::EditorSettings;
