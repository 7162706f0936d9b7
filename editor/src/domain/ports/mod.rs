//! Driven ports for the upstream OSM query services.

mod macros;
pub(crate) use macros::define_port_error;

mod element_source;
mod osm_api_source;
mod overpass_source;

pub use element_source::{ElementBatch, ElementSourceError};
#[cfg(test)]
pub use osm_api_source::MockOsmApiSource;
pub use osm_api_source::{FixtureOsmApiSource, OsmApiSource};
#[cfg(test)]
pub use overpass_source::MockOverpassSource;
pub use overpass_source::{FixtureOverpassSource, OverpassQuery, OverpassSource};
