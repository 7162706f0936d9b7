//! OSM REST API outbound adapter.

mod http_source;

pub use http_source::OsmApiHttpSource;
