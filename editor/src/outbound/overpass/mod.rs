//! Overpass outbound adapter.

mod http_source;

pub use http_source::OverpassHttpSource;
