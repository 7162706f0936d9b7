//! Domain model for the OSM working set and its query pipeline.
//!
//! Purpose: own every OSM element the editor knows, track local edits
//! against pristine snapshots, and serialize those edits as an OSM
//! changeset. Upstream services are reached only through the ports in
//! [`ports`].
//!
//! Public surface:
//! - `WorkingSet` / `SharedWorkingSet`: the element arena and change log.
//! - `QueryQueue`: throttled, tile-deduplicated fetches into a working set.
//! - `ChangesetWriter`: OSM 0.6 XML export.
//! - `Error` / `ErrorCode`: domain failures.

pub mod changeset;
pub mod element;
pub mod error;
pub mod geo;
pub mod id_tags;
pub mod notify;
pub mod ports;
pub mod query_queue;
pub mod stop_preset;
pub mod tag_edit;
pub mod working_set;

pub use self::changeset::{ChangesetWriter, EXPORT_FILE_NAME, escape_xml, unescape_xml};
pub use self::element::{
    ElementDecodeError, ElementKey, ElementType, LonLat, Node, OsmElement, Relation,
    RelationMember, Tags, Way, filter_blank_tags,
};
pub use self::error::{Error, ErrorCode};
pub use self::id_tags::{IdTagConvention, MatchReportMetadata};
pub use self::notify::{EventCause, WorkingSetEvent};
pub use self::query_queue::{
    FeatureLoadReport, IdQueryReport, QueryQueue, QueryQueueConfig, QueryQueuePorts,
    QueryTemplate, Throttle, TileQueryReport,
};
pub use self::stop_preset::{NewStop, route_type_tags};
pub use self::tag_edit::{TagCommitError, TagEditError, TagRow, TagRows};
pub use self::working_set::{
    ChangeAction, ChangeRecord, ChangeView, GeoJsonFilter, IncomingDecision,
    IncomingElementPolicy, SharedWorkingSet, WorkingSet, lock_working_set,
};
