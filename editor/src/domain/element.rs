//! OSM element model.
//!
//! Elements are a tagged union over node, way, and relation. Identity is the
//! `(type, id)` pair, exposed as [`ElementKey`] with the compact `n123` /
//! `w-4` / `r7` text form used for lookups. Negative ids denote elements
//! created locally that have never been uploaded.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Tag mapping. Keys are unique; iteration order is stable by key.
pub type Tags = BTreeMap<String, String>;

/// OSM element discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementType {
    /// Point feature.
    Node,
    /// Ordered list of node references.
    Way,
    /// Ordered list of typed members.
    Relation,
}

impl ElementType {
    /// Single-character prefix used in synthetic keys.
    pub const fn prefix(self) -> char {
        match self {
            Self::Node => 'n',
            Self::Way => 'w',
            Self::Relation => 'r',
        }
    }

    /// Wire name used by Overpass JSON and OSM XML.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }

    /// Resolve a synthetic-key prefix.
    pub const fn from_prefix(prefix: char) -> Option<Self> {
        match prefix {
            'n' => Some(Self::Node),
            'w' => Some(Self::Way),
            'r' => Some(Self::Relation),
            _ => None,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = ElementDecodeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "node" => Ok(Self::Node),
            "way" => Ok(Self::Way),
            "relation" => Ok(Self::Relation),
            other => Err(ElementDecodeError::UnknownType {
                name: other.to_owned(),
            }),
        }
    }
}

/// Errors raised while decoding elements or keys from external input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ElementDecodeError {
    /// Element `type` discriminant is not node, way, or relation.
    #[error("unknown element type `{name}`")]
    UnknownType {
        /// Offending discriminant.
        name: String,
    },
    /// Synthetic key does not have a known prefix followed by an integer.
    #[error("invalid element key `{key}`")]
    InvalidKey {
        /// Offending key.
        key: String,
    },
    /// Node is missing `lat` or `lon`, or they are not finite.
    #[error("node {id} has missing or non-finite coordinates")]
    InvalidCoordinates {
        /// Node id.
        id: i64,
    },
}

/// Synthetic element identity.
///
/// # Examples
/// ```
/// use osm_gtfs_editor::domain::{ElementKey, ElementType};
///
/// let key: ElementKey = "w-4".parse()?;
/// assert_eq!(key, ElementKey::new(ElementType::Way, -4));
/// assert_eq!(key.to_string(), "w-4");
/// # Ok::<(), osm_gtfs_editor::domain::ElementDecodeError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementKey {
    /// Element discriminant.
    pub element_type: ElementType,
    /// Element id; negative for local elements.
    pub id: i64,
}

impl ElementKey {
    /// Build a key from its parts.
    pub const fn new(element_type: ElementType, id: i64) -> Self {
        Self { element_type, id }
    }

    /// Node key.
    pub const fn node(id: i64) -> Self {
        Self::new(ElementType::Node, id)
    }

    /// Way key.
    pub const fn way(id: i64) -> Self {
        Self::new(ElementType::Way, id)
    }

    /// Relation key.
    pub const fn relation(id: i64) -> Self {
        Self::new(ElementType::Relation, id)
    }

    /// Whether this element was created locally.
    pub const fn is_local(&self) -> bool {
        self.id < 0
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.element_type.prefix(), self.id)
    }
}

impl FromStr for ElementKey {
    type Err = ElementDecodeError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let invalid = || ElementDecodeError::InvalidKey {
            key: key.to_owned(),
        };
        let mut chars = key.chars();
        let element_type = chars
            .next()
            .and_then(ElementType::from_prefix)
            .ok_or_else(invalid)?;
        let id = chars.as_str().parse::<i64>().map_err(|_| invalid())?;
        Ok(Self::new(element_type, id))
    }
}

/// Resolved position in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LonLat {
    /// Longitude.
    pub lon: f64,
    /// Latitude.
    pub lat: f64,
}

impl LonLat {
    /// Build a position from longitude and latitude.
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Whether both coordinates are finite and inside the WGS84 range.
    pub fn is_valid(self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }

    /// `[lon, lat]` tuple form, as used by GeoJSON.
    pub const fn to_array(self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

/// OSM node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node id.
    pub id: i64,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
    /// Tags.
    pub tags: Tags,
}

/// OSM way.
#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    /// Way id.
    pub id: i64,
    /// Referenced node ids, in path order.
    pub nodes: Vec<i64>,
    /// Tags.
    pub tags: Tags,
}

impl Way {
    /// A way is closed when its first and last node references match.
    pub fn is_closed(&self) -> bool {
        match (self.nodes.first(), self.nodes.last()) {
            (Some(first), Some(last)) => first == last,
            _ => false,
        }
    }
}

/// One relation member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationMember {
    /// Member discriminant.
    pub member_type: ElementType,
    /// Member id.
    pub reference: i64,
    /// Member role; often empty.
    pub role: String,
}

/// OSM relation.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// Relation id.
    pub id: i64,
    /// Ordered members.
    pub members: Vec<RelationMember>,
    /// Tags.
    pub tags: Tags,
}

/// Any OSM element.
#[derive(Debug, Clone, PartialEq)]
pub enum OsmElement {
    /// Node variant.
    Node(Node),
    /// Way variant.
    Way(Way),
    /// Relation variant.
    Relation(Relation),
}

impl OsmElement {
    /// Element id.
    pub const fn id(&self) -> i64 {
        match self {
            Self::Node(node) => node.id,
            Self::Way(way) => way.id,
            Self::Relation(relation) => relation.id,
        }
    }

    /// Element discriminant.
    pub const fn element_type(&self) -> ElementType {
        match self {
            Self::Node(_) => ElementType::Node,
            Self::Way(_) => ElementType::Way,
            Self::Relation(_) => ElementType::Relation,
        }
    }

    /// Synthetic key.
    pub const fn key(&self) -> ElementKey {
        ElementKey::new(self.element_type(), self.id())
    }

    /// Current tags.
    pub const fn tags(&self) -> &Tags {
        match self {
            Self::Node(node) => &node.tags,
            Self::Way(way) => &way.tags,
            Self::Relation(relation) => &relation.tags,
        }
    }

    pub(crate) fn tags_mut(&mut self) -> &mut Tags {
        match self {
            Self::Node(node) => &mut node.tags,
            Self::Way(way) => &mut way.tags,
            Self::Relation(relation) => &mut relation.tags,
        }
    }

    /// Node view, if this is a node.
    pub const fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Way view, if this is a way.
    pub const fn as_way(&self) -> Option<&Way> {
        match self {
            Self::Way(way) => Some(way),
            _ => None,
        }
    }

    /// Relation view, if this is a relation.
    pub const fn as_relation(&self) -> Option<&Relation> {
        match self {
            Self::Relation(relation) => Some(relation),
            _ => None,
        }
    }
}

/// Drop entries whose key or value is blank once trimmed.
pub fn filter_blank_tags(tags: Tags) -> Tags {
    tags.into_iter()
        .filter(|(key, value)| !key.trim().is_empty() && !value.trim().is_empty())
        .collect()
}
