//! DTOs for the `{ "elements": [...] }` JSON shared by Overpass and the OSM
//! REST API.
//!
//! Responses decode into these transport DTOs first, then map into domain
//! elements one at a time. The `type` discriminant is kept as a string so an
//! unknown value surfaces as a domain decode error for that element only.
//! Deleted elements (`visible: false`) and elements that fail to map are
//! dropped, and the rest of the batch is kept.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::{
    ElementDecodeError, ElementType, Node, OsmElement, Relation, RelationMember, Tags, Way,
};

#[derive(Debug, Deserialize)]
pub(crate) struct ElementsResponseDto {
    #[serde(default)]
    pub(crate) elements: Vec<ElementDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ElementDto {
    #[serde(rename = "type")]
    pub(crate) element_type: String,
    pub(crate) id: i64,
    #[serde(default)]
    pub(crate) visible: Option<bool>,
    pub(crate) lat: Option<f64>,
    pub(crate) lon: Option<f64>,
    #[serde(default)]
    pub(crate) nodes: Vec<i64>,
    #[serde(default)]
    pub(crate) members: Vec<MemberDto>,
    #[serde(default)]
    pub(crate) tags: Tags,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MemberDto {
    #[serde(rename = "type")]
    pub(crate) member_type: String,
    #[serde(rename = "ref")]
    pub(crate) reference: i64,
    #[serde(default)]
    pub(crate) role: String,
}

impl ElementsResponseDto {
    pub(crate) fn into_domain_elements(self) -> Vec<OsmElement> {
        self.elements
            .into_iter()
            .filter_map(|element| {
                if element.visible == Some(false) {
                    debug!(
                        element_type = %element.element_type,
                        id = element.id,
                        "skipping deleted element"
                    );
                    return None;
                }
                let (element_type, id) = (element.element_type.clone(), element.id);
                element
                    .into_domain_element()
                    .inspect_err(|error| {
                        warn!(
                            %element_type,
                            id,
                            error = %error,
                            "skipping undecodable element"
                        );
                    })
                    .ok()
            })
            .collect()
    }
}

impl ElementDto {
    fn into_domain_element(self) -> Result<OsmElement, ElementDecodeError> {
        match self.element_type.parse::<ElementType>()? {
            ElementType::Node => {
                let (Some(lat), Some(lon)) = (self.lat, self.lon) else {
                    return Err(ElementDecodeError::InvalidCoordinates { id: self.id });
                };
                if !lat.is_finite() || !lon.is_finite() {
                    return Err(ElementDecodeError::InvalidCoordinates { id: self.id });
                }
                Ok(OsmElement::Node(Node {
                    id: self.id,
                    lat,
                    lon,
                    tags: self.tags,
                }))
            }
            ElementType::Way => Ok(OsmElement::Way(Way {
                id: self.id,
                nodes: self.nodes,
                tags: self.tags,
            })),
            ElementType::Relation => Ok(OsmElement::Relation(Relation {
                id: self.id,
                members: self
                    .members
                    .into_iter()
                    .map(MemberDto::into_domain_member)
                    .collect::<Result<_, _>>()?,
                tags: self.tags,
            })),
        }
    }
}

impl MemberDto {
    fn into_domain_member(self) -> Result<RelationMember, ElementDecodeError> {
        Ok(RelationMember {
            member_type: self.member_type.parse()?,
            reference: self.reference,
            role: self.role,
        })
    }
}
