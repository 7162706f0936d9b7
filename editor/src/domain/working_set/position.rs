//! Position resolution for elements.
//!
//! Ways carry geometry by reference only, so their position depends on
//! which nodes are loaded. Unresolvable geometry is `None`, never an error.

use tracing::debug;

use super::WorkingSet;
use crate::domain::element::{ElementType, LonLat, OsmElement, Way};
use crate::domain::geo::{bounding_box_center, great_circle_distance, path_midpoint};

impl WorkingSet {
    /// Resolve a representative position for `element`.
    ///
    /// - A node resolves to its own coordinates.
    /// - A closed way resolves to the bounding-box centre of its loaded
    ///   nodes; an open way to the distance-weighted midpoint of its path.
    /// - A relation resolves to the bounding-box centre of its resolvable
    ///   node members and way member centroids. Nested relations are not
    ///   followed.
    pub fn get_lon_lat(&self, element: &OsmElement) -> Option<LonLat> {
        match element {
            OsmElement::Node(node) => Some(LonLat::new(node.lon, node.lat)),
            OsmElement::Way(way) => self.way_lon_lat(way),
            OsmElement::Relation(relation) => {
                let points = relation
                    .members
                    .iter()
                    .filter_map(|member| match member.member_type {
                        ElementType::Node => self
                            .get_node_by_id(member.reference)
                            .map(|node| LonLat::new(node.lon, node.lat)),
                        ElementType::Way => self
                            .get_way_by_id(member.reference)
                            .and_then(|way| self.way_lon_lat(way)),
                        ElementType::Relation => None,
                    })
                    .collect::<Vec<_>>();
                let center = bounding_box_center(&points);
                if center.is_none() {
                    debug!(relation_id = relation.id, "no relation members resolved");
                }
                center
            }
        }
    }

    /// Tagged elements within `radius_m` metres of `center`, in first-seen
    /// order. Elements whose position cannot be resolved are kept so they
    /// stay visible to the editor.
    pub fn tagged_elements_near(&self, center: LonLat, radius_m: f64) -> Vec<&OsmElement> {
        self.elements()
            .iter()
            .filter(|element| !element.tags().is_empty())
            .filter(|element| {
                self.get_lon_lat(element)
                    .is_none_or(|position| great_circle_distance(position, center) < radius_m)
            })
            .collect()
    }

    fn way_lon_lat(&self, way: &Way) -> Option<LonLat> {
        let points = way
            .nodes
            .iter()
            .filter_map(|id| self.get_node_by_id(*id))
            .map(|node| LonLat::new(node.lon, node.lat))
            .collect::<Vec<_>>();
        if points.is_empty() {
            debug!(
                way_id = way.id,
                referenced = way.nodes.len(),
                "no way nodes resolved"
            );
            return None;
        }
        if way.is_closed() {
            bounding_box_center(&points)
        } else {
            path_midpoint(&points)
        }
    }
}
