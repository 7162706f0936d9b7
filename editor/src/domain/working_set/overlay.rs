//! GeoJSON overlay of the working set for map layers.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value, feature::Id};

use super::WorkingSet;
use crate::domain::element::OsmElement;

/// Which elements to include in the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeoJsonFilter {
    /// Every element with a resolvable position.
    #[default]
    All,
    /// Only elements with a visible change.
    EditedOnly,
}

impl WorkingSet {
    /// Render elements as Point features keyed by their synthetic key.
    ///
    /// Elements whose position cannot be resolved are skipped.
    pub fn to_geojson(&self, filter: GeoJsonFilter) -> FeatureCollection {
        let edited = self
            .list_changes()
            .into_iter()
            .map(|view| view.record.key())
            .collect::<std::collections::HashSet<_>>();

        let features = self
            .elements()
            .iter()
            .filter(|element| match filter {
                GeoJsonFilter::All => true,
                GeoJsonFilter::EditedOnly => edited.contains(&element.key()),
            })
            .filter_map(|element| {
                let position = self.get_lon_lat(element)?;
                Some(point_feature(
                    element,
                    position.to_array(),
                    edited.contains(&element.key()),
                ))
            })
            .collect();

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

fn point_feature(element: &OsmElement, coordinates: [f64; 2], edited: bool) -> Feature {
    let tags = element
        .tags()
        .iter()
        .map(|(key, value)| (key.clone(), JsonValue::String(value.clone())))
        .collect::<JsonObject>();

    let mut properties = JsonObject::new();
    properties.insert(
        "osm_type".to_owned(),
        JsonValue::String(element.element_type().as_str().to_owned()),
    );
    properties.insert("osm_id".to_owned(), JsonValue::from(element.id()));
    properties.insert("tags".to_owned(), JsonValue::Object(tags));
    properties.insert("edited".to_owned(), JsonValue::Bool(edited));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(coordinates.to_vec()))),
        id: Some(Id::String(element.key().to_string())),
        properties: Some(properties),
        foreign_members: None,
    }
}
