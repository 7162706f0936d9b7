//! Tags for stops added from GTFS data.
//!
//! A new stop is a `public_transport=platform` node. Each GTFS route type
//! serving it adds the mode tags OSM editors expect for that mode.

use tracing::debug;

use super::element::{ElementKey, LonLat, Tags};
use super::id_tags::IdTagConvention;
use super::working_set::WorkingSet;
use super::Error;

/// Mode tags for a list of route types such as `"bus, tram"`.
///
/// Types are separated by whitespace, commas, or semicolons and matched
/// case-insensitively. Unknown types add nothing.
///
/// # Examples
/// ```
/// use osm_gtfs_editor::domain::stop_preset::route_type_tags;
///
/// let tags = route_type_tags("Bus; tram");
/// assert_eq!(tags.get("highway").map(String::as_str), Some("bus_stop"));
/// assert_eq!(tags.get("railway").map(String::as_str), Some("tram_stop"));
/// ```
pub fn route_type_tags(route_types: &str) -> Tags {
    let mut tags = Tags::from([("public_transport".to_owned(), "platform".to_owned())]);
    let types = route_types
        .split(|ch: char| ch.is_whitespace() || ch == ',' || ch == ';')
        .filter(|route_type| !route_type.is_empty())
        .map(str::to_lowercase);
    for route_type in types {
        let mode_tags: &[(&str, &str)] = match route_type.as_str() {
            "bus" => &[("highway", "bus_stop"), ("bus", "yes")],
            "tram" => &[("railway", "tram_stop"), ("tram", "yes")],
            "subway" => &[("railway", "subway_station"), ("subway", "yes")],
            "train" => &[("railway", "station"), ("train", "yes")],
            "ferry" => &[("ferry", "yes")],
            "aerialway" => &[("aerialway", "station")],
            other => {
                debug!(route_type = other, "no stop tags for route type");
                &[]
            }
        };
        for (key, value) in mode_tags {
            tags.insert((*key).to_owned(), (*value).to_owned());
        }
    }
    tags
}

/// A GTFS stop to be added to OSM.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStop<'a> {
    /// Stop name.
    pub name: &'a str,
    /// GTFS `stop_id`.
    pub stop_id: &'a str,
    /// GTFS `stop_code`, when the feed has one.
    pub stop_code: Option<&'a str>,
    /// Route types serving the stop.
    pub route_types: &'a str,
    /// Where the stop is placed.
    pub position: LonLat,
}

impl IdTagConvention {
    /// Full tag set for `stop` under this convention. The id tag carries the
    /// stop code when the feed has a non-blank one, otherwise the stop id.
    pub fn stop_tags(&self, stop: &NewStop<'_>) -> Tags {
        let mut tags = route_type_tags(stop.route_types);
        tags.insert("name".to_owned(), stop.name.to_owned());
        let id = stop
            .stop_code
            .filter(|code| !code.trim().is_empty())
            .unwrap_or(stop.stop_id);
        tags.insert(self.id_tag().to_owned(), id.to_owned());
        tags
    }

    /// Create `stop` as a local node. Blank values are dropped like any
    /// other tag edit.
    ///
    /// # Errors
    /// Returns [`Error::invalid_request`] when the stop position is not a
    /// valid coordinate.
    pub fn create_stop(
        &self,
        working_set: &mut WorkingSet,
        stop: &NewStop<'_>,
    ) -> Result<ElementKey, Error> {
        working_set.create_new_node(stop.position, self.stop_tags(stop))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MatchReportMetadata;
    use crate::domain::working_set::ChangeAction;
    use rstest::rstest;

    #[rstest]
    #[case::empty("", &[("public_transport", "platform")])]
    #[case::bus("bus", &[("bus", "yes"), ("highway", "bus_stop"), ("public_transport", "platform")])]
    #[case::mixed_separators(
        "TRAM,ferry;  aerialway",
        &[
            ("aerialway", "station"),
            ("ferry", "yes"),
            ("public_transport", "platform"),
            ("railway", "tram_stop"),
            ("tram", "yes"),
        ]
    )]
    #[case::unknown("funicular", &[("public_transport", "platform")])]
    fn route_types_map_to_mode_tags(#[case] route_types: &str, #[case] expected: &[(&str, &str)]) {
        let expected = expected
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect::<Tags>();
        assert_eq!(route_type_tags(route_types), expected);
    }

    #[test]
    fn later_route_types_win_shared_keys() {
        let tags = route_type_tags("train subway");
        assert_eq!(tags.get("railway").map(String::as_str), Some("subway_station"));
        assert_eq!(tags.get("train").map(String::as_str), Some("yes"));
    }

    #[test]
    fn created_stop_follows_the_report_convention() {
        let convention: IdTagConvention = serde_json::from_str::<MatchReportMetadata>(
            r#"{"idTags": {"gtfs:stop_id": 8, "gtfs:stop_code": 2}}"#,
        )
        .expect("valid metadata")
        .convention();
        let mut working_set = WorkingSet::new();

        let key = convention
            .create_stop(
                &mut working_set,
                &NewStop {
                    name: "Central",
                    stop_id: "STOP123",
                    stop_code: Some("4411"),
                    route_types: "bus",
                    position: LonLat::new(10.0, 45.0),
                },
            )
            .expect("valid position");

        let tags = working_set.get(key).expect("stop created").tags();
        assert_eq!(tags.get("gtfs:stop_id").map(String::as_str), Some("4411"));
        assert!(!tags.contains_key("gtfs:stop_code"));
        assert_eq!(tags.get("highway").map(String::as_str), Some("bus_stop"));
        let record = working_set.change_for(key).expect("creation recorded");
        assert!(record.has_action(ChangeAction::Create));
    }

    #[rstest]
    #[case::missing(None)]
    #[case::blank(Some(" "))]
    fn stop_id_is_used_without_a_code(#[case] stop_code: Option<&str>) {
        let tags = IdTagConvention::default().stop_tags(&NewStop {
            name: "Central",
            stop_id: "S1",
            stop_code,
            route_types: "",
            position: LonLat::new(0.0, 0.0),
        });
        assert_eq!(tags.get("ref:gtfs").map(String::as_str), Some("S1"));
        assert_eq!(tags.len(), 3);
    }
}
