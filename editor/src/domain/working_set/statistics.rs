//! Tag key usage across loaded elements.

use std::collections::BTreeMap;

use super::WorkingSet;
use crate::domain::element::OsmElement;

impl WorkingSet {
    /// Count how many elements accepted by `filter` carry each tag key.
    ///
    /// # Examples
    /// ```
    /// use osm_gtfs_editor::domain::{LonLat, Tags, WorkingSet};
    ///
    /// let mut working_set = WorkingSet::new();
    /// working_set.create_new_node(
    ///     LonLat::new(0.0, 0.0),
    ///     Tags::from([("ref:gtfs".to_owned(), "S1".to_owned())]),
    /// )?;
    /// let counts = working_set.tag_statistics(|_| true);
    /// assert_eq!(counts.get("ref:gtfs"), Some(&1));
    /// # Ok::<(), osm_gtfs_editor::domain::Error>(())
    /// ```
    pub fn tag_statistics(&self, filter: impl Fn(&OsmElement) -> bool) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for element in self.elements().iter().filter(|element| filter(element)) {
            for key in element.tags().keys() {
                *counts.entry(key.clone()).or_insert(0) += 1;
            }
        }
        counts
    }
}
