//! Id-tag convention derived from match report metadata.
//!
//! Regions differ in which tag carries the GTFS stop id or code. The match
//! report counts the id tags already present in OSM; ids and codes are both
//! written to the most common one.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::element::ElementKey;
use super::working_set::WorkingSet;
use super::Error;

/// Id tag used when the report has no statistics.
pub const FALLBACK_ID_TAG: &str = "ref:gtfs";

/// Per-region metadata from a match report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchReportMetadata {
    /// Occurrences of each id tag key among matched OSM elements.
    #[serde(default)]
    pub id_tags: BTreeMap<String, u64>,
    /// Feature counts per dataset.
    #[serde(default)]
    pub dataset_feature_counts: BTreeMap<String, u64>,
}

impl MatchReportMetadata {
    /// Most common id tag other than `name`; ties go to the smallest key.
    ///
    /// # Examples
    /// ```
    /// use osm_gtfs_editor::domain::MatchReportMetadata;
    ///
    /// let metadata: MatchReportMetadata = serde_json::from_str(
    ///     r#"{"idTags": {"ref:gtfs": 3, "gtfs:stop_id": 9}}"#,
    /// )?;
    /// assert_eq!(metadata.preferred_id_tag(), "gtfs:stop_id");
    /// # Ok::<(), serde_json::Error>(())
    /// ```
    pub fn preferred_id_tag(&self) -> &str {
        most_common(self.id_tags.iter().filter(|(key, _)| key.as_str() != "name"))
            .unwrap_or(FALLBACK_ID_TAG)
    }

    /// Convention resolved from this metadata.
    pub fn convention(&self) -> IdTagConvention {
        IdTagConvention {
            id_tag: self.preferred_id_tag().to_owned(),
        }
    }
}

// BTreeMap iteration is key-ordered, so keeping the first maximum breaks
// ties towards the smallest key.
fn most_common<'a>(entries: impl Iterator<Item = (&'a String, &'a u64)>) -> Option<&'a str> {
    entries
        .fold(None, |best: Option<(&'a String, u64)>, (key, count)| match best {
            Some((_, best_count)) if best_count >= *count => best,
            _ => Some((key, *count)),
        })
        .map(|(key, _)| key.as_str())
}

/// Tag key used for authoring stop ids and codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdTagConvention {
    id_tag: String,
}

impl Default for IdTagConvention {
    fn default() -> Self {
        MatchReportMetadata::default().convention()
    }
}

impl IdTagConvention {
    /// Id tag key.
    pub fn id_tag(&self) -> &str {
        &self.id_tag
    }

    /// Set the id tag on `key`, keeping other tags.
    ///
    /// # Errors
    /// Returns [`Error::not_found`] when `key` is unknown.
    pub fn set_id(
        &self,
        working_set: &mut WorkingSet,
        key: ElementKey,
        value: &str,
    ) -> Result<(), Error> {
        set_tag(working_set, key, &self.id_tag, value)
    }

    /// Set a stop code on `key`. Codes share the id tag; feeds that publish
    /// codes match OSM on the code.
    ///
    /// # Errors
    /// Returns [`Error::not_found`] when `key` is unknown.
    pub fn set_code(
        &self,
        working_set: &mut WorkingSet,
        key: ElementKey,
        value: &str,
    ) -> Result<(), Error> {
        set_tag(working_set, key, &self.id_tag, value)
    }
}

fn set_tag(
    working_set: &mut WorkingSet,
    key: ElementKey,
    tag: &str,
    value: &str,
) -> Result<(), Error> {
    let mut tags = working_set
        .get(key)
        .ok_or_else(|| Error::not_loaded(key))?
        .tags()
        .clone();
    tags.insert(tag.to_owned(), value.to_owned());
    working_set.set_element_tags(key, tags)
}
