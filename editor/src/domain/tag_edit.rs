//! Validation gate for multi-row tag editing.
//!
//! Rows are held in an editable, possibly invalid state. Nothing reaches the
//! working set until every non-blank row has a distinct key.

use std::collections::HashSet;

use super::element::{ElementKey, Tags, filter_blank_tags};
use super::working_set::WorkingSet;
use super::Error;

/// One editor row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagRow {
    /// Tag key as typed.
    pub key: String,
    /// Tag value as typed.
    pub value: String,
}

impl TagRow {
    /// Build a row.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    fn is_blank(&self) -> bool {
        self.key.trim().is_empty() || self.value.trim().is_empty()
    }
}

/// Reasons an edit is held back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagEditError {
    /// Two non-blank rows share a key.
    #[error("tag key `{key}` appears more than once")]
    DuplicateKey {
        /// Trimmed key.
        key: String,
    },
}

/// Outcome of [`TagRows::commit`].
#[derive(Debug, thiserror::Error)]
pub enum TagCommitError {
    /// Rows did not validate; the working set is untouched.
    #[error(transparent)]
    Invalid(#[from] TagEditError),
    /// Element could not be updated.
    #[error(transparent)]
    WorkingSet(#[from] Error),
}

/// Ordered editor rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagRows {
    rows: Vec<TagRow>,
}

impl TagRows {
    /// Rows for the given tags, in key order.
    pub fn from_tags(tags: &Tags) -> Self {
        Self {
            rows: tags
                .iter()
                .map(|(key, value)| TagRow::new(key.clone(), value.clone()))
                .collect(),
        }
    }

    /// Current rows.
    pub fn rows(&self) -> &[TagRow] {
        &self.rows
    }

    /// Append a row.
    pub fn push(&mut self, row: TagRow) {
        self.rows.push(row);
    }

    /// Replace the row at `index`. Out-of-range indexes are ignored.
    pub fn set(&mut self, index: usize, row: TagRow) {
        if let Some(slot) = self.rows.get_mut(index) {
            *slot = row;
        }
    }

    /// Remove the row at `index`, if present.
    pub fn remove(&mut self, index: usize) -> Option<TagRow> {
        (index < self.rows.len()).then(|| self.rows.remove(index))
    }

    /// Tags the rows describe, or the first duplicate key.
    ///
    /// Blank rows are skipped before the duplicate check.
    pub fn validate(&self) -> Result<Tags, TagEditError> {
        let mut seen = HashSet::new();
        for row in self.rows.iter().filter(|row| !row.is_blank()) {
            let key = row.key.trim();
            if !seen.insert(key) {
                return Err(TagEditError::DuplicateKey {
                    key: key.to_owned(),
                });
            }
        }

        let tags = self
            .rows
            .iter()
            .filter(|row| !row.is_blank())
            .map(|row| (row.key.trim().to_owned(), row.value.clone()))
            .collect();
        Ok(filter_blank_tags(tags))
    }

    /// Write the rows to `key` if they validate.
    pub fn commit(
        &self,
        working_set: &mut WorkingSet,
        key: ElementKey,
    ) -> Result<(), TagCommitError> {
        let tags = self.validate()?;
        working_set.set_element_tags(key, tags)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the duplicate-key gate.

    use super::*;
    use crate::domain::element::{Node, OsmElement};

    fn loaded() -> WorkingSet {
        let mut working_set = WorkingSet::new();
        working_set.update_overpass_data([OsmElement::Node(Node {
            id: 5,
            lat: 0.0,
            lon: 0.0,
            tags: Tags::from([("name".to_owned(), "Old".to_owned())]),
        })]);
        working_set
    }

    #[test]
    fn duplicate_keys_block_commit() {
        let mut working_set = loaded();
        let mut rows = TagRows::from_tags(&Tags::new());
        rows.push(TagRow::new("name", "A"));
        rows.push(TagRow::new(" name ", "B"));

        let error = rows
            .commit(&mut working_set, ElementKey::node(5))
            .expect_err("duplicate key");

        assert!(matches!(
            error,
            TagCommitError::Invalid(TagEditError::DuplicateKey { ref key }) if key == "name"
        ));
        assert!(working_set.changes().is_empty());
        assert_eq!(working_set.revision(), 1);
    }

    #[test]
    fn blank_duplicate_rows_do_not_block() {
        let mut rows = TagRows::default();
        rows.push(TagRow::new("name", "A"));
        rows.push(TagRow::new("name", " "));
        rows.push(TagRow::new("", ""));

        let tags = rows.validate().expect("blank rows ignored");
        assert_eq!(tags, Tags::from([("name".to_owned(), "A".to_owned())]));
    }

    #[test]
    fn resolving_the_duplicate_commits() {
        let mut working_set = loaded();
        let mut rows = TagRows::from_tags(&Tags::new());
        rows.push(TagRow::new("name", "A"));
        rows.push(TagRow::new("name", "B"));
        rows.set(1, TagRow::new("ref", "B"));

        rows.commit(&mut working_set, ElementKey::node(5))
            .expect("valid rows");

        let node = working_set.get_node_by_id(5).expect("node loaded");
        assert_eq!(
            node.tags,
            Tags::from([
                ("name".to_owned(), "A".to_owned()),
                ("ref".to_owned(), "B".to_owned()),
            ])
        );
    }

    #[test]
    fn unknown_elements_surface_working_set_errors() {
        let mut working_set = loaded();
        let rows = TagRows::from_tags(&Tags::from([("a".to_owned(), "b".to_owned())]));

        let error = rows
            .commit(&mut working_set, ElementKey::way(5))
            .expect_err("way 5 missing");
        assert!(matches!(error, TagCommitError::WorkingSet(_)));
    }

    #[test]
    fn removing_rows_is_bounds_checked() {
        let mut rows = TagRows::default();
        rows.push(TagRow::new("a", "b"));
        assert!(rows.remove(3).is_none());
        assert_eq!(rows.remove(0), Some(TagRow::new("a", "b")));
        assert!(rows.rows().is_empty());
    }
}
