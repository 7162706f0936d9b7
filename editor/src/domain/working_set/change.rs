//! Change log records.

use std::collections::BTreeSet;
use std::fmt;

use crate::domain::element::{ElementKey, OsmElement};

/// Kind of local edit recorded against an element.
///
/// Ordering is the export order of the action vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChangeAction {
    /// Element was created locally.
    Create,
    /// Element position changed. Only nodes support this today; the variant
    /// is shared with ways for forward compatibility.
    UpdatePosition,
    /// Element tags were replaced.
    ChangeTags,
}

impl ChangeAction {
    /// Wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::UpdatePosition => "update_position",
            Self::ChangeTags => "change_tags",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry per element ever mutated.
///
/// ## Invariants
/// - `original` is the element as it was immediately before its first
///   mutation and is never overwritten.
/// - `actions` is a set; repeating a kind of edit does not grow it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    key: ElementKey,
    original: OsmElement,
    actions: BTreeSet<ChangeAction>,
}

impl ChangeRecord {
    pub(super) fn new(original: OsmElement, action: ChangeAction) -> Self {
        Self {
            key: original.key(),
            original,
            actions: BTreeSet::from([action]),
        }
    }

    pub(super) fn record(&mut self, action: ChangeAction) {
        self.actions.insert(action);
    }

    /// Key of the live element.
    pub const fn key(&self) -> ElementKey {
        self.key
    }

    /// Pristine snapshot from before the first edit.
    pub const fn original(&self) -> &OsmElement {
        &self.original
    }

    /// Accumulated actions.
    pub const fn actions(&self) -> &BTreeSet<ChangeAction> {
        &self.actions
    }

    /// Whether `action` has been recorded.
    pub fn has_action(&self, action: ChangeAction) -> bool {
        self.actions.contains(&action)
    }

    /// Whether this record would be an invisible edit on `current`: the only
    /// action is a tag change and the tags are back to the original.
    pub(super) fn is_noop_tag_edit(&self, current: &OsmElement) -> bool {
        self.actions.len() == 1
            && self.has_action(ChangeAction::ChangeTags)
            && current.tags() == self.original.tags()
    }
}

/// A change record paired with the live element it tracks.
#[derive(Debug, Clone, Copy)]
pub struct ChangeView<'a> {
    /// Change log entry.
    pub record: &'a ChangeRecord,
    /// Current element state.
    pub element: &'a OsmElement,
}
