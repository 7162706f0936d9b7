//! Policy for elements re-fetched from a query service.
//!
//! Whether a server copy should overwrite a known element is unresolved
//! upstream, so the decision lives here instead of in the ingest path.

/// How `update_element` treats an incoming element whose key is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IncomingElementPolicy {
    /// First write wins: known elements are never overwritten.
    #[default]
    KeepLocal,
    /// Overwrite known elements unless they carry local edits.
    ReplaceUnedited,
}

/// Outcome of applying the policy to one incoming element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncomingDecision {
    /// Key is new; insert it.
    Insert,
    /// Replace the stored copy in place.
    Replace,
    /// Leave the stored copy untouched.
    Ignore,
}

impl IncomingElementPolicy {
    /// Decide what to do with an incoming element.
    ///
    /// `existing` is `None` when the key is not yet known, otherwise it
    /// carries whether the stored element has a change record.
    ///
    /// # Examples
    /// ```
    /// use osm_gtfs_editor::domain::{IncomingDecision, IncomingElementPolicy};
    ///
    /// let policy = IncomingElementPolicy::ReplaceUnedited;
    /// assert_eq!(policy.decide(None), IncomingDecision::Insert);
    /// assert_eq!(policy.decide(Some(true)), IncomingDecision::Ignore);
    /// assert_eq!(policy.decide(Some(false)), IncomingDecision::Replace);
    /// ```
    pub const fn decide(self, existing: Option<bool>) -> IncomingDecision {
        match (self, existing) {
            (_, None) => IncomingDecision::Insert,
            (Self::KeepLocal, Some(_)) | (Self::ReplaceUnedited, Some(true)) => {
                IncomingDecision::Ignore
            }
            (Self::ReplaceUnedited, Some(false)) => IncomingDecision::Replace,
        }
    }
}
