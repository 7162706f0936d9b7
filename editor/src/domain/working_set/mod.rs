//! In-memory OSM working set with edit tracking.
//!
//! The working set is the sole owner of every element it knows. Consumers
//! address elements by [`ElementKey`] and route all mutation through the
//! methods here, which keep a change log of pristine snapshots alongside the
//! live data.
//!
//! Every mutator follows the same order: record the action (snapshotting the
//! element on its first mutation), apply the mutation, then notify
//! subscribers.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::changeset::ChangesetWriter;
use super::element::{
    ElementKey, ElementType, LonLat, Node, OsmElement, Relation, Tags, Way, filter_blank_tags,
};
use super::notify::{ChangeNotifier, DEFAULT_EVENT_CAPACITY, EventCause, WorkingSetEvent};
use super::Error;

mod change;
mod overlay;
mod policy;
mod position;
mod statistics;

pub use change::{ChangeAction, ChangeRecord, ChangeView};
pub use overlay::GeoJsonFilter;
pub use policy::{IncomingDecision, IncomingElementPolicy};

/// Working set shared across async tasks.
///
/// Hold the lock only for synchronous work; never across an `.await`.
pub type SharedWorkingSet = Arc<Mutex<WorkingSet>>;

/// Lock a shared working set, mapping poisoning to an internal error.
pub fn lock_working_set(shared: &SharedWorkingSet) -> Result<MutexGuard<'_, WorkingSet>, Error> {
    shared
        .lock()
        .map_err(|_| Error::internal("working set lock poisoned"))
}

/// Element arena, change log, and notifier.
#[derive(Debug)]
pub struct WorkingSet {
    elements: Vec<OsmElement>,
    index: HashMap<ElementKey, usize>,
    next_new_id: i64,
    changes: Vec<ChangeRecord>,
    change_index: HashMap<ElementKey, usize>,
    policy: IncomingElementPolicy,
    notifier: ChangeNotifier,
}

impl Default for WorkingSet {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkingSet {
    /// Empty working set with the default incoming-element policy.
    pub fn new() -> Self {
        Self::with_policy(IncomingElementPolicy::default())
    }

    /// Empty working set with an explicit incoming-element policy.
    pub fn with_policy(policy: IncomingElementPolicy) -> Self {
        Self::with_policy_and_capacity(policy, DEFAULT_EVENT_CAPACITY)
    }

    /// Empty working set with an explicit policy and per-subscriber event
    /// buffer.
    pub fn with_policy_and_capacity(policy: IncomingElementPolicy, capacity: usize) -> Self {
        Self {
            elements: Vec::new(),
            index: HashMap::new(),
            next_new_id: -1,
            changes: Vec::new(),
            change_index: HashMap::new(),
            policy,
            notifier: ChangeNotifier::new(capacity),
        }
    }

    /// Wrap into a [`SharedWorkingSet`].
    pub fn into_shared(self) -> SharedWorkingSet {
        Arc::new(Mutex::new(self))
    }

    /// Active incoming-element policy.
    pub const fn policy(&self) -> IncomingElementPolicy {
        self.policy
    }

    /// Insert an element, or replace the stored element with the same key in
    /// place. The arena never holds two elements with one key.
    pub fn add_element(&mut self, element: OsmElement) {
        let key = element.key();
        match self.index.get(&key) {
            Some(&position) => {
                if let Some(slot) = self.elements.get_mut(position) {
                    *slot = element;
                }
            }
            None => {
                self.index.insert(key, self.elements.len());
                self.elements.push(element);
            }
        }
    }

    /// Apply an element received from a query service according to the
    /// incoming-element policy.
    pub fn update_element(&mut self, element: OsmElement) -> IncomingDecision {
        let key = element.key();
        let existing = self
            .index
            .contains_key(&key)
            .then(|| self.change_index.contains_key(&key));
        let decision = self.policy.decide(existing);
        match decision {
            IncomingDecision::Insert | IncomingDecision::Replace => self.add_element(element),
            IncomingDecision::Ignore => {}
        }
        decision
    }

    /// Apply a whole batch, then notify once. Returns the number of newly
    /// inserted elements.
    pub fn update_overpass_data(&mut self, batch: impl IntoIterator<Item = OsmElement>) -> usize {
        let mut inserted = 0;
        let mut replaced = 0;
        for element in batch {
            match self.update_element(element) {
                IncomingDecision::Insert => inserted += 1,
                IncomingDecision::Replace => replaced += 1,
                IncomingDecision::Ignore => {}
            }
        }
        debug!(inserted, replaced, total = self.elements.len(), "batch applied");
        self.notifier.notify(EventCause::Ingested { inserted });
        inserted
    }

    /// Create a local node with the next negative id and record it as
    /// created. Blank tags are dropped.
    ///
    /// # Errors
    /// Returns [`Error::invalid_request`] when `position` is not a finite
    /// WGS84 coordinate; no id is consumed.
    pub fn create_new_node(&mut self, position: LonLat, tags: Tags) -> Result<ElementKey, Error> {
        require_valid_position(position)?;
        let id = self.next_new_id;
        self.next_new_id -= 1;
        let node = OsmElement::Node(Node {
            id,
            lat: position.lat,
            lon: position.lon,
            tags: filter_blank_tags(tags),
        });
        let key = node.key();
        self.add_element(node);
        self.record_action(key, ChangeAction::Create);
        self.notify_committed(key, ChangeAction::Create);
        Ok(key)
    }

    /// Move a node.
    ///
    /// Non-node elements cannot be repositioned yet; the call is logged and
    /// leaves the working set untouched.
    ///
    /// # Errors
    /// Returns [`Error::not_found`] when `key` is unknown and
    /// [`Error::invalid_request`] when `position` is not a finite WGS84
    /// coordinate.
    pub fn set_node_lat_lng(&mut self, key: ElementKey, position: LonLat) -> Result<(), Error> {
        require_valid_position(position)?;
        let element_type = self.require(key)?.element_type();
        if element_type != ElementType::Node {
            warn!(%key, "only nodes can be repositioned");
            return Ok(());
        }

        self.record_action(key, ChangeAction::UpdatePosition);
        if let Some(OsmElement::Node(node)) = self.get_mut(key) {
            node.lat = position.lat;
            node.lon = position.lon;
        }
        self.notify_committed(key, ChangeAction::UpdatePosition);
        Ok(())
    }

    /// Replace an element's tags with the non-blank entries of `tags`.
    ///
    /// # Errors
    /// Returns [`Error::not_found`] when `key` is unknown.
    pub fn set_element_tags(&mut self, key: ElementKey, tags: Tags) -> Result<(), Error> {
        self.require(key)?;
        self.record_action(key, ChangeAction::ChangeTags);
        if let Some(element) = self.get_mut(key) {
            *element.tags_mut() = filter_blank_tags(tags);
        }
        self.notify_committed(key, ChangeAction::ChangeTags);
        Ok(())
    }

    /// Record `action` against an element and notify subscribers.
    ///
    /// The first call for an element snapshots its current state as the
    /// original; later calls only add to the action set.
    ///
    /// # Errors
    /// Returns [`Error::not_found`] when `key` is unknown.
    pub fn commit_action(&mut self, key: ElementKey, action: ChangeAction) -> Result<(), Error> {
        self.require(key)?;
        self.record_action(key, action);
        self.notify_committed(key, action);
        Ok(())
    }

    /// Change records with a visible effect, in first-mutation order.
    ///
    /// A record whose only action is a tag change is dropped when the
    /// current tags equal the original tags.
    pub fn list_changes(&self) -> Vec<ChangeView<'_>> {
        self.changes
            .iter()
            .filter_map(|record| {
                let element = self.get(record.key())?;
                (!record.is_noop_tag_edit(element)).then_some(ChangeView { record, element })
            })
            .collect()
    }

    /// Serialize the visible changes as an OSM changeset document.
    pub fn export_changeset(&self, writer: &ChangesetWriter) -> String {
        writer.write(&self.list_changes())
    }

    /// Look up any element by key.
    pub fn get(&self, key: ElementKey) -> Option<&OsmElement> {
        self.index
            .get(&key)
            .and_then(|position| self.elements.get(*position))
    }

    /// Look up a node by id.
    pub fn get_node_by_id(&self, id: i64) -> Option<&Node> {
        self.get(ElementKey::node(id)).and_then(OsmElement::as_node)
    }

    /// Look up a way by id.
    pub fn get_way_by_id(&self, id: i64) -> Option<&Way> {
        self.get(ElementKey::way(id)).and_then(OsmElement::as_way)
    }

    /// Look up a relation by id.
    pub fn get_relation_by_id(&self, id: i64) -> Option<&Relation> {
        self.get(ElementKey::relation(id))
            .and_then(OsmElement::as_relation)
    }

    /// Look up an element by discriminant and id.
    pub fn get_by_type_and_id(&self, element_type: ElementType, id: i64) -> Option<&OsmElement> {
        self.get(ElementKey::new(element_type, id))
    }

    /// Look up an element by its prefixed id, e.g. `"n123"` or `"w-4"`.
    ///
    /// Malformed or unknown-prefix ids resolve to `None`.
    pub fn get_by_nwr_id(&self, prefixed_id: &str) -> Option<&OsmElement> {
        prefixed_id
            .parse::<ElementKey>()
            .ok()
            .and_then(|key| self.get(key))
    }

    /// Node ids referenced by the given ways but not loaded. Ways that are
    /// themselves missing contribute nothing.
    pub fn missing_way_node_ids(&self, way_ids: &[i64]) -> Vec<i64> {
        let mut seen = HashSet::new();
        way_ids
            .iter()
            .filter_map(|id| self.get_way_by_id(*id))
            .flat_map(|way| way.nodes.iter().copied())
            .filter(|id| !self.index.contains_key(&ElementKey::node(*id)))
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Every element in first-seen order.
    pub fn elements(&self) -> &[OsmElement] {
        &self.elements
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether no element is loaded.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Every change record, including no-op tag edits.
    pub fn changes(&self) -> &[ChangeRecord] {
        &self.changes
    }

    /// Change record for `key`, if the element was ever mutated.
    pub fn change_for(&self, key: ElementKey) -> Option<&ChangeRecord> {
        self.change_index
            .get(&key)
            .and_then(|position| self.changes.get(*position))
    }

    /// Current revision. Bumped once per event.
    pub const fn revision(&self) -> u64 {
        self.notifier.revision()
    }

    /// Register an observer; drop the receiver to unsubscribe.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkingSetEvent> {
        self.notifier.subscribe()
    }

    fn require(&self, key: ElementKey) -> Result<&OsmElement, Error> {
        self.get(key)
            .ok_or_else(|| Error::not_loaded(key))
    }

    fn get_mut(&mut self, key: ElementKey) -> Option<&mut OsmElement> {
        let position = *self.index.get(&key)?;
        self.elements.get_mut(position)
    }

    fn record_action(&mut self, key: ElementKey, action: ChangeAction) {
        if let Some(record) = self
            .change_index
            .get(&key)
            .and_then(|position| self.changes.get_mut(*position))
        {
            record.record(action);
            return;
        }

        let Some(snapshot) = self.get(key).cloned() else {
            return;
        };
        self.change_index.insert(key, self.changes.len());
        self.changes.push(ChangeRecord::new(snapshot, action));
    }

    fn notify_committed(&mut self, key: ElementKey, action: ChangeAction) {
        self.notifier.notify(EventCause::Committed { key, action });
    }
}


fn require_valid_position(position: LonLat) -> Result<(), Error> {
    if position.is_valid() {
        Ok(())
    } else {
        Err(Error::invalid_request(format!(
            "position ({}, {}) is not a valid WGS84 coordinate",
            position.lon, position.lat
        )))
    }
}
