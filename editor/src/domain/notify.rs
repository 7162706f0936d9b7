//! Working set change notifications.
//!
//! Every mutation batch bumps a revision counter and broadcasts one event.
//! Any number of observers may subscribe; dropping a receiver is the
//! cancellation mechanism. A receiver that falls behind sees
//! `RecvError::Lagged` and should resync by reading the working set's
//! current revision.

use tokio::sync::broadcast;
use tracing::trace;

use super::element::ElementKey;
use super::working_set::ChangeAction;

/// Default number of buffered events per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Why the working set changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCause {
    /// A batch from a query service was applied.
    Ingested {
        /// Elements newly inserted by the batch.
        inserted: usize,
    },
    /// A local edit was recorded against an element.
    Committed {
        /// Element that changed.
        key: ElementKey,
        /// Kind of edit.
        action: ChangeAction,
    },
}

/// Event delivered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkingSetEvent {
    /// The working set contents changed.
    DataUpdated {
        /// Revision after the change.
        revision: u64,
        /// What triggered it.
        cause: EventCause,
    },
}

impl WorkingSetEvent {
    /// Revision carried by the event.
    pub const fn revision(&self) -> u64 {
        match self {
            Self::DataUpdated { revision, .. } => *revision,
        }
    }
}

/// Multi-subscriber broadcaster owned by the working set.
#[derive(Debug)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<WorkingSetEvent>,
    revision: u64,
}

impl ChangeNotifier {
    /// Build a notifier buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            revision: 0,
        }
    }

    /// Register a new observer.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkingSetEvent> {
        self.sender.subscribe()
    }

    /// Current revision; zero until the first change.
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub(crate) fn notify(&mut self, cause: EventCause) {
        self.revision = self.revision.saturating_add(1);
        let event = WorkingSetEvent::DataUpdated {
            revision: self.revision,
            cause,
        };
        if self.sender.send(event).is_err() {
            trace!(revision = self.revision, "no working set subscribers");
        }
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the broadcast notifier.

    use super::*;

    #[test]
    fn every_subscriber_receives_each_event() {
        let mut notifier = ChangeNotifier::default();
        let mut first = notifier.subscribe();
        let mut second = notifier.subscribe();

        notifier.notify(EventCause::Ingested { inserted: 3 });

        for receiver in [&mut first, &mut second] {
            let event = receiver.try_recv().expect("event delivered");
            assert_eq!(
                event,
                WorkingSetEvent::DataUpdated {
                    revision: 1,
                    cause: EventCause::Ingested { inserted: 3 },
                }
            );
        }
    }

    #[test]
    fn notifying_without_subscribers_still_advances_revision() {
        let mut notifier = ChangeNotifier::default();
        notifier.notify(EventCause::Ingested { inserted: 0 });
        notifier.notify(EventCause::Ingested { inserted: 0 });
        assert_eq!(notifier.revision(), 2);
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn dropped_receivers_unsubscribe() {
        let notifier = ChangeNotifier::default();
        let receiver = notifier.subscribe();
        assert_eq!(notifier.subscriber_count(), 1);
        drop(receiver);
        assert_eq!(notifier.subscriber_count(), 0);
    }
}
