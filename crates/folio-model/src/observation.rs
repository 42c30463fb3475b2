//! Bridge from repository listeners to model observation contexts
//!
//! The [`EventListenerAdapter`] owns a single repository subscription and
//! forwards each delivered batch, translated into [`BridgeEvent`]s, to an
//! [`ObservationContext`]. Forwarding runs on the repository's delivery
//! thread.

use crate::error::ObservationError;
use folio_repo::{
    EventFilter, EventKind, EventListener, ItemPath, ListenerId, RawEvent, RepoError, Repository,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Kind of change as seen by observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Node or property created
    Added,
    /// Node or property deleted
    Removed,
    /// Node moved or renamed
    Moved,
    /// Property value replaced
    PropertyChanged,
}

impl From<EventKind> for ChangeKind {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::NodeAdded | EventKind::PropertyAdded => Self::Added,
            EventKind::NodeRemoved | EventKind::PropertyRemoved => Self::Removed,
            EventKind::NodeMoved => Self::Moved,
            EventKind::PropertyChanged => Self::PropertyChanged,
        }
    }
}

/// Model-layer change notification
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeEvent {
    /// Translated kind
    pub kind: ChangeKind,
    /// Affected item path
    pub path: ItemPath,
    /// Originating repository event
    pub raw: RawEvent,
}

impl BridgeEvent {
    /// Translate a repository event
    #[must_use]
    pub fn from_raw(raw: RawEvent) -> Self {
        Self {
            kind: raw.kind.into(),
            path: raw.path.clone(),
            raw,
        }
    }

    /// Paths whose parent listings changed
    ///
    /// The parent of the affected path, plus the source parent for moves.
    #[must_use]
    pub fn affected_parents(&self) -> Vec<ItemPath> {
        let mut parents: Vec<ItemPath> = self.path.parent().into_iter().collect();
        if let Some(source_parent) = self.raw.moved_from.as_ref().and_then(ItemPath::parent) {
            if !parents.contains(&source_parent) {
                parents.push(source_parent);
            }
        }
        parents
    }
}

/// Receiver of translated change notifications
///
/// Called on the repository delivery thread. Implementations must not call
/// back into the adapter that feeds them.
pub trait ObservationContext: Send + Sync {
    /// Notify all observers of a batch, in order
    fn notify_observers(&self, events: Vec<BridgeEvent>);
}

struct Forwarder {
    context: Arc<dyn ObservationContext>,
    active: Mutex<bool>,
}

impl Forwarder {
    fn is_active(&self) -> bool {
        *self.active.lock()
    }

    /// Returns whether the forwarder was active
    fn deactivate(&self) -> bool {
        std::mem::replace(&mut *self.active.lock(), false)
    }
}

impl EventListener for Forwarder {
    fn on_events(&self, events: &[RawEvent]) {
        // Held while forwarding so that `stop` waits for an in-flight batch.
        let active = self.active.lock();
        if !*active {
            return;
        }
        let bridged: Vec<BridgeEvent> = events.iter().cloned().map(BridgeEvent::from_raw).collect();
        tracing::trace!(count = bridged.len(), "forwarding events");
        self.context.notify_observers(bridged);
    }

    fn on_error(&self, error: &RepoError) {
        let mut active = self.active.lock();
        if *active {
            tracing::error!(%error, "event delivery failed, subscription terminated");
            *active = false;
        }
    }
}

struct Subscription {
    id: ListenerId,
    forwarder: Arc<Forwarder>,
}

/// Owner of one repository subscription
///
/// Dropping the adapter stops the subscription.
pub struct EventListenerAdapter {
    repository: Arc<dyn Repository>,
    subscription: Option<Subscription>,
}

impl EventListenerAdapter {
    /// Create an idle adapter
    #[must_use]
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self {
            repository,
            subscription: None,
        }
    }

    /// Register with the repository and start forwarding to `context`
    ///
    /// Returns once the repository confirmed the registration. An adapter
    /// whose subscription was terminated by a delivery error may be started
    /// again.
    ///
    /// # Errors
    /// Returns [`ObservationError::AlreadyStarted`] if the adapter is active,
    /// or the repository error if registration fails
    pub fn start(
        &mut self,
        context: Arc<dyn ObservationContext>,
        filter: EventFilter,
    ) -> Result<(), ObservationError> {
        if self.is_active() {
            return Err(ObservationError::AlreadyStarted);
        }
        self.subscription = None;

        let forwarder = Arc::new(Forwarder {
            context,
            active: Mutex::new(true),
        });
        let scope = filter.scope.clone();
        let id = self
            .repository
            .add_event_listener(Arc::clone(&forwarder) as Arc<dyn EventListener>, filter)?;
        tracing::info!(%id, %scope, "observation started");
        self.subscription = Some(Subscription { id, forwarder });
        Ok(())
    }

    /// Unregister; idempotent
    ///
    /// No event reaches the context after this returns.
    pub fn stop(&mut self) {
        let Some(subscription) = self.subscription.take() else {
            return;
        };
        if !subscription.forwarder.deactivate() {
            return;
        }
        match self.repository.remove_event_listener(subscription.id) {
            Ok(()) => tracing::info!(id = %subscription.id, "observation stopped"),
            Err(error) => {
                tracing::warn!(id = %subscription.id, %error, "failed to unregister listener");
            }
        }
    }

    /// Whether the subscription is live
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(|subscription| subscription.forwarder.is_active())
    }
}

impl Drop for EventListenerAdapter {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for EventListenerAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListenerAdapter")
            .field("listener", &self.subscription.as_ref().map(|s| s.id))
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_repo::{EventMask, InMemoryRepository};

    #[derive(Default)]
    struct Collect {
        events: Mutex<Vec<BridgeEvent>>,
    }

    impl ObservationContext for Collect {
        fn notify_observers(&self, events: Vec<BridgeEvent>) {
            self.events.lock().extend(events);
        }
    }

    fn p(s: &str) -> ItemPath {
        s.parse().unwrap()
    }

    fn all() -> EventFilter {
        EventFilter::new(EventMask::ALL, ItemPath::root(), true)
    }

    #[test]
    fn change_kind_translation() {
        assert_eq!(ChangeKind::from(EventKind::NodeAdded), ChangeKind::Added);
        assert_eq!(ChangeKind::from(EventKind::PropertyAdded), ChangeKind::Added);
        assert_eq!(ChangeKind::from(EventKind::NodeRemoved), ChangeKind::Removed);
        assert_eq!(ChangeKind::from(EventKind::PropertyRemoved), ChangeKind::Removed);
        assert_eq!(ChangeKind::from(EventKind::NodeMoved), ChangeKind::Moved);
        assert_eq!(
            ChangeKind::from(EventKind::PropertyChanged),
            ChangeKind::PropertyChanged
        );
    }

    #[test]
    fn forwards_batches_in_order() {
        let repo = Arc::new(InMemoryRepository::new().unwrap());
        let context = Arc::new(Collect::default());
        let mut adapter = EventListenerAdapter::new(repo.clone());
        adapter.start(context.clone(), all()).unwrap();
        assert!(adapter.is_active());

        repo.add_node(&ItemPath::root(), "a", "hippostd:folder").unwrap();
        repo.set_property(&p("/a"), "x", serde_json::json!(1)).unwrap();
        repo.move_node(&p("/a"), &p("/b")).unwrap();
        repo.sync();

        let events = context.events.lock();
        let kinds: Vec<ChangeKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [ChangeKind::Added, ChangeKind::Added, ChangeKind::Moved]
        );
        assert_eq!(events[2].path, p("/b"));
        assert_eq!(events[2].raw.moved_from, Some(p("/a")));
    }

    #[test]
    fn double_start_is_rejected() {
        let repo = Arc::new(InMemoryRepository::new().unwrap());
        let mut adapter = EventListenerAdapter::new(repo.clone());
        adapter.start(Arc::new(Collect::default()), all()).unwrap();
        assert!(matches!(
            adapter.start(Arc::new(Collect::default()), all()),
            Err(ObservationError::AlreadyStarted)
        ));
        assert_eq!(repo.listener_count(), 1);
    }

    #[test]
    fn stop_is_idempotent() {
        let repo = Arc::new(InMemoryRepository::new().unwrap());
        let mut never_started = EventListenerAdapter::new(repo.clone());
        never_started.stop();

        let context = Arc::new(Collect::default());
        let mut adapter = EventListenerAdapter::new(repo.clone());
        adapter.start(context.clone(), all()).unwrap();
        adapter.stop();
        adapter.stop();
        assert!(!adapter.is_active());
        assert_eq!(repo.listener_count(), 0);

        repo.add_node(&ItemPath::root(), "a", "hippostd:folder").unwrap();
        repo.sync();
        assert!(context.events.lock().is_empty());
    }

    #[test]
    fn delivery_error_terminates_subscription() {
        let repo = Arc::new(InMemoryRepository::new().unwrap());
        let mut adapter = EventListenerAdapter::new(repo.clone());
        adapter.start(Arc::new(Collect::default()), all()).unwrap();

        repo.invalidate_session();
        repo.sync();
        assert!(!adapter.is_active());
        adapter.stop();
    }

    #[test]
    fn drop_unregisters() {
        let repo = Arc::new(InMemoryRepository::new().unwrap());
        {
            let mut adapter = EventListenerAdapter::new(repo.clone());
            adapter.start(Arc::new(Collect::default()), all()).unwrap();
            assert_eq!(repo.listener_count(), 1);
        }
        assert_eq!(repo.listener_count(), 0);
    }

    #[test]
    fn affected_parents_include_move_source() {
        let repo = Arc::new(InMemoryRepository::new().unwrap());
        let context = Arc::new(Collect::default());
        let mut adapter = EventListenerAdapter::new(repo.clone());
        repo.add_node(&ItemPath::root(), "a", "hippostd:folder").unwrap();
        repo.add_node(&p("/a"), "doc", "hippo:handle").unwrap();
        adapter.start(context.clone(), all()).unwrap();

        repo.move_node(&p("/a/doc"), &p("/doc")).unwrap();
        repo.sync();

        let events = context.events.lock();
        assert_eq!(events[0].affected_parents(), vec![ItemPath::root(), p("/a")]);
    }
}
