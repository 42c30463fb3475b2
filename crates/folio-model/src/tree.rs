//! Observable tree model
//!
//! An [`ObservableTreeModel`] exposes the subtree below one root node to tree
//! widgets. Structural changes arrive on the repository delivery thread, are
//! queued, and reach [`TreeObserver`]s when the owner calls
//! [`ObservableTreeModel::process_pending`].

use crate::cache::ChildrenCache;
use crate::error::{ModelError, ModelResult};
use crate::item::ItemModel;
use crate::node::NodeModel;
use crate::observation::{BridgeEvent, ChangeKind, EventListenerAdapter, ObservationContext};
use crossbeam::channel::{self, Receiver, Sender};
use folio_repo::{EventFilter, EventMask, ItemPath, Repository};
use parking_lot::RwLock;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Node sequence from the tree root to a target node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreePath {
    nodes: Vec<NodeModel>,
}

impl TreePath {
    /// Nodes in order, root first
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[NodeModel] {
        &self.nodes
    }

    /// Tree root
    #[must_use]
    pub fn root(&self) -> &NodeModel {
        &self.nodes[0]
    }

    /// Target node
    #[must_use]
    pub fn last(&self) -> &NodeModel {
        &self.nodes[self.nodes.len() - 1]
    }

    /// Number of nodes including the root
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; a tree path contains at least the root
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate nodes root first
    pub fn iter(&self) -> std::slice::Iter<'_, NodeModel> {
        self.nodes.iter()
    }
}

impl IntoIterator for TreePath {
    type Item = NodeModel;
    type IntoIter = std::vec::IntoIter<NodeModel>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

/// Structural change reported to tree observers
#[derive(Debug, Clone, PartialEq)]
pub struct TreeModelEvent {
    /// Root path of the emitting tree model
    pub root: ItemPath,
    /// Underlying change
    pub event: BridgeEvent,
}

impl TreeModelEvent {
    /// Kind of change
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ChangeKind {
        self.event.kind
    }

    /// Affected path
    #[inline]
    #[must_use]
    pub const fn path(&self) -> &ItemPath {
        &self.event.path
    }
}

/// Receiver of tree structure changes
pub trait TreeObserver: Send + Sync {
    /// Called once per event, in delivery order
    fn on_tree_event(&self, event: &TreeModelEvent);
}

/// Handle of an observer registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

struct QueueContext {
    root: ItemPath,
    sender: Sender<TreeModelEvent>,
}

impl ObservationContext for QueueContext {
    fn notify_observers(&self, events: Vec<BridgeEvent>) {
        for event in events {
            let event = TreeModelEvent {
                root: self.root.clone(),
                event,
            };
            if self.sender.send(event).is_err() {
                tracing::debug!(root = %self.root, "tree model dropped, discarding event");
                return;
            }
        }
    }
}

/// Tree view of the subtree below one root node
///
/// Equality and hashing follow the root reference only.
pub struct ObservableTreeModel {
    root: NodeModel,
    adapter: Option<EventListenerAdapter>,
    sender: Sender<TreeModelEvent>,
    receiver: Receiver<TreeModelEvent>,
    observers: RwLock<Vec<(ObserverId, Arc<dyn TreeObserver>)>>,
    next_observer: AtomicU64,
    children: ChildrenCache,
}

impl ObservableTreeModel {
    /// Create a tree model over `root`
    #[must_use]
    pub fn new(root: NodeModel) -> Self {
        Self::with_cache(root, ChildrenCache::default())
    }

    /// Create a tree model with a custom children cache
    #[must_use]
    pub fn with_cache(root: NodeModel, children: ChildrenCache) -> Self {
        let (sender, receiver) = channel::unbounded();
        Self {
            root,
            adapter: None,
            sender,
            receiver,
            observers: RwLock::new(Vec::new()),
            next_observer: AtomicU64::new(1),
            children,
        }
    }

    /// Root reference
    #[inline]
    #[must_use]
    pub const fn root(&self) -> &NodeModel {
        &self.root
    }

    fn repository(&self) -> &Arc<dyn Repository> {
        self.root.repository()
    }

    /// Tree path from the root to `target`
    ///
    /// `None` when the target lies outside the root, when the root is
    /// absent, or when any node along the way is missing.
    ///
    /// # Errors
    /// Returns error on session failure
    pub fn lookup<T: AsRef<ItemModel>>(&self, target: &T) -> ModelResult<Option<TreePath>> {
        let Some(root_path) = self.root.item().current_path()? else {
            return Ok(None);
        };
        let Some(target_path) = target.as_ref().current_path()? else {
            return Ok(None);
        };
        let Ok(segments) = target_path.relative_to(&root_path) else {
            return Ok(None);
        };
        // Walk from a fresh handle; the root's cached one may predate a move.
        let Some(mut current) = self.repository().node_by_path(&root_path)? else {
            return Ok(None);
        };

        let mut nodes = Vec::with_capacity(segments.len() + 1);
        nodes.push(self.root.clone());
        for segment in &segments {
            match self.repository().child_node(&current, segment)? {
                Some(child) => {
                    nodes.push(NodeModel::from_handle(
                        Arc::clone(self.repository()),
                        child.clone(),
                    ));
                    current = child;
                }
                None => return Ok(None),
            }
        }
        Ok(Some(TreePath { nodes }))
    }

    /// Children of `node`, served through the children cache
    ///
    /// # Errors
    /// Returns error on session failure
    pub fn children(&self, node: &NodeModel) -> ModelResult<Vec<NodeModel>> {
        let Some(handle) = node.resolve()? else {
            return Ok(Vec::new());
        };
        let listing = self
            .children
            .get_or_load(&handle.path, || self.repository().child_nodes(&handle))
            .map_err(|source| ModelError::ChildrenLoad {
                path: handle.path.clone(),
                source,
            })?;
        Ok(listing
            .iter()
            .map(|child| NodeModel::from_handle(Arc::clone(self.repository()), child.clone()))
            .collect())
    }

    /// Children cache of this model
    #[inline]
    #[must_use]
    pub const fn children_cache(&self) -> &ChildrenCache {
        &self.children
    }

    /// Subscribe to structural changes below the root
    ///
    /// Property changes are not observed.
    ///
    /// # Errors
    /// Returns [`ModelError::AlreadyObserving`] while a subscription is live,
    /// or an error if the root has no path or registration fails
    pub fn start_observation(&mut self) -> ModelResult<()> {
        let root_path = self
            .root
            .item()
            .current_path()?
            .ok_or_else(|| ModelError::RootUnavailable(self.root.identity().to_string()))?;
        if self.is_observing() {
            return Err(ModelError::AlreadyObserving(root_path));
        }

        let context = Arc::new(QueueContext {
            root: root_path.clone(),
            sender: self.sender.clone(),
        });
        let mut adapter = EventListenerAdapter::new(Arc::clone(self.repository()));
        adapter.start(context, EventFilter::new(EventMask::STRUCTURE, root_path, true))?;
        self.adapter = Some(adapter);
        Ok(())
    }

    /// Drop the subscription; idempotent
    ///
    /// Events queued before this call are still delivered by
    /// [`ObservableTreeModel::process_pending`].
    pub fn stop_observation(&mut self) {
        if let Some(mut adapter) = self.adapter.take() {
            adapter.stop();
        }
    }

    /// Whether a subscription is live
    #[must_use]
    pub fn is_observing(&self) -> bool {
        self.adapter
            .as_ref()
            .is_some_and(EventListenerAdapter::is_active)
    }

    /// Register an observer
    pub fn subscribe(&self, observer: Arc<dyn TreeObserver>) -> ObserverId {
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((id, observer));
        tracing::debug!(%id, "tree observer subscribed");
        id
    }

    /// Remove an observer; returns whether it was registered
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(registered, _)| *registered != id);
        before != observers.len()
    }

    /// Number of registered observers
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Deliver queued events to observers
    ///
    /// Returns the number of events delivered.
    pub fn process_pending(&self) -> usize {
        let mut delivered = 0;
        while let Ok(event) = self.receiver.try_recv() {
            self.invalidate_for(&event.event);
            // Snapshot so observers may (un)subscribe while being notified
            let observers: Vec<Arc<dyn TreeObserver>> = self
                .observers
                .read()
                .iter()
                .map(|(_, observer)| Arc::clone(observer))
                .collect();
            for observer in &observers {
                observer.on_tree_event(&event);
            }
            delivered += 1;
        }
        if delivered > 0 {
            tracing::debug!(root = %self.root.identity(), delivered, "tree events processed");
        }
        delivered
    }

    fn invalidate_for(&self, event: &BridgeEvent) {
        match event.kind {
            ChangeKind::Removed | ChangeKind::Moved => self.children.invalidate_all(),
            ChangeKind::Added | ChangeKind::PropertyChanged => {
                for parent in event.affected_parents() {
                    self.children.invalidate(&parent);
                }
            }
        }
    }

    /// Detach the root reference; observation is unaffected
    pub fn detach(&self) {
        self.root.detach();
    }
}

impl PartialEq for ObservableTreeModel {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl Eq for ObservableTreeModel {}

impl Hash for ObservableTreeModel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.root.hash(state);
    }
}

impl fmt::Debug for ObservableTreeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableTreeModel")
            .field("root", &self.root)
            .field("observing", &self.is_observing())
            .field("observers", &self.observer_count())
            .finish_non_exhaustive()
    }
}
