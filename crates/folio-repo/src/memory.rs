//! In-process repository with threaded observation delivery
//!
//! [`InMemoryRepository`] keeps the content tree behind a read/write lock.
//! Each write produces one event batch which is queued, while the write lock
//! is still held, onto a channel drained by a dedicated `folio-observation`
//! thread. That thread fans batches out to listeners, so listeners always
//! run on a thread other than the writer's and see batches in write order.

use crate::error::{RepoError, RepoResult};
use crate::event::{EventFilter, EventKind, RawEvent};
use crate::item::{Item, ItemId, NodeHandle, PropertyHandle};
use crate::path::ItemPath;
use crate::repository::{EventListener, ListenerId, Repository};
use chrono::Utc;
use crossbeam::channel::{self, Receiver, Sender};
use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Primary type given to the root node
pub const ROOT_NODE_TYPE: &str = "rep:root";

/// Primary type given to virtual nodes without a canonical counterpart
pub const VIRTUAL_NODE_TYPE: &str = "hippo:facetresult";

/// Projection capability of a stored node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Projection {
    /// Physical node, its own canonical node
    Physical,
    /// Virtual node projecting another node, or nothing
    Virtual(Option<ItemId>),
    /// Node without projection support
    Unsupported,
}

#[derive(Debug, Clone)]
struct NodeRecord {
    id: ItemId,
    path: ItemPath,
    primary_type: String,
    parent: Option<ItemId>,
    children: IndexMap<String, ItemId>,
    properties: IndexMap<String, serde_json::Value>,
    projection: Projection,
}

impl NodeRecord {
    fn handle(&self) -> NodeHandle {
        NodeHandle {
            id: self.id,
            path: self.path.clone(),
            primary_type: self.primary_type.clone(),
            projectable: !matches!(self.projection, Projection::Unsupported),
        }
    }
}

#[derive(Debug)]
struct Store {
    nodes: HashMap<ItemId, NodeRecord>,
    root: ItemId,
    live: bool,
}

impl Store {
    fn new() -> Self {
        let root = NodeRecord {
            id: ItemId::generate(),
            path: ItemPath::root(),
            primary_type: ROOT_NODE_TYPE.to_string(),
            parent: None,
            children: IndexMap::new(),
            properties: IndexMap::new(),
            projection: Projection::Physical,
        };
        let root_id = root.id;
        let mut nodes = HashMap::new();
        nodes.insert(root_id, root);
        Self {
            nodes,
            root: root_id,
            live: true,
        }
    }

    fn find(&self, path: &ItemPath) -> Option<&NodeRecord> {
        let mut current = self.nodes.get(&self.root)?;
        for segment in path.iter() {
            let child = current.children.get(segment)?;
            current = self.nodes.get(child)?;
        }
        Some(current)
    }

    fn find_id(&self, path: &ItemPath) -> Option<ItemId> {
        self.find(path).map(|record| record.id)
    }

    fn subtree_ids(&self, id: ItemId) -> Vec<ItemId> {
        let mut ids = vec![id];
        let mut cursor = 0;
        while cursor < ids.len() {
            if let Some(record) = self.nodes.get(&ids[cursor]) {
                ids.extend(record.children.values().copied());
            }
            cursor += 1;
        }
        ids
    }
}

#[derive(Clone)]
struct Registration {
    id: ListenerId,
    listener: Arc<dyn EventListener>,
    filter: EventFilter,
    // First batch sequence number this listener may see
    since: u64,
}

type Registrations = Arc<RwLock<Vec<Registration>>>;

enum Delivery {
    Batch { sequence: u64, events: Vec<RawEvent> },
    SessionLost,
    Barrier(Sender<()>),
}

/// Content repository held in memory
///
/// Writes are applied immediately; every write produces one event batch.
pub struct InMemoryRepository {
    store: RwLock<Store>,
    registrations: Registrations,
    next_listener: AtomicU64,
    published: AtomicU64,
    deliveries: Sender<Delivery>,
    user_id: String,
}

impl InMemoryRepository {
    /// Create an empty repository acting as user `admin`
    ///
    /// # Errors
    /// Returns error if the delivery thread cannot be spawned
    pub fn new() -> RepoResult<Self> {
        Self::with_user("admin")
    }

    /// Create an empty repository whose writes are attributed to `user_id`
    ///
    /// # Errors
    /// Returns error if the delivery thread cannot be spawned
    pub fn with_user(user_id: impl Into<String>) -> RepoResult<Self> {
        let (tx, rx) = channel::unbounded();
        let registrations: Registrations = Arc::new(RwLock::new(Vec::new()));
        let thread_registrations = Arc::clone(&registrations);

        std::thread::Builder::new()
            .name("folio-observation".into())
            .spawn(move || deliver(&rx, &thread_registrations))
            .map_err(RepoError::DeliveryThread)?;

        Ok(Self {
            store: RwLock::new(Store::new()),
            registrations,
            next_listener: AtomicU64::new(1),
            published: AtomicU64::new(0),
            deliveries: tx,
            user_id: user_id.into(),
        })
    }

    /// Handle of the root node
    ///
    /// # Errors
    /// Returns error on session failure
    pub fn root_node(&self) -> RepoResult<NodeHandle> {
        let store = self.read()?;
        Ok(store.nodes[&store.root].handle())
    }

    /// Number of nodes including the root
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.store.read().nodes.len()
    }

    /// Number of active listener registrations
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.registrations.read().len()
    }

    /// Create a physical node
    ///
    /// # Errors
    /// Returns error if the parent is missing, the name is taken or illegal
    pub fn add_node(
        &self,
        parent: &ItemPath,
        name: &str,
        primary_type: &str,
    ) -> RepoResult<NodeHandle> {
        self.insert_node(parent, name, primary_type, Projection::Physical)
    }

    /// Create a node without canonical-node projection support
    ///
    /// # Errors
    /// Returns error if the parent is missing, the name is taken or illegal
    pub fn add_plain_node(
        &self,
        parent: &ItemPath,
        name: &str,
        primary_type: &str,
    ) -> RepoResult<NodeHandle> {
        self.insert_node(parent, name, primary_type, Projection::Unsupported)
    }

    /// Create a virtual node projecting `canonical`
    ///
    /// With `canonical = None` the node is virtual without any canonical
    /// counterpart.
    ///
    /// # Errors
    /// Returns error if the parent or the canonical node is missing, or the
    /// name is taken or illegal
    pub fn add_projection(
        &self,
        parent: &ItemPath,
        name: &str,
        canonical: Option<&ItemPath>,
    ) -> RepoResult<NodeHandle> {
        let (canonical_id, primary_type) = match canonical {
            Some(path) => {
                let store = self.read()?;
                let record = store
                    .find(path)
                    .ok_or_else(|| RepoError::NoSuchItem(path.clone()))?;
                (Some(record.id), record.primary_type.clone())
            }
            None => (None, VIRTUAL_NODE_TYPE.to_string()),
        };
        self.insert_node(parent, name, &primary_type, Projection::Virtual(canonical_id))
    }

    fn insert_node(
        &self,
        parent: &ItemPath,
        name: &str,
        primary_type: &str,
        projection: Projection,
    ) -> RepoResult<NodeHandle> {
        let path = parent.child(name)?;
        let mut store = self.write()?;

        let parent_record = store
            .find(parent)
            .ok_or_else(|| RepoError::NoSuchParent(parent.clone()))?;
        if parent_record.children.contains_key(name) {
            return Err(RepoError::ItemExists(path));
        }
        let parent_id = parent_record.id;

        let record = NodeRecord {
            id: ItemId::generate(),
            path: path.clone(),
            primary_type: primary_type.to_string(),
            parent: Some(parent_id),
            children: IndexMap::new(),
            properties: IndexMap::new(),
            projection,
        };
        let handle = record.handle();
        store.nodes.insert(record.id, record);
        let parent_record = store
            .nodes
            .get_mut(&parent_id)
            .ok_or_else(|| RepoError::NoSuchParent(parent.clone()))?;
        parent_record.children.insert(name.to_string(), handle.id);

        let event = self.event(EventKind::NodeAdded, path, handle.id, parent_record, None);
        tracing::debug!(path = %handle.path, "node added");
        self.publish(vec![event]);
        Ok(handle)
    }

    /// Remove a node and its subtree
    ///
    /// Emits a single [`EventKind::NodeRemoved`] event for `path`.
    ///
    /// # Errors
    /// Returns error if the node does not exist or is the root
    pub fn remove_node(&self, path: &ItemPath) -> RepoResult<()> {
        let mut store = self.write()?;
        let record = store
            .find(path)
            .ok_or_else(|| RepoError::NoSuchItem(path.clone()))?;
        let Some(parent_id) = record.parent else {
            return Err(RepoError::RootImmutable);
        };
        let id = record.id;

        for removed in store.subtree_ids(id) {
            store.nodes.remove(&removed);
        }
        let parent_record = store
            .nodes
            .get_mut(&parent_id)
            .ok_or_else(|| RepoError::NoSuchParent(path.clone()))?;
        if let Some(name) = path.name() {
            parent_record.children.shift_remove(name);
        }

        let event = self.event(EventKind::NodeRemoved, path.clone(), id, parent_record, None);
        tracing::debug!(%path, "node removed");
        self.publish(vec![event]);
        Ok(())
    }

    /// Move (or rename) a node to `destination`
    ///
    /// Emits a single [`EventKind::NodeMoved`] event at the destination path.
    ///
    /// # Errors
    /// Returns error if the source is missing or the root, the destination
    /// exists or lies inside the source, or its parent is missing
    pub fn move_node(&self, source: &ItemPath, destination: &ItemPath) -> RepoResult<()> {
        let (Some(dest_parent), Some(dest_name)) = (destination.parent(), destination.name())
        else {
            return Err(RepoError::RootImmutable);
        };
        if source.is_prefix_of(destination) {
            return Err(RepoError::IllegalMove {
                from: source.clone(),
                to: destination.clone(),
            });
        }

        let mut store = self.write()?;
        let record = store
            .find(source)
            .ok_or_else(|| RepoError::NoSuchItem(source.clone()))?;
        let Some(old_parent) = record.parent else {
            return Err(RepoError::RootImmutable);
        };
        let id = record.id;
        let new_parent = store
            .find_id(&dest_parent)
            .ok_or_else(|| RepoError::NoSuchParent(dest_parent.clone()))?;
        if store.find(destination).is_some() {
            return Err(RepoError::ItemExists(destination.clone()));
        }

        if let (Some(parent), Some(name)) = (store.nodes.get_mut(&old_parent), source.name()) {
            parent.children.shift_remove(name);
        }
        for moved in store.subtree_ids(id) {
            if let Some(node) = store.nodes.get_mut(&moved) {
                if let Some(rebased) = node.path.rebase(source, destination) {
                    node.path = rebased;
                }
            }
        }
        if let Some(node) = store.nodes.get_mut(&id) {
            node.parent = Some(new_parent);
        }
        let parent_record = store
            .nodes
            .get_mut(&new_parent)
            .ok_or_else(|| RepoError::NoSuchParent(dest_parent.clone()))?;
        parent_record.children.insert(dest_name.to_string(), id);

        let event = self.event(
            EventKind::NodeMoved,
            destination.clone(),
            id,
            parent_record,
            Some(source.clone()),
        );
        tracing::debug!(from = %source, to = %destination, "node moved");
        self.publish(vec![event]);
        Ok(())
    }

    /// Set a property on the node at `node`
    ///
    /// # Errors
    /// Returns error if the node does not exist or the name is illegal
    pub fn set_property(
        &self,
        node: &ItemPath,
        name: &str,
        value: serde_json::Value,
    ) -> RepoResult<()> {
        let path = node.child(name)?;
        let mut store = self.write()?;
        let id = store
            .find_id(node)
            .ok_or_else(|| RepoError::NoSuchItem(node.clone()))?;
        let record = store
            .nodes
            .get_mut(&id)
            .ok_or_else(|| RepoError::NoSuchItem(node.clone()))?;

        let kind = match record.properties.insert(name.to_string(), value) {
            Some(_) => EventKind::PropertyChanged,
            None => EventKind::PropertyAdded,
        };
        let event = self.event(kind, path, id, record, None);
        self.publish(vec![event]);
        Ok(())
    }

    /// Remove a property from the node at `node`
    ///
    /// # Errors
    /// Returns error if the node or the property does not exist
    pub fn remove_property(&self, node: &ItemPath, name: &str) -> RepoResult<()> {
        let path = node.child(name)?;
        let mut store = self.write()?;
        let id = store
            .find_id(node)
            .ok_or_else(|| RepoError::NoSuchItem(node.clone()))?;
        let record = store
            .nodes
            .get_mut(&id)
            .ok_or_else(|| RepoError::NoSuchItem(node.clone()))?;
        if record.properties.shift_remove(name).is_none() {
            return Err(RepoError::NoSuchItem(path));
        }

        let event = self.event(EventKind::PropertyRemoved, path, id, record, None);
        self.publish(vec![event]);
        Ok(())
    }

    /// Invalidate the session
    ///
    /// Every later call fails with [`RepoError::SessionInvalid`]. Registered
    /// listeners receive [`EventListener::on_error`] once and are dropped.
    pub fn invalidate_session(&self) {
        let mut store = self.store.write();
        if !store.live {
            return;
        }
        store.live = false;
        tracing::warn!("repository session invalidated");
        if self.deliveries.send(Delivery::SessionLost).is_err() {
            tracing::warn!("observation delivery thread has stopped");
        }
    }

    /// Block until every batch queued so far has been delivered
    ///
    /// Must not be called from inside a listener callback.
    pub fn sync(&self) {
        let (ack_tx, ack_rx) = channel::bounded(1);
        if self.deliveries.send(Delivery::Barrier(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, Store>> {
        let store = self.store.read();
        if !store.live {
            return Err(RepoError::SessionInvalid);
        }
        Ok(store)
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, Store>> {
        let store = self.store.write();
        if !store.live {
            return Err(RepoError::SessionInvalid);
        }
        Ok(store)
    }

    fn event(
        &self,
        kind: EventKind,
        path: ItemPath,
        identifier: ItemId,
        parent: &NodeRecord,
        moved_from: Option<ItemPath>,
    ) -> RawEvent {
        RawEvent {
            kind,
            path,
            identifier,
            parent_id: parent.id,
            parent_type: parent.primary_type.clone(),
            user_id: self.user_id.clone(),
            date: Utc::now(),
            moved_from,
        }
    }

    // Called with the store write lock held so batches queue in write order.
    fn publish(&self, events: Vec<RawEvent>) {
        let sequence = self.published.fetch_add(1, Ordering::SeqCst);
        if self.deliveries.send(Delivery::Batch { sequence, events }).is_err() {
            tracing::warn!("observation delivery thread has stopped, dropping events");
        }
    }
}

impl fmt::Debug for InMemoryRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryRepository")
            .field("nodes", &self.node_count())
            .field("listeners", &self.listener_count())
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

impl Repository for InMemoryRepository {
    fn item_by_path(&self, path: &ItemPath) -> RepoResult<Option<Item>> {
        let store = self.read()?;
        if let Some(record) = store.find(path) {
            return Ok(Some(Item::Node(record.handle())));
        }

        let (Some(owner), Some(name)) = (path.parent(), path.name()) else {
            return Ok(None);
        };
        Ok(store.find(&owner).and_then(|record| {
            record.properties.get(name).map(|value| {
                Item::Property(PropertyHandle {
                    path: path.clone(),
                    parent_id: record.id,
                    value: value.clone(),
                })
            })
        }))
    }

    fn node_by_id(&self, id: ItemId) -> RepoResult<Option<NodeHandle>> {
        Ok(self.read()?.nodes.get(&id).map(NodeRecord::handle))
    }

    fn child_node(&self, parent: &NodeHandle, name: &str) -> RepoResult<Option<NodeHandle>> {
        let store = self.read()?;
        Ok(store
            .nodes
            .get(&parent.id)
            .and_then(|record| record.children.get(name))
            .and_then(|child| store.nodes.get(child))
            .map(NodeRecord::handle))
    }

    fn child_nodes(&self, parent: &NodeHandle) -> RepoResult<Vec<NodeHandle>> {
        let store = self.read()?;
        let Some(record) = store.nodes.get(&parent.id) else {
            return Ok(Vec::new());
        };
        Ok(record
            .children
            .values()
            .filter_map(|child| store.nodes.get(child))
            .map(NodeRecord::handle)
            .collect())
    }

    fn parent_node(&self, node: &NodeHandle) -> RepoResult<Option<NodeHandle>> {
        let store = self.read()?;
        Ok(store
            .nodes
            .get(&node.id)
            .and_then(|record| record.parent)
            .and_then(|parent| store.nodes.get(&parent))
            .map(NodeRecord::handle))
    }

    fn canonical_node(&self, node: &NodeHandle) -> RepoResult<Option<NodeHandle>> {
        let store = self.read()?;
        let Some(record) = store.nodes.get(&node.id) else {
            return Ok(None);
        };
        Ok(match record.projection {
            Projection::Physical => Some(record.handle()),
            Projection::Virtual(Some(canonical)) => {
                store.nodes.get(&canonical).map(NodeRecord::handle)
            }
            Projection::Virtual(None) | Projection::Unsupported => None,
        })
    }

    fn add_event_listener(
        &self,
        listener: Arc<dyn EventListener>,
        filter: EventFilter,
    ) -> RepoResult<ListenerId> {
        let store = self.read()?;
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, scope = %filter.scope, deep = filter.deep, "listener registered");
        // Writers publish under the store write lock, so no batch can be
        // queued between reading the sequence and pushing the registration.
        let since = self.published.load(Ordering::SeqCst);
        self.registrations.write().push(Registration {
            id,
            listener,
            filter,
            since,
        });
        drop(store);
        Ok(id)
    }

    fn remove_event_listener(&self, id: ListenerId) -> RepoResult<()> {
        let _store = self.read()?;
        let mut registrations = self.registrations.write();
        let index = registrations
            .iter()
            .position(|registration| registration.id == id)
            .ok_or(RepoError::ListenerNotFound(id))?;
        registrations.remove(index);
        tracing::debug!(%id, "listener removed");
        Ok(())
    }
}

fn deliver(deliveries: &Receiver<Delivery>, registrations: &Registrations) {
    for delivery in deliveries {
        match delivery {
            Delivery::Batch { sequence, events } => {
                let snapshot = registrations.read().clone();
                for registration in snapshot {
                    if sequence < registration.since {
                        continue;
                    }
                    let matching: Vec<RawEvent> = events
                        .iter()
                        .filter(|event| registration.filter.matches(event))
                        .cloned()
                        .collect();
                    if !matching.is_empty() {
                        registration.listener.on_events(&matching);
                    }
                }
            }
            Delivery::SessionLost => {
                let dropped = std::mem::take(&mut *registrations.write());
                for registration in dropped {
                    registration.listener.on_error(&RepoError::SessionInvalid);
                }
            }
            Delivery::Barrier(ack) => {
                let _ = ack.send(());
            }
        }
    }
    tracing::debug!("observation delivery thread finished");
}
