//! Repository access and observation contracts
//!
//! [`Repository`] is the read and subscription surface consumed by the
//! model layer. [`EventListener`] is implemented by subscribers; it is
//! invoked from the repository's own delivery thread, never from the caller
//! that performed the write.

use crate::error::{RepoError, RepoResult};
use crate::event::{EventFilter, RawEvent};
use crate::item::{Item, ItemId, NodeHandle};
use crate::path::ItemPath;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;

/// Handle of a listener registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

impl Display for ListenerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Receiver of repository change notifications
pub trait EventListener: Send + Sync {
    /// A batch of events matching the listener's filter, in write order
    fn on_events(&self, events: &[RawEvent]);

    /// The observation stream failed; no further events will follow
    fn on_error(&self, error: &RepoError);
}

/// Hierarchical content store
///
/// All lookups report a missing item as `Ok(None)`.
pub trait Repository: Send + Sync + Debug {
    /// Look up a node or property by path
    ///
    /// # Errors
    /// Returns error on session failure
    fn item_by_path(&self, path: &ItemPath) -> RepoResult<Option<Item>>;

    /// Look up a node by identifier
    ///
    /// # Errors
    /// Returns error on session failure
    fn node_by_id(&self, id: ItemId) -> RepoResult<Option<NodeHandle>>;

    /// Look up a named child of `parent`
    ///
    /// # Errors
    /// Returns error on session failure
    fn child_node(&self, parent: &NodeHandle, name: &str) -> RepoResult<Option<NodeHandle>>;

    /// All children of `parent` in document order
    ///
    /// # Errors
    /// Returns error on session failure
    fn child_nodes(&self, parent: &NodeHandle) -> RepoResult<Vec<NodeHandle>>;

    /// Structural parent of `node`, `None` for the root
    ///
    /// # Errors
    /// Returns error on session failure
    fn parent_node(&self, node: &NodeHandle) -> RepoResult<Option<NodeHandle>>;

    /// Canonical counterpart of a projectable node
    ///
    /// Returns the node itself for physical nodes and `None` for virtual
    /// nodes without a canonical counterpart.
    ///
    /// # Errors
    /// Returns error on session failure
    fn canonical_node(&self, node: &NodeHandle) -> RepoResult<Option<NodeHandle>>;

    /// Register a listener
    ///
    /// Returns once the registration is active.
    ///
    /// # Errors
    /// Returns error on session failure
    fn add_event_listener(
        &self,
        listener: Arc<dyn EventListener>,
        filter: EventFilter,
    ) -> RepoResult<ListenerId>;

    /// Unregister a listener
    ///
    /// # Errors
    /// Returns error if the id is unknown or on session failure
    fn remove_event_listener(&self, id: ListenerId) -> RepoResult<()>;

    /// Look up a node by path
    ///
    /// # Errors
    /// Returns error on session failure
    fn node_by_path(&self, path: &ItemPath) -> RepoResult<Option<NodeHandle>> {
        Ok(self.item_by_path(path)?.and_then(Item::into_node))
    }
}
