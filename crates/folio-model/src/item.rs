//! Lazily resolved references to repository items
//!
//! An [`ItemModel`] names an item by path or identifier and obtains the live
//! handle on first use. The handle is cached until [`ItemModel::detach`] so a
//! reference can be stored in long-lived UI state and rebound later.

use folio_repo::{Item, ItemId, ItemPath, RepoResult, Repository};
use parking_lot::Mutex;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Logical identity of an item reference
///
/// Fixed by the constructor: references built from a path are named by that
/// path, references built from an identifier by the identifier, so both kinds
/// stay stable across moves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemIdentity {
    /// Addressed by absolute path
    Path(ItemPath),
    /// Addressed by identifier only
    Id(ItemId),
}

impl fmt::Display for ItemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{path}"),
            Self::Id(id) => write!(f, "[{id}]"),
        }
    }
}

/// Detachable reference to a node or property
pub struct ItemModel {
    repository: Arc<dyn Repository>,
    identity: ItemIdentity,
    id: Option<ItemId>,
    cached: Mutex<Option<Item>>,
}

impl ItemModel {
    /// Reference the item at `path`
    #[must_use]
    pub fn from_path(repository: Arc<dyn Repository>, path: ItemPath) -> Self {
        Self {
            repository,
            identity: ItemIdentity::Path(path),
            id: None,
            cached: Mutex::new(None),
        }
    }

    /// Reference the node with identifier `id`
    ///
    /// The node is looked up once and its handle cached when it exists.
    ///
    /// # Errors
    /// Returns error on session failure
    pub fn from_id(repository: Arc<dyn Repository>, id: ItemId) -> RepoResult<Self> {
        let node = repository.node_by_id(id)?;
        Ok(Self {
            repository,
            identity: ItemIdentity::Id(id),
            id: Some(id),
            cached: Mutex::new(node.map(Item::Node)),
        })
    }

    /// Reference an item from a live handle
    #[must_use]
    pub fn from_item(repository: Arc<dyn Repository>, item: Item) -> Self {
        let id = item.as_node().map(|node| node.id);
        Self {
            repository,
            identity: ItemIdentity::Path(item.path().clone()),
            id,
            cached: Mutex::new(Some(item)),
        }
    }

    /// Logical identity
    #[inline]
    #[must_use]
    pub const fn identity(&self) -> &ItemIdentity {
        &self.identity
    }

    /// Path the reference was created with, if any
    #[inline]
    #[must_use]
    pub fn path(&self) -> Option<&ItemPath> {
        match &self.identity {
            ItemIdentity::Path(path) => Some(path),
            ItemIdentity::Id(_) => None,
        }
    }

    /// Identifier, if known
    #[inline]
    #[must_use]
    pub const fn id(&self) -> Option<ItemId> {
        self.id
    }

    /// Repository this reference resolves against
    #[inline]
    #[must_use]
    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repository
    }

    /// Live handle, resolving it if needed
    ///
    /// A missing item is `Ok(None)` and is looked up again on the next call.
    ///
    /// # Errors
    /// Returns error on session failure
    pub fn resolve(&self) -> RepoResult<Option<Item>> {
        let mut cached = self.cached.lock();
        if let Some(item) = cached.as_ref() {
            return Ok(Some(item.clone()));
        }

        let found = match (self.id, &self.identity) {
            (Some(id), _) => self.repository.node_by_id(id)?.map(Item::Node),
            (None, ItemIdentity::Path(path)) => self.repository.item_by_path(path)?,
            (None, ItemIdentity::Id(_)) => None,
        };
        if let Some(item) = &found {
            tracing::trace!(identity = %self.identity, "item resolved");
            *cached = Some(item.clone());
        }
        Ok(found)
    }

    /// Whether a live handle is currently cached
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.cached.lock().is_some()
    }

    /// Path to address the item with right now
    ///
    /// The construction path for path references. For identifier references
    /// the node is looked up again, bypassing the cached handle, so the
    /// answer follows moves.
    ///
    /// # Errors
    /// Returns error on session failure
    pub fn current_path(&self) -> RepoResult<Option<ItemPath>> {
        match &self.identity {
            ItemIdentity::Path(path) => Ok(Some(path.clone())),
            ItemIdentity::Id(id) => Ok(self.repository.node_by_id(*id)?.map(|node| node.path)),
        }
    }

    /// Release the cached handle
    pub fn detach(&self) {
        if self.cached.lock().take().is_some() {
            tracing::trace!(identity = %self.identity, "item detached");
        }
    }
}

impl Clone for ItemModel {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            identity: self.identity.clone(),
            id: self.id,
            cached: Mutex::new(self.cached.lock().clone()),
        }
    }
}

impl PartialEq for ItemModel {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for ItemModel {}

impl Hash for ItemModel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

impl fmt::Debug for ItemModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemModel")
            .field("identity", &self.identity)
            .field("attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}

impl AsRef<Self> for ItemModel {
    fn as_ref(&self) -> &Self {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_repo::{InMemoryRepository, RepoError};

    fn p(s: &str) -> ItemPath {
        s.parse().unwrap()
    }

    fn repo() -> Arc<InMemoryRepository> {
        let repo = InMemoryRepository::new().unwrap();
        repo.add_node(&ItemPath::root(), "content", "hippostd:folder")
            .unwrap();
        repo.set_property(&p("/content"), "hippo:name", serde_json::json!("Content"))
            .unwrap();
        Arc::new(repo)
    }

    #[test]
    fn resolve_by_path() {
        let repo = repo();
        let model = ItemModel::from_path(repo, p("/content"));
        assert!(!model.is_attached());

        let item = model.resolve().unwrap().unwrap();
        assert!(item.is_node());
        assert!(model.is_attached());
    }

    #[test]
    fn resolve_property() {
        let model = ItemModel::from_path(repo(), p("/content/hippo:name"));
        let item = model.resolve().unwrap().unwrap();
        assert!(!item.is_node());
    }

    #[test]
    fn absent_item_is_none_and_not_cached() {
        let repo = repo();
        let model = ItemModel::from_path(repo.clone(), p("/content/later"));
        assert!(model.resolve().unwrap().is_none());
        assert!(!model.is_attached());

        repo.add_node(&p("/content"), "later", "hippo:handle").unwrap();
        assert!(model.resolve().unwrap().is_some());
    }

    #[test]
    fn session_failure_is_an_error() {
        let repo = repo();
        let model = ItemModel::from_path(repo.clone(), p("/content"));
        repo.invalidate_session();
        assert!(matches!(model.resolve(), Err(RepoError::SessionInvalid)));
    }

    #[test]
    fn id_reference_keeps_id_identity() {
        let repo = repo();
        let node = repo.node_by_path(&p("/content")).unwrap().unwrap();

        let by_id = ItemModel::from_id(repo.clone(), node.id).unwrap();
        assert_eq!(by_id.identity(), &ItemIdentity::Id(node.id));
        assert!(by_id.path().is_none());
        assert!(by_id.is_attached());
        assert_eq!(by_id.current_path().unwrap(), Some(p("/content")));
        assert_eq!(by_id, ItemModel::from_id(repo, node.id).unwrap());
    }

    #[test]
    fn id_references_stay_equal_across_moves() {
        let repo = repo();
        let node = repo.node_by_path(&p("/content")).unwrap().unwrap();
        let before = ItemModel::from_id(repo.clone(), node.id).unwrap();

        repo.move_node(&p("/content"), &p("/archive")).unwrap();
        let after = ItemModel::from_id(repo, node.id).unwrap();
        assert_eq!(before, after);

        let hash = |model: &ItemModel| {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            model.hash(&mut hasher);
            hasher.finish()
        };
        assert_eq!(hash(&before), hash(&after));
        // The cached handle is stale but the live path is not.
        assert_eq!(before.current_path().unwrap(), Some(p("/archive")));
    }

    #[test]
    fn unknown_id_keeps_id_identity() {
        let id = ItemId::generate();
        let model = ItemModel::from_id(repo(), id).unwrap();
        assert_eq!(model.identity(), &ItemIdentity::Id(id));
        assert!(model.path().is_none());
        assert!(model.current_path().unwrap().is_none());
    }

    #[test]
    fn id_reference_follows_moves() {
        let repo = repo();
        let node = repo.node_by_path(&p("/content")).unwrap().unwrap();
        let model = ItemModel::from_id(repo.clone(), node.id).unwrap();
        model.detach();

        repo.move_node(&p("/content"), &p("/archive")).unwrap();
        let item = model.resolve().unwrap().unwrap();
        assert_eq!(item.path(), &p("/archive"));
        assert_eq!(model.identity(), &ItemIdentity::Id(node.id));
    }

    #[test]
    fn detach_is_idempotent_and_keeps_identity() {
        let model = ItemModel::from_path(repo(), p("/content"));
        model.resolve().unwrap();
        let before = model.clone();

        model.detach();
        model.detach();
        assert!(!model.is_attached());
        assert_eq!(model, before);
        assert!(model.resolve().unwrap().is_some());
    }
}
