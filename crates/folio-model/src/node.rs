//! Node references with parent navigation and projection detection

use crate::item::{ItemIdentity, ItemModel};
use folio_repo::{ItemId, ItemPath, NodeHandle, RepoResult, Repository};
use parking_lot::Mutex;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

enum ParentCache {
    Unresolved,
    Resolved(Option<Box<NodeModel>>),
}

/// Detachable reference to a node
///
/// Equality and hashing follow the underlying item identity.
pub struct NodeModel {
    item: ItemModel,
    parent: Mutex<ParentCache>,
}

impl NodeModel {
    /// Reference the node at `path`
    #[must_use]
    pub fn from_path(repository: Arc<dyn Repository>, path: ItemPath) -> Self {
        Self::wrap(ItemModel::from_path(repository, path))
    }

    /// Reference the node with identifier `id`
    ///
    /// # Errors
    /// Returns error on session failure
    pub fn from_id(repository: Arc<dyn Repository>, id: ItemId) -> RepoResult<Self> {
        ItemModel::from_id(repository, id).map(Self::wrap)
    }

    /// Reference a node from a live handle
    #[must_use]
    pub fn from_handle(repository: Arc<dyn Repository>, handle: NodeHandle) -> Self {
        Self::wrap(ItemModel::from_item(repository, handle.into()))
    }

    fn wrap(item: ItemModel) -> Self {
        Self {
            item,
            parent: Mutex::new(ParentCache::Unresolved),
        }
    }

    /// Underlying item reference
    #[inline]
    #[must_use]
    pub const fn item(&self) -> &ItemModel {
        &self.item
    }

    /// Logical identity
    #[inline]
    #[must_use]
    pub const fn identity(&self) -> &ItemIdentity {
        self.item.identity()
    }

    /// Repository this reference resolves against
    #[inline]
    #[must_use]
    pub fn repository(&self) -> &Arc<dyn Repository> {
        self.item.repository()
    }

    /// Live node handle
    ///
    /// `Ok(None)` when the item is missing or is a property.
    ///
    /// # Errors
    /// Returns error on session failure
    pub fn resolve(&self) -> RepoResult<Option<NodeHandle>> {
        Ok(self.item.resolve()?.and_then(folio_repo::Item::into_node))
    }

    /// Reference to the structural parent
    ///
    /// `None` for the root and when the lookup fails. A successful answer
    /// is kept until [`NodeModel::detach`].
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let mut cache = self.parent.lock();
        if let ParentCache::Resolved(parent) = &*cache {
            return parent.as_deref().cloned();
        }

        let lookup = self.resolve().and_then(|node| match node {
            Some(node) => self.repository().parent_node(&node),
            None => Ok(None),
        });
        match lookup {
            Ok(parent) => {
                let parent = parent
                    .map(|handle| Self::from_handle(Arc::clone(self.repository()), handle));
                *cache = ParentCache::Resolved(parent.clone().map(Box::new));
                parent
            }
            Err(error) => {
                tracing::warn!(node = %self.identity(), %error, "parent lookup failed");
                None
            }
        }
    }

    /// Whether the node is a projection of some other canonical node
    ///
    /// Never fails: repository errors are logged and answer `false`.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        let node = match self.resolve() {
            Ok(Some(node)) => node,
            Ok(None) => return false,
            Err(error) => {
                tracing::warn!(node = %self.identity(), %error, "virtual check failed");
                return false;
            }
        };
        if !node.projectable {
            return false;
        }

        match self.repository().canonical_node(&node) {
            Ok(Some(canonical)) => canonical.id != node.id,
            Ok(None) => true,
            Err(error) => {
                tracing::warn!(node = %self.identity(), %error, "canonical lookup failed");
                false
            }
        }
    }

    /// References to all children in document order
    ///
    /// # Errors
    /// Returns error on session failure
    pub fn children(&self) -> RepoResult<Vec<Self>> {
        let Some(node) = self.resolve()? else {
            return Ok(Vec::new());
        };
        Ok(self
            .repository()
            .child_nodes(&node)?
            .into_iter()
            .map(|child| Self::from_handle(Arc::clone(self.repository()), child))
            .collect())
    }

    /// Release the cached handle and parent
    pub fn detach(&self) {
        self.item.detach();
        *self.parent.lock() = ParentCache::Unresolved;
    }
}

impl Clone for NodeModel {
    fn clone(&self) -> Self {
        Self::wrap(self.item.clone())
    }
}

impl PartialEq for NodeModel {
    fn eq(&self, other: &Self) -> bool {
        self.item == other.item
    }
}

impl Eq for NodeModel {}

impl Hash for NodeModel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.item.hash(state);
    }
}

impl fmt::Debug for NodeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeModel").field(self.identity()).finish()
    }
}

impl AsRef<ItemModel> for NodeModel {
    fn as_ref(&self) -> &ItemModel {
        &self.item
    }
}

impl From<NodeModel> for ItemModel {
    fn from(node: NodeModel) -> Self {
        node.item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_repo::InMemoryRepository;

    fn p(s: &str) -> ItemPath {
        s.parse().unwrap()
    }

    fn repo() -> Arc<InMemoryRepository> {
        let repo = InMemoryRepository::new().unwrap();
        repo.add_node(&ItemPath::root(), "content", "hippostd:folder")
            .unwrap();
        repo.add_node(&p("/content"), "documents", "hippostd:folder")
            .unwrap();
        repo.add_projection(&p("/content"), "by-tag", Some(&p("/content/documents")))
            .unwrap();
        repo.add_projection(&p("/content"), "search", None).unwrap();
        repo.add_plain_node(&p("/content"), "scratch", "nt:unstructured")
            .unwrap();
        Arc::new(repo)
    }

    #[test]
    fn parent_navigation() {
        let repo = repo();
        let docs = NodeModel::from_path(repo.clone(), p("/content/documents"));
        let parent = docs.parent().unwrap();
        assert_eq!(parent, NodeModel::from_path(repo.clone(), p("/content")));

        let root = parent.parent().unwrap();
        assert_eq!(root.identity(), &ItemIdentity::Path(ItemPath::root()));
        assert!(root.parent().is_none());
    }

    #[test]
    fn parent_of_missing_node_is_none() {
        let model = NodeModel::from_path(repo(), p("/content/missing"));
        assert!(model.parent().is_none());
    }

    #[test]
    fn parent_lookup_failure_is_none() {
        let repo = repo();
        let model = NodeModel::from_path(repo.clone(), p("/content"));
        repo.invalidate_session();
        assert!(model.parent().is_none());
    }

    #[test]
    fn parent_is_cached_until_detach() {
        let repo = repo();
        let docs = NodeModel::from_path(repo.clone(), p("/content/documents"));
        assert_eq!(docs.parent().unwrap().identity(), &ItemIdentity::Path(p("/content")));

        // Handle stays bound to the node; the cached parent stays stale.
        repo.move_node(&p("/content/documents"), &p("/documents"))
            .unwrap();
        assert_eq!(docs.parent().unwrap().identity(), &ItemIdentity::Path(p("/content")));

        repo.move_node(&p("/documents"), &p("/content/documents"))
            .unwrap();
        docs.detach();
        assert_eq!(docs.parent().unwrap().identity(), &ItemIdentity::Path(p("/content")));
    }

    #[test]
    fn virtual_detection() {
        let repo = repo();
        let model = |s: &str| NodeModel::from_path(repo.clone(), p(s));

        assert!(!model("/content/documents").is_virtual());
        assert!(model("/content/by-tag").is_virtual());
        assert!(model("/content/search").is_virtual());
        assert!(!model("/content/scratch").is_virtual());
        assert!(!model("/content/missing").is_virtual());
    }

    #[test]
    fn virtual_detection_swallows_errors() {
        let repo = repo();
        let model = NodeModel::from_path(repo.clone(), p("/content/by-tag"));
        repo.invalidate_session();
        assert!(!model.is_virtual());
    }

    #[test]
    fn children_in_document_order() {
        let model = NodeModel::from_path(repo(), p("/content"));
        let names: Vec<String> = model
            .children()
            .unwrap()
            .iter()
            .map(|child| child.identity().to_string())
            .collect();
        assert_eq!(
            names,
            [
                "/content/documents",
                "/content/by-tag",
                "/content/search",
                "/content/scratch"
            ]
        );
    }

    #[test]
    fn property_is_not_a_node() {
        let repo = repo();
        repo.set_property(&p("/content"), "title", serde_json::json!("t"))
            .unwrap();
        let model = NodeModel::from_path(repo, p("/content/title"));
        assert!(model.resolve().unwrap().is_none());
    }
}
