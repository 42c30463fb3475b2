//! Folio Model Layer
//!
//! Detachable references to repository content and observable tree models
//! for UI components.
//!
//! # Core Concepts
//!
//! - [`ItemModel`], [`NodeModel`]: lazily resolved references whose identity
//!   survives [`detach`](ItemModel::detach)
//! - [`EventListenerAdapter`]: one repository subscription forwarding
//!   [`BridgeEvent`]s to an [`ObservationContext`]
//! - [`ObservableTreeModel`]: subtree view with path lookup, structural
//!   change observation and a [`ChildrenCache`]
//!
//! # Example
//!
//! ```rust
//! use folio_model::{NodeModel, ObservableTreeModel};
//! use folio_repo::{InMemoryRepository, ItemPath};
//! use std::sync::Arc;
//!
//! let repo = Arc::new(InMemoryRepository::new().unwrap());
//! repo.add_node(&ItemPath::root(), "content", "hippostd:folder").unwrap();
//!
//! let root = NodeModel::from_path(repo.clone(), ItemPath::root());
//! let tree = ObservableTreeModel::new(root);
//! let target = NodeModel::from_path(repo, "/content".parse().unwrap());
//! let path = tree.lookup(&target).unwrap().unwrap();
//! assert_eq!(path.len(), 2);
//! ```

#![warn(missing_docs)]

mod cache;
mod error;
mod item;
mod node;
mod observation;
mod tree;

// Re-exports
pub use cache::{ChildrenCache, DEFAULT_CAPACITY};
pub use error::{ModelError, ModelResult, ObservationError};
pub use item::{ItemIdentity, ItemModel};
pub use node::NodeModel;
pub use observation::{BridgeEvent, ChangeKind, EventListenerAdapter, ObservationContext};
pub use tree::{ObservableTreeModel, ObserverId, TreeModelEvent, TreeObserver, TreePath};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
