//! Folio Repository Primitives
//!
//! Hierarchical, observable content store consumed by the model layer.
//!
//! # Core Concepts
//!
//! - [`ItemPath`]: absolute `/`-separated item address
//! - [`ItemId`]: stable node identifier that survives moves
//! - [`Item`], [`NodeHandle`], [`PropertyHandle`]: live item snapshots
//! - [`RawEvent`], [`EventMask`], [`EventFilter`]: change notifications
//! - [`Repository`], [`EventListener`]: read and subscription contracts
//! - [`InMemoryRepository`]: reference store with threaded event delivery
//!
//! # Example
//!
//! ```rust
//! use folio_repo::{InMemoryRepository, ItemPath, Repository};
//!
//! let repo = InMemoryRepository::new().unwrap();
//! repo.add_node(&ItemPath::root(), "content", "hippostd:folder").unwrap();
//!
//! let path: ItemPath = "/content".parse().unwrap();
//! let node = repo.node_by_path(&path).unwrap();
//! assert!(node.is_some());
//! ```

#![warn(missing_docs)]

mod error;
mod event;
mod fixture;
mod item;
mod memory;
mod path;
mod repository;

// Re-exports
pub use error::{RepoError, RepoResult};
pub use event::{EventFilter, EventKind, EventMask, RawEvent};
pub use fixture::NodeFixture;
pub use item::{Item, ItemId, NodeHandle, PropertyHandle};
pub use memory::{InMemoryRepository, ROOT_NODE_TYPE, VIRTUAL_NODE_TYPE};
pub use path::{ItemPath, PathError};
pub use repository::{EventListener, ListenerId, Repository};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
