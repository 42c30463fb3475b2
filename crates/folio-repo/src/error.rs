//! Error types for repository access
//!
//! A missing item is never an error: lookups return `Ok(None)`. Errors are
//! reserved for session/connectivity failures and rejected writes.

use crate::path::{ItemPath, PathError};
use crate::repository::ListenerId;

/// Repository error
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// The session has been invalidated; no further access is possible
    #[error("repository session is no longer valid")]
    SessionInvalid,

    /// Malformed path
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),

    /// Write target already exists
    #[error("item already exists: {0}")]
    ItemExists(ItemPath),

    /// Parent of a write target does not exist
    #[error("parent node does not exist: {0}")]
    NoSuchParent(ItemPath),

    /// Write target does not exist
    #[error("no such item: {0}")]
    NoSuchItem(ItemPath),

    /// The root node cannot be removed or moved
    #[error("the root node cannot be modified this way")]
    RootImmutable,

    /// A node cannot be moved into its own subtree
    #[error("cannot move {from} below itself to {to}")]
    IllegalMove { from: ItemPath, to: ItemPath },

    /// Unknown listener registration
    #[error("no listener registered with id {0}")]
    ListenerNotFound(ListenerId),

    /// The observation delivery thread could not be started
    #[error("failed to start observation delivery: {0}")]
    DeliveryThread(#[source] std::io::Error),

    /// Fixture document could not be loaded
    #[error("fixture error: {0}")]
    Fixture(String),
}

impl RepoError {
    /// Check if the error is a session failure
    #[inline]
    #[must_use]
    pub fn is_session_failure(&self) -> bool {
        matches!(self, Self::SessionInvalid)
    }
}

/// Result type alias for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
