//! Error types for the model layer

use folio_repo::{ItemPath, RepoError};
use std::sync::Arc;

/// Errors starting or running an event subscription
#[derive(Debug, thiserror::Error)]
pub enum ObservationError {
    /// The adapter already holds a live subscription
    #[error("event listener adapter is already started")]
    AlreadyStarted,

    /// Registration with the repository failed
    #[error("repository error: {0}")]
    Repository(#[from] RepoError),
}

/// Model layer error
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Repository access failed
    #[error("repository error: {0}")]
    Repository(#[from] RepoError),

    /// Subscription could not be established
    #[error("observation error: {0}")]
    Observation(#[from] ObservationError),

    /// `start_observation` called on a tree model that is already observing
    #[error("tree model rooted at {0} is already observing")]
    AlreadyObserving(ItemPath),

    /// The root reference has no path to observe
    #[error("root node {0} cannot be resolved")]
    RootUnavailable(String),

    /// Loading a child listing into the cache failed
    #[error("failed to load children of {path}: {source}")]
    ChildrenLoad {
        path: ItemPath,
        #[source]
        source: Arc<RepoError>,
    },
}

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;
