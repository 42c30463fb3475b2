//! Child listing cache for tree widgets
//!
//! Listings are keyed by parent path and loaded on miss. The tree model
//! invalidates entries as it processes structural events.

use folio_repo::{ItemPath, NodeHandle, RepoError};
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Default number of cached listings
pub const DEFAULT_CAPACITY: u64 = 10_000;

/// Parent path to ordered child handles
#[derive(Clone)]
pub struct ChildrenCache {
    inner: Cache<ItemPath, Arc<Vec<NodeHandle>>>,
}

impl ChildrenCache {
    /// Create a cache holding at most `max_capacity` listings
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    /// Create a cache whose entries also expire after `ttl`
    #[must_use]
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Cached listing of `parent`, loading it on miss
    ///
    /// Concurrent misses for the same parent run `load` once.
    ///
    /// # Errors
    /// Returns the loader's error; failures are not cached
    pub fn get_or_load<F>(
        &self,
        parent: &ItemPath,
        load: F,
    ) -> Result<Arc<Vec<NodeHandle>>, Arc<RepoError>>
    where
        F: FnOnce() -> Result<Vec<NodeHandle>, RepoError>,
    {
        self.inner.try_get_with(parent.clone(), || {
            tracing::trace!(%parent, "loading children");
            load().map(Arc::new)
        })
    }

    /// Cached listing of `parent`, if present
    #[must_use]
    pub fn get(&self, parent: &ItemPath) -> Option<Arc<Vec<NodeHandle>>> {
        self.inner.get(parent)
    }

    /// Whether a listing for `parent` is cached
    #[must_use]
    pub fn contains(&self, parent: &ItemPath) -> bool {
        self.inner.contains_key(parent)
    }

    /// Drop the listing of `parent`
    pub fn invalidate(&self, parent: &ItemPath) {
        self.inner.invalidate(parent);
    }

    /// Drop every listing
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

impl Default for ChildrenCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for ChildrenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildrenCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}
