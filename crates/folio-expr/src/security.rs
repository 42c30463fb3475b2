//! User and group membership lookups

use crate::error::SecurityError;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A user known to the security service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// User identifier
    pub id: String,
    /// Names of the groups the user belongs to
    #[serde(default)]
    pub groups: BTreeSet<String>,
}

impl UserRecord {
    /// Create a record with the given memberships
    #[must_use]
    pub fn new<I, S>(id: impl Into<String>, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            groups: groups.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the user belongs to `group`
    #[must_use]
    pub fn is_member_of(&self, group: &str) -> bool {
        self.groups.contains(group)
    }
}

/// Source of user records
#[cfg_attr(test, mockall::automock)]
pub trait SecurityService: Send + Sync {
    /// Look up a user by identifier
    ///
    /// # Errors
    /// Returns error if the backend cannot answer
    fn find_user(&self, user_id: &str) -> Result<Option<UserRecord>, SecurityError>;
}

/// Security service held in memory
#[derive(Debug, Default)]
pub struct InMemorySecurityService {
    users: DashMap<String, UserRecord>,
}

impl InMemorySecurityService {
    /// Create an empty service
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a service from records
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = UserRecord>) -> Self {
        let service = Self::new();
        for record in records {
            service.insert(record);
        }
        service
    }

    /// Add `record` (builder form)
    #[must_use]
    pub fn with_user(self, record: UserRecord) -> Self {
        self.insert(record);
        self
    }

    /// Add or replace a user
    pub fn insert(&self, record: UserRecord) -> Option<UserRecord> {
        self.users.insert(record.id.clone(), record)
    }

    /// Remove a user
    pub fn remove(&self, user_id: &str) -> Option<UserRecord> {
        self.users.remove(user_id).map(|(_, record)| record)
    }

    /// Number of known users
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether no users are known
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl SecurityService for InMemorySecurityService {
    fn find_user(&self, user_id: &str) -> Result<Option<UserRecord>, SecurityError> {
        Ok(self.users.get(user_id).map(|entry| entry.value().clone()))
    }
}
