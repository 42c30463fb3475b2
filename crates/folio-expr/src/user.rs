//! User model exposed to expressions as `user`
//!
//! ```lua
//! user.name == 'editor'
//! user:is_in_any_group('editors, admin')
//! ```

use crate::error::ExprError;
use crate::sandbox::ExpressionModel;
use crate::security::SecurityService;
use mlua::{UserData, UserDataFields, UserDataMethods};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// The current user as seen by expressions
#[derive(Clone)]
pub struct UserModel {
    name: String,
    security: Arc<dyn SecurityService>,
}

impl UserModel {
    /// Model for user `name`, answering membership questions via `security`
    #[must_use]
    pub fn new(name: impl Into<String>, security: Arc<dyn SecurityService>) -> Self {
        Self {
            name: name.into(),
            security,
        }
    }

    /// User identifier
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the user belongs to any of the listed groups
    ///
    /// Groups are separated by commas and/or whitespace.
    ///
    /// # Errors
    /// Returns [`ExprError::InvalidArgument`] for a blank list (without
    /// consulting the security service), [`ExprError::UnknownUser`] if the
    /// user is not known, or the security service's error
    pub fn is_in_any_group(&self, groups: &str) -> Result<bool, ExprError> {
        let wanted = parse_groups(groups);
        if wanted.is_empty() {
            return Err(ExprError::InvalidArgument(
                "group list must name at least one group".into(),
            ));
        }

        let record = self
            .security
            .find_user(&self.name)?
            .ok_or_else(|| ExprError::UnknownUser(self.name.clone()))?;
        Ok(wanted.iter().any(|group| record.is_member_of(group)))
    }
}

fn parse_groups(groups: &str) -> BTreeSet<&str> {
    groups
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|group| !group.is_empty())
        .collect()
}

impl UserData for UserModel {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("name", |_, this| Ok(this.name.clone()));
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("is_in_any_group", |_, this, groups: String| {
            this.is_in_any_group(&groups).map_err(mlua::Error::external)
        });
    }
}

impl ExpressionModel for UserModel {
    const TYPE_NAME: &'static str = "UserModel";
}

impl fmt::Debug for UserModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserModel")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
