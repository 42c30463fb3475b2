//! Model type allow-list and variable bindings

use crate::error::ExprError;
use mlua::{AnyUserData, Lua, UserData};
use std::collections::BTreeSet;
use std::fmt;

/// A host type that may be exposed to expressions
pub trait ExpressionModel: UserData + Clone + Send + Sync + 'static {
    /// Name checked against the sandbox allow-list
    const TYPE_NAME: &'static str;
}

/// Allow-list of model types reachable from expressions
///
/// Everything not listed is denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sandbox {
    allowed: BTreeSet<String>,
}

impl Sandbox {
    /// Sandbox denying every model type
    #[must_use]
    pub fn deny_all() -> Self {
        Self {
            allowed: BTreeSet::new(),
        }
    }

    /// Allow `type_name` (builder form)
    #[must_use]
    pub fn allow(mut self, type_name: impl Into<String>) -> Self {
        self.allowed.insert(type_name.into());
        self
    }

    /// Whether `type_name` may be bound
    #[must_use]
    pub fn allows(&self, type_name: &str) -> bool {
        self.allowed.contains(type_name)
    }

    /// Allowed type names
    pub fn allowed(&self) -> impl Iterator<Item = &str> {
        self.allowed.iter().map(String::as_str)
    }

    pub(crate) fn check(&self, bindings: &Bindings) -> Result<(), ExprError> {
        match bindings.iter().find(|binding| !self.allows(binding.type_name)) {
            Some(binding) => Err(ExprError::SandboxViolation(format!(
                "type {} (bound as `{}`) is not allowed",
                binding.type_name, binding.name
            ))),
            None => Ok(()),
        }
    }
}

impl Default for Sandbox {
    /// Allows exactly the user model
    fn default() -> Self {
        Self::deny_all().allow(crate::user::UserModel::TYPE_NAME)
    }
}

type Factory = Box<dyn Fn(&Lua) -> mlua::Result<AnyUserData> + Send + Sync>;

pub(crate) struct Binding {
    pub(crate) name: String,
    pub(crate) type_name: &'static str,
    pub(crate) factory: Factory,
}

/// Named models visible to one evaluation
#[derive(Default)]
pub struct Bindings {
    entries: Vec<Binding>,
}

impl Bindings {
    /// No bindings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose `model` as the variable `name` (builder form)
    #[must_use]
    pub fn bind<M: ExpressionModel>(mut self, name: impl Into<String>, model: M) -> Self {
        self.entries.push(Binding {
            name: name.into(),
            type_name: M::TYPE_NAME,
            factory: Box::new(move |lua| lua.create_userdata(model.clone())),
        });
        self
    }

    /// Number of bindings
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is bound
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.entries.iter()
    }
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|b| (&b.name, b.type_name)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::InMemorySecurityService;
    use crate::user::UserModel;
    use std::sync::Arc;

    fn user() -> UserModel {
        UserModel::new("editor", Arc::new(InMemorySecurityService::new()))
    }

    #[test]
    fn default_allows_only_the_user_model() {
        let sandbox = Sandbox::default();
        assert!(sandbox.allows("UserModel"));
        assert!(!sandbox.allows("java.lang.Double"));
        assert_eq!(sandbox.allowed().collect::<Vec<_>>(), vec!["UserModel"]);
    }

    #[test]
    fn denied_binding_is_a_violation() {
        let bindings = Bindings::new().bind("user", user());
        assert!(Sandbox::default().check(&bindings).is_ok());
        assert!(matches!(
            Sandbox::deny_all().check(&bindings),
            Err(ExprError::SandboxViolation(_))
        ));
    }
}
