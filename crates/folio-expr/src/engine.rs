//! Sandboxed expression engine
//!
//! Expressions are Lua expressions evaluated as `return <expression>` in a
//! fresh environment table holding only the bound models. No standard
//! library is loaded and no global is reachable. An instruction-count hook
//! and a memory limit bound every evaluation.

use crate::error::ExprError;
use crate::sandbox::{Bindings, Sandbox};
use crate::user::UserModel;
use crate::value::ExprValue;
use mlua::{HookTriggers, Lua, LuaOptions, StdLib, Value};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::fmt;

/// Default instruction budget per evaluation
pub const DEFAULT_INSTRUCTION_LIMIT: u32 = 100_000;

/// Default memory limit of the scripting state in bytes
pub const DEFAULT_MEMORY_LIMIT: usize = 8 * 1024 * 1024;

static INSTANCE: OnceCell<ExpressionEngine> = OnceCell::new();

/// Resource limits applied to evaluations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineLimits {
    /// Instructions allowed per evaluation
    pub instructions: u32,
    /// Memory the scripting state may hold, in bytes
    pub memory_bytes: usize,
}

impl EngineLimits {
    /// Set the instruction budget
    #[must_use]
    pub const fn with_instructions(mut self, instructions: u32) -> Self {
        self.instructions = instructions;
        self
    }

    /// Set the memory limit
    #[must_use]
    pub const fn with_memory_bytes(mut self, memory_bytes: usize) -> Self {
        self.memory_bytes = memory_bytes;
        self
    }
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTION_LIMIT,
            memory_bytes: DEFAULT_MEMORY_LIMIT,
        }
    }
}

/// Evaluates expressions against bound models
///
/// Evaluations are serialized on one scripting state.
pub struct ExpressionEngine {
    lua: Mutex<Lua>,
    sandbox: Sandbox,
    limits: EngineLimits,
}

impl ExpressionEngine {
    /// Create an engine with its own scripting state
    ///
    /// # Errors
    /// Returns [`ExprError::Runtime`] if the state cannot be created
    pub fn new(sandbox: Sandbox, limits: EngineLimits) -> Result<Self, ExprError> {
        let runtime = |e: mlua::Error| ExprError::Runtime(e.to_string());
        let lua = Lua::new_with(StdLib::NONE, LuaOptions::new()).map_err(runtime)?;
        lua.set_memory_limit(limits.memory_bytes).map_err(runtime)?;
        tracing::debug!(
            instructions = limits.instructions,
            memory_bytes = limits.memory_bytes,
            "expression engine created"
        );
        Ok(Self {
            lua: Mutex::new(lua),
            sandbox,
            limits,
        })
    }

    /// Shared engine with the default sandbox and limits
    ///
    /// Created on first use; a failed creation is retried by the next caller.
    ///
    /// # Errors
    /// Returns [`ExprError::Runtime`] if the engine cannot be created
    pub fn instance() -> Result<&'static Self, ExprError> {
        INSTANCE.get_or_try_init(|| Self::new(Sandbox::default(), EngineLimits::default()))
    }

    /// Sandbox of this engine
    #[inline]
    #[must_use]
    pub const fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Limits of this engine
    #[inline]
    #[must_use]
    pub const fn limits(&self) -> EngineLimits {
        self.limits
    }

    /// Evaluate `expression` with `user` bound as `user`
    ///
    /// # Errors
    /// Returns error if the expression does not parse, fails at runtime,
    /// exceeds a limit, or binds a model the sandbox denies
    pub fn evaluate(&self, expression: &str, user: &UserModel) -> Result<ExprValue, ExprError> {
        self.evaluate_with(expression, &Bindings::new().bind("user", user.clone()))
    }

    /// Evaluate `expression` as a condition
    ///
    /// Never fails: errors, `nil` and non-boolean results are logged and
    /// yield `default`.
    #[must_use]
    pub fn evaluate_boolean(&self, expression: &str, user: &UserModel, default: bool) -> bool {
        match self.evaluate(expression, user) {
            Ok(ExprValue::Bool(value)) => value,
            Ok(other) => {
                tracing::warn!(expression, result = %other, default, "expression is not boolean");
                default
            }
            Err(error) => {
                tracing::warn!(expression, %error, default, "expression evaluation failed");
                default
            }
        }
    }

    /// Evaluate `expression` with arbitrary bindings
    ///
    /// # Errors
    /// Same as [`ExpressionEngine::evaluate`]
    pub fn evaluate_with(
        &self,
        expression: &str,
        bindings: &Bindings,
    ) -> Result<ExprValue, ExprError> {
        if expression.trim().is_empty() {
            return Err(ExprError::Syntax("empty expression".into()));
        }
        self.sandbox.check(bindings)?;

        let lua = self.lua.lock();
        let lua_error = |e: mlua::Error| ExprError::from_lua(&e);

        let env = lua.create_table().map_err(lua_error)?;
        for binding in bindings.iter() {
            let model = (binding.factory)(&lua).map_err(lua_error)?;
            env.set(binding.name.as_str(), model).map_err(lua_error)?;
        }

        let chunk = lua
            .load(format!("return {expression}"))
            .set_name("=expression")
            .set_environment(env);

        let limit = self.limits.instructions;
        lua.set_hook(
            HookTriggers::new().every_nth_instruction(limit),
            move |_lua, _debug| {
                Err(mlua::Error::external(ExprError::ResourceLimit(format!(
                    "instruction limit of {limit} exceeded"
                ))))
            },
        );
        let result = chunk.eval::<Value>();
        lua.remove_hook();

        let value = result.map_err(lua_error)?;
        let value = ExprValue::from_lua(&value);
        tracing::trace!(expression, result = %value, "expression evaluated");
        Ok(value)
    }
}

impl fmt::Debug for ExpressionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionEngine")
            .field("sandbox", &self.sandbox)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::{InMemorySecurityService, MockSecurityService, UserRecord};
    use std::sync::Arc;

    fn engine() -> ExpressionEngine {
        ExpressionEngine::new(Sandbox::default(), EngineLimits::default()).unwrap()
    }

    fn editor() -> UserModel {
        let security = InMemorySecurityService::new()
            .with_user(UserRecord::new("editor", ["editors", "authors"]));
        UserModel::new("editor", Arc::new(security))
    }

    #[test]
    fn user_name_is_visible() {
        let engine = engine();
        assert_eq!(
            engine.evaluate("user.name == 'editor'", &editor()).unwrap(),
            ExprValue::Bool(true)
        );
        assert_eq!(
            engine.evaluate("user.name", &editor()).unwrap(),
            ExprValue::String("editor".into())
        );
    }

    #[test]
    fn group_membership() {
        let engine = engine();
        assert!(engine.evaluate_boolean(
            "user:is_in_any_group('admin, editors')",
            &editor(),
            false
        ));
        assert!(!engine.evaluate_boolean("user:is_in_any_group('admin')", &editor(), true));
    }

    #[test]
    fn blank_groups_fail_without_lookup() {
        let mut mock = MockSecurityService::new();
        mock.expect_find_user().times(0);
        let user = UserModel::new("editor", Arc::new(mock));

        let err = engine()
            .evaluate("user:is_in_any_group('  ')", &user)
            .unwrap_err();
        assert!(matches!(err, ExprError::InvalidArgument(_)), "{err}");
    }

    #[test]
    fn unknown_user_surfaces_from_expression() {
        let user = UserModel::new("ghost", Arc::new(InMemorySecurityService::new()));
        assert_eq!(
            engine().evaluate("user:is_in_any_group('editors')", &user),
            Err(ExprError::UnknownUser("ghost".into()))
        );
    }

    #[test]
    fn globals_are_unreachable() {
        let engine = engine();
        for name in ["os", "io", "string", "require", "load", "print", "_G"] {
            assert_eq!(
                engine.evaluate(&format!("{name} == nil"), &editor()).unwrap(),
                ExprValue::Bool(true),
                "{name} is reachable"
            );
        }
        assert!(matches!(
            engine.evaluate("os.exit(1)", &editor()),
            Err(ExprError::Evaluation(_))
        ));
    }

    #[test]
    fn host_type_construction_is_an_error() {
        let err = engine()
            .evaluate("new(\"java.lang.Double\", 10) == null", &editor())
            .unwrap_err();
        assert!(matches!(err, ExprError::Evaluation(_)), "{err}");
    }

    #[test]
    fn syntax_errors() {
        let engine = engine();
        assert!(matches!(
            engine.evaluate("user.name ==", &editor()),
            Err(ExprError::Syntax(_))
        ));
        assert!(matches!(
            engine.evaluate("1; os.exit()", &editor()),
            Err(ExprError::Syntax(_))
        ));
        assert!(matches!(engine.evaluate("   ", &editor()), Err(ExprError::Syntax(_))));
    }

    #[test]
    fn runaway_loops_hit_the_instruction_limit() {
        let engine = ExpressionEngine::new(
            Sandbox::default(),
            EngineLimits::default().with_instructions(1_000),
        )
        .unwrap();
        let err = engine
            .evaluate("(function() while true do end end)()", &editor())
            .unwrap_err();
        assert!(matches!(err, ExprError::ResourceLimit(_)), "{err}");

        // The engine stays usable afterwards.
        assert_eq!(engine.evaluate("1 + 1", &editor()).unwrap(), ExprValue::Integer(2));
    }

    #[test]
    fn denied_user_model_is_a_violation() {
        let engine = ExpressionEngine::new(Sandbox::deny_all(), EngineLimits::default()).unwrap();
        assert!(matches!(
            engine.evaluate("true", &editor()),
            Err(ExprError::SandboxViolation(_))
        ));
        assert!(!engine.evaluate_boolean("true", &editor(), false));
    }

    #[test]
    fn boolean_defaults() {
        let engine = engine();
        assert!(engine.evaluate_boolean("nil", &editor(), true));
        assert!(!engine.evaluate_boolean("'yes'", &editor(), false));
        assert!(engine.evaluate_boolean("(", &editor(), true));
        assert!(!engine.evaluate_boolean("1 == 2", &editor(), true));
    }

    #[test]
    fn value_kinds() {
        let engine = engine();
        assert_eq!(engine.evaluate("1 / 2", &editor()).unwrap(), ExprValue::Number(0.5));
        assert_eq!(engine.evaluate("nil", &editor()).unwrap(), ExprValue::Nil);
        assert_eq!(engine.evaluate("{}", &editor()).unwrap(), ExprValue::Other("table"));
        assert_eq!(engine.evaluate("user", &editor()).unwrap(), ExprValue::Other("userdata"));
    }

    #[test]
    fn shared_instance_is_reused() {
        let first = ExpressionEngine::instance().unwrap();
        let second = ExpressionEngine::instance().unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.sandbox(), &Sandbox::default());
    }
}
