//! Folio Expression Engine
//!
//! Evaluates small condition expressions (Lua syntax) against host models
//! inside a sandbox that exposes nothing but explicitly bound, allow-listed
//! model types.
//!
//! # Example
//!
//! ```rust
//! use folio_expr::{ExpressionEngine, InMemorySecurityService, UserModel, UserRecord};
//! use std::sync::Arc;
//!
//! let security = InMemorySecurityService::new()
//!     .with_user(UserRecord::new("editor", ["editors"]));
//! let user = UserModel::new("editor", Arc::new(security));
//!
//! let engine = ExpressionEngine::instance().unwrap();
//! assert!(engine.evaluate_boolean("user:is_in_any_group('editors')", &user, false));
//! ```

#![warn(missing_docs)]

mod engine;
mod error;
mod sandbox;
mod security;
mod user;
mod value;

// Re-exports
pub use engine::{EngineLimits, ExpressionEngine, DEFAULT_INSTRUCTION_LIMIT, DEFAULT_MEMORY_LIMIT};
pub use error::{ExprError, SecurityError};
pub use sandbox::{Bindings, ExpressionModel, Sandbox};
pub use security::{InMemorySecurityService, SecurityService, UserRecord};
pub use user::UserModel;
pub use value::ExprValue;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
