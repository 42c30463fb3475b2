//! Folio command line front end
//!
//! The `folio` binary loads content fixtures, plugin configurations and
//! user records from files and drives the Folio crates over them:
//!
//! - `folio eval` evaluates an expression for a user
//! - `folio lookup` prints the tree path between two nodes
//! - `folio config` prints a configuration with placeholders resolved
//! - `folio observe` applies scripted changes and prints the tree events
//!
//! Commands return their output as text; `main` only prints it.

#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod logging;
pub mod settings;

// Re-exports
pub use commands::{config, eval, lookup, observe, run, Operation};
pub use settings::FolioSettings;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
