//! Folio Plugin Configuration
//!
//! Plugin configuration trees and the placeholder decorator that lets a
//! plugin configuration defer values to a shared fallback.
//!
//! # Example
//!
//! ```rust
//! use folio_config::{DecoratedConfig, MapConfig, PluginConfig};
//! use std::sync::Arc;
//!
//! let base = Arc::new(MapConfig::from_yaml("title: \"${site.title}\"\nsize: 10").unwrap());
//! let fallback = Arc::new(MapConfig::from_yaml("site.title: Folio").unwrap());
//!
//! let config = DecoratedConfig::new(base, fallback);
//! assert_eq!(config.get_string("title").as_deref(), Some("Folio"));
//! assert_eq!(config.get_i64("size"), Some(10));
//! ```

#![warn(missing_docs)]

mod decorator;
mod error;
mod map;
mod value;

// Re-exports
pub use decorator::{decorate, placeholder_name, DecoratedConfig, DecoratedList};
pub use error::{ConfigError, ConfigResult};
pub use map::{ListConfig, MapConfig};
pub use value::{config_to_json, ConfigList, ConfigValue, ListIter, PluginConfig};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
