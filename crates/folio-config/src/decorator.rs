//! Placeholder-resolving configuration views
//!
//! A [`DecoratedConfig`] wraps a base configuration and a fallback. A string
//! value that is exactly `${name}` reads as `fallback.get(name)`. Nested
//! mappings and lists are wrapped in further views sharing the fallback.
//! Nothing is cached: every read goes to the base and the fallback again.

use crate::value::{ConfigList, ConfigValue, PluginConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$\{([^}]+)\}$").expect("valid placeholder pattern"));

/// Name referenced by a whole-string `${name}` placeholder
#[must_use]
pub fn placeholder_name(value: &str) -> Option<&str> {
    PLACEHOLDER
        .captures(value)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str())
}

/// Resolve one value against `fallback`
///
/// A placeholder whose target is missing yields `None`. The fallback's
/// answer is returned as is, without further resolution.
#[must_use]
pub fn decorate(value: ConfigValue, fallback: &Arc<dyn PluginConfig>) -> Option<ConfigValue> {
    match value {
        ConfigValue::String(s) => match placeholder_name(&s) {
            Some(name) => {
                tracing::trace!(placeholder = name, "resolving from fallback");
                fallback.get(name)
            }
            None => Some(ConfigValue::String(s)),
        },
        ConfigValue::Config(config) => Some(ConfigValue::Config(Arc::new(DecoratedConfig::new(
            config,
            Arc::clone(fallback),
        )))),
        ConfigValue::List(list) => Some(ConfigValue::List(Arc::new(DecoratedList::new(
            list,
            Arc::clone(fallback),
        )))),
        other @ ConfigValue::Other(_) => Some(other),
    }
}

/// Configuration view resolving `${name}` placeholders from a fallback
#[derive(Debug, Clone)]
pub struct DecoratedConfig {
    base: Arc<dyn PluginConfig>,
    fallback: Arc<dyn PluginConfig>,
}

impl DecoratedConfig {
    /// Wrap `base`, resolving placeholders from `fallback`
    #[must_use]
    pub fn new(base: Arc<dyn PluginConfig>, fallback: Arc<dyn PluginConfig>) -> Self {
        Self { base, fallback }
    }

    /// Wrapped configuration
    #[inline]
    #[must_use]
    pub fn base(&self) -> &Arc<dyn PluginConfig> {
        &self.base
    }

    /// Placeholder source
    #[inline]
    #[must_use]
    pub fn fallback(&self) -> &Arc<dyn PluginConfig> {
        &self.fallback
    }
}

impl PluginConfig for DecoratedConfig {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        decorate(self.base.get(key)?, &self.fallback)
    }

    fn keys(&self) -> Vec<String> {
        self.base.keys()
    }
}

/// List view decorating each element on access
#[derive(Debug, Clone)]
pub struct DecoratedList {
    base: Arc<dyn ConfigList>,
    fallback: Arc<dyn PluginConfig>,
}

impl DecoratedList {
    /// Wrap `base`, resolving placeholders from `fallback`
    #[must_use]
    pub fn new(base: Arc<dyn ConfigList>, fallback: Arc<dyn PluginConfig>) -> Self {
        Self { base, fallback }
    }
}

impl ConfigList for DecoratedList {
    fn len(&self) -> usize {
        self.base.len()
    }

    /// `None` past the end, or for a placeholder whose target is missing
    fn get(&self, index: usize) -> Option<ConfigValue> {
        decorate(self.base.get(index)?, &self.fallback)
    }
}
