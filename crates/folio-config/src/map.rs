//! Mutable in-memory configuration trees
//!
//! [`MapConfig`] and [`ListConfig`] back plugin configurations loaded from
//! JSON or YAML documents. Both are shared behind `Arc` and may be changed
//! while decorated views are in use.

use crate::error::{ConfigError, ConfigResult};
use crate::value::{ConfigList, ConfigValue, PluginConfig};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

/// Keyed configuration held in memory
#[derive(Debug, Default)]
pub struct MapConfig {
    entries: RwLock<IndexMap<String, ConfigValue>>,
}

impl MapConfig {
    /// Create an empty configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document whose root is an object
    ///
    /// # Errors
    /// Returns error if the document is malformed or not an object
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Parse a YAML document whose root is a mapping
    ///
    /// # Errors
    /// Returns error if the document is malformed or not a mapping
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        Self::from_value(serde_yaml::from_str(yaml)?)
    }

    /// Build from a JSON object
    ///
    /// Objects become nested [`MapConfig`]s and arrays [`ListConfig`]s.
    ///
    /// # Errors
    /// Returns [`ConfigError::NotAMapping`] if `value` is not an object
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        match value {
            Value::Object(object) => {
                let entries = object
                    .into_iter()
                    .map(|(key, value)| (key, convert(value)))
                    .collect();
                Ok(Self {
                    entries: RwLock::new(entries),
                })
            }
            other => Err(ConfigError::NotAMapping(kind_name(&other))),
        }
    }

    /// Store `value` under `key`, returning the previous value
    pub fn set(
        &self,
        key: impl Into<String>,
        value: impl Into<ConfigValue>,
    ) -> Option<ConfigValue> {
        self.entries.write().insert(key.into(), value.into())
    }

    /// Store a nested configuration under `key`
    pub fn set_config(&self, key: impl Into<String>, config: Arc<dyn PluginConfig>) {
        self.entries
            .write()
            .insert(key.into(), ConfigValue::Config(config));
    }

    /// Store a list under `key`
    pub fn set_list(&self, key: impl Into<String>, list: Arc<dyn ConfigList>) {
        self.entries.write().insert(key.into(), ConfigValue::List(list));
    }

    /// Remove `key`, keeping the order of the remaining keys
    pub fn remove(&self, key: &str) -> Option<ConfigValue> {
        self.entries.write().shift_remove(key)
    }

    /// Number of keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether there are no keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl PluginConfig for MapConfig {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.entries.read().get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }
}

/// Ordered configuration list held in memory
#[derive(Debug, Default)]
pub struct ListConfig {
    items: RwLock<Vec<ConfigValue>>,
}

impl ListConfig {
    /// Create an empty list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a list from values
    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = ConfigValue>) -> Self {
        Self {
            items: RwLock::new(values.into_iter().collect()),
        }
    }

    /// Append a value
    pub fn push(&self, value: impl Into<ConfigValue>) {
        self.items.write().push(value.into());
    }

    /// Replace the value at `index`; returns false if out of range
    pub fn set(&self, index: usize, value: impl Into<ConfigValue>) -> bool {
        match self.items.write().get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    /// Remove the value at `index`
    pub fn remove(&self, index: usize) -> Option<ConfigValue> {
        let mut items = self.items.write();
        (index < items.len()).then(|| items.remove(index))
    }
}

impl ConfigList for ListConfig {
    fn len(&self) -> usize {
        self.items.read().len()
    }

    fn get(&self, index: usize) -> Option<ConfigValue> {
        self.items.read().get(index).cloned()
    }
}

fn convert(value: Value) -> ConfigValue {
    match value {
        Value::String(s) => ConfigValue::String(s),
        Value::Object(object) => {
            let entries = object
                .into_iter()
                .map(|(key, value)| (key, convert(value)))
                .collect();
            ConfigValue::Config(Arc::new(MapConfig {
                entries: RwLock::new(entries),
            }))
        }
        Value::Array(items) => {
            ConfigValue::List(Arc::new(ListConfig::from_values(items.into_iter().map(convert))))
        }
        other => ConfigValue::Other(other),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

impl From<Value> for ConfigValue {
    fn from(value: Value) -> Self {
        convert(value)
    }
}
