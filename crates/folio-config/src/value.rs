//! Configuration values and the read contracts of configuration trees

use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;

/// A value stored under a configuration key
#[derive(Debug, Clone)]
pub enum ConfigValue {
    /// Plain string; may be a `${name}` placeholder
    String(String),
    /// Nested configuration mapping
    Config(Arc<dyn PluginConfig>),
    /// Ordered list of values
    List(Arc<dyn ConfigList>),
    /// Any other scalar (numbers, booleans, null)
    Other(Value),
}

impl ConfigValue {
    /// String content, if this is a string
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean content; strings `"true"`/`"false"` are accepted
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Other(Value::Bool(b)) => Some(*b),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Integer content; numeric strings are accepted
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Other(value) => value.as_i64(),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Nested configuration, if this is one
    #[must_use]
    pub fn as_config(&self) -> Option<&Arc<dyn PluginConfig>> {
        match self {
            Self::Config(config) => Some(config),
            _ => None,
        }
    }

    /// List, if this is one
    #[must_use]
    pub fn as_list(&self) -> Option<&Arc<dyn ConfigList>> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    /// Materialize into JSON, reading nested values through their views
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Config(config) => config_to_json(config.as_ref()),
            Self::List(list) => Value::Array(
                (0..list.len())
                    .map(|i| list.get(i).map_or(Value::Null, |v| v.to_json()))
                    .collect(),
            ),
            Self::Other(value) => value.clone(),
        }
    }
}

/// Materialize a configuration view into a JSON object
#[must_use]
pub fn config_to_json(config: &dyn PluginConfig) -> Value {
    Value::Object(
        config
            .keys()
            .into_iter()
            .filter_map(|key| config.get(&key).map(|value| (key, value.to_json())))
            .collect(),
    )
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        Self::Other(Value::Bool(b))
    }
}

impl From<i64> for ConfigValue {
    fn from(n: i64) -> Self {
        Self::Other(Value::from(n))
    }
}

/// Keyed configuration node
///
/// Implementations must be cheap to read repeatedly; decorators never cache.
pub trait PluginConfig: Send + Sync + Debug {
    /// Value stored under `key`
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// Keys in document order
    fn keys(&self) -> Vec<String>;

    /// Whether `key` yields a value
    fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// String stored under `key`
    fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean stored under `key`
    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key)?.as_bool()
    }

    /// Integer stored under `key`
    fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key)?.as_i64()
    }

    /// Nested configuration stored under `key`
    fn get_config(&self, key: &str) -> Option<Arc<dyn PluginConfig>> {
        match self.get(key)? {
            ConfigValue::Config(config) => Some(config),
            _ => None,
        }
    }

    /// List stored under `key`
    fn get_list(&self, key: &str) -> Option<Arc<dyn ConfigList>> {
        match self.get(key)? {
            ConfigValue::List(list) => Some(list),
            _ => None,
        }
    }

    /// String elements of the list stored under `key`
    ///
    /// Non-string elements are skipped; a single string yields one element.
    fn get_strings(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(ConfigValue::String(s)) => vec![s],
            Some(ConfigValue::List(list)) => list
                .iter()
                .filter_map(|value| value.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Ordered list of configuration values
pub trait ConfigList: Send + Sync + Debug {
    /// Number of elements
    fn len(&self) -> usize;

    /// Element at `index`
    fn get(&self, index: usize) -> Option<ConfigValue>;

    /// Whether the list has no elements
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'d> dyn ConfigList + 'd {
    /// Iterate elements by index, reading each on demand
    ///
    /// Elements that read as `None` are skipped.
    #[must_use]
    pub fn iter(&self) -> ListIter<'_> {
        ListIter {
            list: self,
            index: 0,
        }
    }
}

/// Iterator over a [`ConfigList`]
#[derive(Debug)]
pub struct ListIter<'a> {
    list: &'a dyn ConfigList,
    index: usize,
}

impl Iterator for ListIter<'_> {
    type Item = ConfigValue;

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.list.len() {
            let index = self.index;
            self.index += 1;
            if let Some(value) = self.list.get(index) {
                return Some(value);
            }
        }
        None
    }
}

impl<'a> IntoIterator for &'a (dyn ConfigList + 'a) {
    type Item = ConfigValue;
    type IntoIter = ListIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
