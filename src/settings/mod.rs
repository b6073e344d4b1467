//! Flat, string-valued settings maps.
//!
//! Settings are dotted keys mapped to raw strings (`index.refresh_interval =
//! "1s"`). Typed views are derived on demand through [`Settings::extract`],
//! which never fails: malformed values fall back and are logged.
//!
//! ## Layers
//! - **Node** - process-wide defaults shared by every index on the node
//! - **Index** - per-index overrides carried in the index metadata
//!
//! The two are combined with [`merge`], index keys winning.

mod extract;
pub mod loader;
mod merge;
mod units;

pub use extract::{SettingEnum, SettingValue};
pub use loader::{ConfigPaths, flatten_value, load_settings_file, settings_from_yaml_str};
pub use merge::{merge, merge_all};
pub use units::{ByteSizeValue, TimeValue};

use serde::Serialize;
use std::collections::BTreeMap;

/// An immutable key → string settings map.
///
/// Cloned and swapped wholesale; never edited in place once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Settings {
    map: BTreeMap<String, String>,
}

impl Settings {
    /// An empty settings map.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Raw string value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    /// Raw string value for `key`, or `default` when unset.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.map
    }

    /// The subset of keys starting with `prefix`. Keys keep their full name.
    pub fn get_by_prefix(&self, prefix: &str) -> Settings {
        self.map
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            map: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<BTreeMap<String, String>> for Settings {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self { map }
    }
}

/// Builder for [`Settings`]; later puts overwrite earlier ones.
#[derive(Debug, Clone, Default)]
pub struct SettingsBuilder {
    map: BTreeMap<String, String>,
}

impl SettingsBuilder {
    pub fn put(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.map.insert(key.into(), value.to_string());
        self
    }

    /// Copies every entry of `settings`, overwriting existing keys.
    pub fn put_settings(mut self, settings: &Settings) -> Self {
        self.map
            .extend(settings.map.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn remove(mut self, key: &str) -> Self {
        self.map.remove(key);
        self
    }

    pub fn build(self) -> Settings {
        Settings { map: self.map }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_later_put_wins() {
        let settings = Settings::builder()
            .put("index.refresh_interval", "1s")
            .put("index.refresh_interval", "5s")
            .put("index.number_of_shards", 3)
            .build();
        assert_eq!(settings.get("index.refresh_interval"), Some("5s"));
        assert_eq!(settings.get("index.number_of_shards"), Some("3"));
        assert_eq!(settings.len(), 2);
    }

    #[test]
    fn test_get_by_prefix_keeps_full_keys() {
        let settings: Settings = [
            ("index.refresh_interval", "1s"),
            ("index.uuid", "abc"),
            ("indices.query.query_string.analyze_wildcard", "true"),
            ("name", "node-1"),
        ]
        .into_iter()
        .collect();

        let index = settings.get_by_prefix("index.");
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("index.uuid"), Some("abc"));
        assert!(!index.contains_key("indices.query.query_string.analyze_wildcard"));
        assert!(!index.contains_key("name"));
    }

    #[test]
    fn test_get_or_default() {
        let settings = Settings::empty();
        assert_eq!(settings.get_or("index.uuid", "_na_"), "_na_");
        assert!(settings.is_empty());
    }

    #[test]
    fn test_serializes_as_flat_map() {
        let settings = Settings::builder().put("index.gc_deletes", "60s").build();
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json, serde_json::json!({"index.gc_deletes": "60s"}));
    }
}
