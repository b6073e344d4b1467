//! Loading settings from YAML/JSON files.
//!
//! Files are parsed into a JSON value tree and flattened into dotted keys, so
//! these two documents produce the same settings:
//!
//! ```yaml
//! index:
//!   refresh_interval: 1s
//! ---
//! index.refresh_interval: 1s
//! ```

use super::Settings;
use super::merge::merge_all;
use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming an explicit node settings file.
pub const NODE_CONFIG_ENV: &str = "INDEX_SETTINGS_NODE_CONFIG";

/// Locations consulted for node-level settings, highest priority first.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// Explicit file (command line)
    pub explicit: Option<PathBuf>,
    /// File named by `INDEX_SETTINGS_NODE_CONFIG`
    pub env: Option<PathBuf>,
    /// `~/.index-settings/node.yaml`
    pub user: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover node config paths from the environment and home directory.
    pub fn discover(explicit: Option<PathBuf>) -> Self {
        Self {
            explicit,
            env: std::env::var(NODE_CONFIG_ENV).ok().map(PathBuf::from),
            user: dirs::home_dir().map(|h| h.join(".index-settings").join("node.yaml")),
        }
    }

    /// The node settings file to use, if any.
    ///
    /// An explicit or environment path is returned even if it does not exist
    /// so that loading reports the missing file; the home directory file is
    /// only used when present.
    pub fn node_config(&self) -> Option<&Path> {
        if let Some(ref path) = self.explicit {
            return Some(path);
        }
        if let Some(ref path) = self.env {
            return Some(path);
        }
        self.user.as_deref().filter(|p| p.exists())
    }

    /// Load node settings from the resolved file, or empty settings.
    pub fn load_node_settings(&self) -> Result<Settings> {
        match self.node_config() {
            Some(path) => load_settings_file(path),
            None => {
                debug!("No node settings file found, using empty node settings");
                Ok(Settings::empty())
            }
        }
    }
}

/// Load a settings file (YAML or JSON).
pub fn load_settings_file(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading settings file {}", path.display()))?;
    settings_from_yaml_str(&content)
        .with_context(|| format!("parsing settings file {}", path.display()))
}

/// Load several settings files and merge them, later files winning.
pub fn load_layered(paths: &[PathBuf]) -> Result<Settings> {
    let layers = paths
        .iter()
        .map(|p| load_settings_file(p))
        .collect::<Result<Vec<_>>>()?;
    Ok(merge_all(&layers))
}

/// Parse YAML (or JSON) text into flattened settings.
pub fn settings_from_yaml_str(content: &str) -> Result<Settings> {
    let value: Value = serde_yaml::from_str(content)?;
    match value {
        Value::Null | Value::Object(_) => Ok(flatten_value(&value)),
        other => bail!("settings document must be a mapping, got {}", kind(&other)),
    }
}

/// Flatten a JSON value tree into dotted keys.
///
/// Objects join keys with `.`, arrays use the element index as the key
/// segment, scalars are rendered as strings and nulls are skipped.
pub fn flatten_value(value: &Value) -> Settings {
    let mut out = BTreeMap::new();
    flatten_into(&mut out, None, value);
    Settings::from(out)
}

fn flatten_into(out: &mut BTreeMap<String, String>, prefix: Option<&str>, value: &Value) {
    let join = |segment: &str| match prefix {
        Some(p) => format!("{p}.{segment}"),
        None => segment.to_string(),
    };
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(out, Some(&join(key)), child);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                flatten_into(out, Some(&join(&i.to_string())), child);
            }
        }
        Value::String(s) => insert(out, prefix, s.clone()),
        Value::Bool(b) => insert(out, prefix, b.to_string()),
        Value::Number(n) => insert(out, prefix, n.to_string()),
    }
}

fn insert(out: &mut BTreeMap<String, String>, key: Option<&str>, value: String) {
    match key {
        Some(key) => {
            if let Some(previous) = out.insert(key.to_string(), value) {
                warn!(key, previous = %previous, "Duplicate settings key after flattening, last value wins");
            }
        }
        None => warn!(value = %value, "Ignoring scalar settings value without a key"),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_flatten_nested_objects() {
        let value = json!({
            "index": {
                "refresh_interval": "1s",
                "version": {"created": 2000099},
                "merge": {"scheduler": {"auto_throttle": false}}
            },
            "name": "node-1"
        });
        let settings = flatten_value(&value);
        assert_eq!(settings.get("index.refresh_interval"), Some("1s"));
        assert_eq!(settings.get("index.version.created"), Some("2000099"));
        assert_eq!(settings.get("index.merge.scheduler.auto_throttle"), Some("false"));
        assert_eq!(settings.get("name"), Some("node-1"));
    }

    #[test]
    fn test_flatten_arrays_and_nulls() {
        let value = json!({"path": {"data": ["/a", "/b"]}, "unset": null});
        let settings = flatten_value(&value);
        assert_eq!(settings.get("path.data.0"), Some("/a"));
        assert_eq!(settings.get("path.data.1"), Some("/b"));
        assert!(!settings.contains_key("unset"));
    }

    #[test]
    fn test_dotted_and_nested_keys_are_equivalent() {
        let nested = settings_from_yaml_str("index:\n  gc_deletes: 30s\n").unwrap();
        let dotted = settings_from_yaml_str("index.gc_deletes: 30s\n").unwrap();
        assert_eq!(nested, dotted);
    }

    #[test]
    fn test_empty_document_is_empty_settings() {
        assert!(settings_from_yaml_str("").unwrap().is_empty());
    }

    #[test]
    fn test_scalar_document_is_rejected() {
        assert!(settings_from_yaml_str("just a string").is_err());
        assert!(settings_from_yaml_str("- a\n- b\n").is_err());
    }

    #[test]
    fn test_load_layered_later_file_wins() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("base.yaml");
        let over = temp.path().join("override.yaml");
        std::fs::write(&base, "index:\n  refresh_interval: 10s\n  gc_deletes: 30s\n").unwrap();
        std::fs::write(&over, "index.refresh_interval: 2s\n").unwrap();

        let settings = load_layered(&[base, over]).unwrap();
        assert_eq!(settings.get("index.refresh_interval"), Some("2s"));
        assert_eq!(settings.get("index.gc_deletes"), Some("30s"));
    }

    #[test]
    fn test_explicit_path_takes_priority() {
        let temp = TempDir::new().unwrap();
        let explicit = temp.path().join("node.yaml");
        std::fs::write(&explicit, "name: node-7\n").unwrap();

        let paths = ConfigPaths {
            explicit: Some(explicit.clone()),
            env: Some(temp.path().join("env.yaml")),
            user: None,
        };
        assert_eq!(paths.node_config(), Some(explicit.as_path()));
        let settings = paths.load_node_settings().unwrap();
        assert_eq!(settings.get("name"), Some("node-7"));
    }

    #[test]
    fn test_missing_user_file_yields_empty_settings() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths {
            explicit: None,
            env: None,
            user: Some(temp.path().join("nope.yaml")),
        };
        assert!(paths.node_config().is_none());
        assert!(paths.load_node_settings().unwrap().is_empty());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths {
            explicit: Some(temp.path().join("missing.yaml")),
            env: None,
            user: None,
        };
        assert!(paths.load_node_settings().is_err());
    }
}
