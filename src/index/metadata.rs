//! Index metadata as delivered by the control plane.

use super::version::Version;
use crate::settings::{Settings, flatten_value};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// Prefix of every index-namespaced setting.
pub const INDEX_SETTING_PREFIX: &str = "index.";
pub const SETTING_INDEX_UUID: &str = "index.uuid";
/// Value of [`SETTING_INDEX_UUID`] when the index has no uuid.
pub const INDEX_UUID_NA_VALUE: &str = "_na_";
pub const SETTING_VERSION_CREATED: &str = "index.version.created";
pub const SETTING_NUMBER_OF_SHARDS: &str = "index.number_of_shards";
pub const SETTING_NUMBER_OF_REPLICAS: &str = "index.number_of_replicas";
pub const SETTING_DATA_PATH: &str = "index.data_path";
pub const SETTING_SHADOW_REPLICAS: &str = "index.shadow_replicas";
pub const SETTING_SHARED_FILESYSTEM: &str = "index.shared_filesystem";

/// Name and index-level settings of one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMetadata {
    index: String,
    settings: Settings,
}

/// On-disk shape of a metadata file.
#[derive(Debug, Deserialize)]
struct MetadataFile {
    index: String,
    #[serde(default)]
    settings: Value,
}

impl IndexMetadata {
    pub fn new(index: impl Into<String>, settings: Settings) -> Self {
        Self {
            index: index.into(),
            settings,
        }
    }

    /// Parse a metadata document:
    ///
    /// ```yaml
    /// index: logs
    /// settings:
    ///   index:
    ///     uuid: abc
    ///     version.created: 2000099
    /// ```
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: MetadataFile = serde_yaml::from_str(content)?;
        Ok(Self::new(file.index, flatten_value(&file.settings)))
    }

    /// Load a metadata file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading index metadata {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("parsing index metadata {}", path.display()))
    }

    /// The index name.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Index-level settings only; node defaults are not included.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The index uuid, or [`INDEX_UUID_NA_VALUE`].
    pub fn uuid(&self) -> &str {
        uuid_of(&self.settings)
    }

    /// The creation version, if present and well-formed.
    pub fn version_created(&self) -> Option<Version> {
        version_created_of(&self.settings)
    }

    pub fn number_of_shards(&self) -> Option<u32> {
        self.settings.extract_opt(SETTING_NUMBER_OF_SHARDS)
    }
}

pub(crate) fn uuid_of(settings: &Settings) -> &str {
    settings.get_or(SETTING_INDEX_UUID, INDEX_UUID_NA_VALUE)
}

pub(crate) fn version_created_of(settings: &Settings) -> Option<Version> {
    settings.extract_opt(SETTING_VERSION_CREATED)
}
