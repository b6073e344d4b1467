//! The live settings of one index.
//!
//! [`IndexSettings`] merges node-level and index-level settings, exposes the
//! merged view to every component of the index, and applies updates from the
//! control plane.
//!
//! ## Update protocol
//! ```text
//! apply_update(metadata)                 [update lock held throughout]
//!     → validate identity                (mismatch: Err, nothing changed)
//!     → merge node + index settings
//!     → compare index.* keys             (equal: Ok(false), nothing swapped)
//!     → swap the merged settings         (readers see old or new, never both)
//!     → notify listeners in order        (failures logged, not propagated)
//!     → re-derive live values            (malformed: keep previous value)
//!     → Ok(true)
//! ```
//!
//! ## Readers
//! Readers never take the update lock. The merged settings map is swapped as
//! one `Arc`, so a reader always sees a complete map. Derived live values
//! (durability, refresh interval, ...) are independent atomics: a reader that
//! fetches two of them while an update is in flight may see one old and one
//! new value.

use super::listeners::{SettingsListener, UpdateListeners};
use super::matcher::{IndexNameMatcher, default_matcher};
use super::merge_policy::{MergePolicy, MergePolicyConfig};
use super::merge_scheduler::{MergeSchedulerConfig, MergeSchedulerSnapshot};
use super::metadata::{
    INDEX_SETTING_PREFIX, IndexMetadata, SETTING_DATA_PATH, SETTING_NUMBER_OF_REPLICAS,
    SETTING_NUMBER_OF_SHARDS, SETTING_SHADOW_REPLICAS, SETTING_SHARED_FILESYSTEM,
    SETTING_VERSION_CREATED, uuid_of, version_created_of,
};
use super::translog::Durability;
use super::validate::{IndexIdentity, validate_identity};
use super::version::Version;
use crate::error::{IndexSettingsError, SettingsResult};
use crate::settings::{ByteSizeValue, Settings, TimeValue, merge};
use arc_swap::ArcSwap;
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{Span, debug, info, info_span};

pub const DEFAULT_FIELD: &str = "index.query.default_field";
pub const QUERY_STRING_LENIENT: &str = "index.query_string.lenient";
pub const QUERY_STRING_ANALYZE_WILDCARD: &str = "indices.query.query_string.analyze_wildcard";
pub const QUERY_STRING_ALLOW_LEADING_WILDCARD: &str =
    "indices.query.query_string.allowLeadingWildcard";
pub const ALLOW_UNMAPPED: &str = "index.query.parse.allow_unmapped_fields";
pub const INDEX_TRANSLOG_SYNC_INTERVAL: &str = "index.translog.sync_interval";
pub const INDEX_TRANSLOG_DURABILITY: &str = "index.translog.durability";
pub const INDEX_REFRESH_INTERVAL: &str = "index.refresh_interval";
pub const INDEX_TRANSLOG_FLUSH_THRESHOLD_SIZE: &str = "index.translog.flush_threshold_size";
/// Whether a flush is executed before the engine is closed.
pub const INDEX_FLUSH_ON_CLOSE: &str = "index.flush_on_close";
/// How long delete tombstones are kept. Updatable at runtime.
pub const INDEX_GC_DELETES_SETTING: &str = "index.gc_deletes";
/// Node-level setting holding the node's name.
pub const NODE_NAME: &str = "name";

/// The catch-all field searched when a query names no field.
pub const ALL_FIELD_NAME: &str = "_all";
pub const DEFAULT_TRANSLOG_SYNC_INTERVAL: TimeValue = TimeValue::from_secs(5);
pub const DEFAULT_REFRESH_INTERVAL: TimeValue = TimeValue::from_secs(1);
pub const DEFAULT_FLUSH_THRESHOLD_SIZE: ByteSizeValue = ByteSizeValue::from_mb(512);
pub const DEFAULT_GC_DELETES: TimeValue = TimeValue::from_secs(60);

/// Per-index settings shared by every component of an open index.
///
/// Create one per index when it is opened; wrap it in an `Arc` to share it.
pub struct IndexSettings {
    index: String,
    identity: IndexIdentity,
    node_name: String,
    node_settings: Settings,
    listeners: UpdateListeners,
    name_matcher: IndexNameMatcher,
    span: Span,

    // Swapped under `update_lock`, read lock-free.
    settings: ArcSwap<Settings>,
    metadata: ArcSwap<IndexMetadata>,
    update_lock: Mutex<()>,

    // Fixed when the index is opened.
    default_field: String,
    query_string_lenient: bool,
    query_string_analyze_wildcard: bool,
    query_string_allow_leading_wildcard: bool,
    default_allow_unmapped_fields: bool,
    sync_interval: TimeValue,
    flush_on_close: bool,
    shadow_replica_index: bool,

    // Re-derived after every accepted update.
    durability: AtomicU8,
    refresh_interval: AtomicI64,
    flush_threshold_size: AtomicU64,
    gc_deletes: AtomicI64,
    merge_scheduler_config: Arc<MergeSchedulerConfig>,
    merge_policy_config: Arc<MergePolicyConfig>,
}

impl IndexSettings {
    /// Create the settings for an index. Index-level settings in `metadata`
    /// override `node_settings`. Names are matched with `*` wildcards against
    /// the index name.
    pub fn new(
        metadata: IndexMetadata,
        node_settings: Settings,
        listeners: impl IntoIterator<Item = SettingsListener>,
    ) -> SettingsResult<Self> {
        let matcher = default_matcher(metadata.index());
        Self::build(metadata, node_settings, UpdateListeners::new(listeners), matcher)
    }

    /// Like [`IndexSettings::new`] with a caller-supplied name matcher, e.g.
    /// one that also resolves aliases.
    pub fn with_name_matcher(
        metadata: IndexMetadata,
        node_settings: Settings,
        listeners: impl IntoIterator<Item = SettingsListener>,
        name_matcher: IndexNameMatcher,
    ) -> SettingsResult<Self> {
        Self::build(metadata, node_settings, UpdateListeners::new(listeners), name_matcher)
    }

    fn build(
        metadata: IndexMetadata,
        node_settings: Settings,
        listeners: UpdateListeners,
        name_matcher: IndexNameMatcher,
    ) -> SettingsResult<Self> {
        let index = metadata.index().to_string();
        let span = info_span!("index", index = %index);
        let _entered = span.enter();

        let settings = merge(&node_settings, metadata.settings());
        let version_created =
            version_created_of(&settings).ok_or_else(|| IndexSettingsError::MissingSetting {
                key: SETTING_VERSION_CREATED.to_string(),
            })?;
        let identity = IndexIdentity {
            uuid: uuid_of(&settings).to_string(),
            version_created,
            number_of_shards: settings.extract_opt(SETTING_NUMBER_OF_SHARDS),
        };
        debug_assert!(
            name_matcher(&index),
            "index name matcher does not match the index's own name [{index}]"
        );

        let durability = settings.extract(INDEX_TRANSLOG_DURABILITY, Durability::Request);
        let refresh_interval = settings.get_as_time(INDEX_REFRESH_INTERVAL, DEFAULT_REFRESH_INTERVAL);
        let flush_threshold_size = settings
            .get_as_bytes_size(INDEX_TRANSLOG_FLUSH_THRESHOLD_SIZE, DEFAULT_FLUSH_THRESHOLD_SIZE);
        let gc_deletes = settings.get_as_time(INDEX_GC_DELETES_SETTING, DEFAULT_GC_DELETES);

        let index_settings = Self {
            node_name: node_settings.get_or(NODE_NAME, "").to_string(),
            default_field: settings.get_or(DEFAULT_FIELD, ALL_FIELD_NAME).to_string(),
            query_string_lenient: settings.get_as_bool(QUERY_STRING_LENIENT, false),
            query_string_analyze_wildcard: settings.get_as_bool(QUERY_STRING_ANALYZE_WILDCARD, false),
            query_string_allow_leading_wildcard: settings
                .get_as_bool(QUERY_STRING_ALLOW_LEADING_WILDCARD, true),
            default_allow_unmapped_fields: settings.get_as_bool(ALLOW_UNMAPPED, true),
            sync_interval: settings
                .get_as_time(INDEX_TRANSLOG_SYNC_INTERVAL, DEFAULT_TRANSLOG_SYNC_INTERVAL),
            flush_on_close: settings.get_as_bool(INDEX_FLUSH_ON_CLOSE, true),
            shadow_replica_index: settings.get_as_bool(SETTING_SHADOW_REPLICAS, false),
            durability: AtomicU8::new(durability.to_u8()),
            refresh_interval: AtomicI64::new(refresh_interval.nanos()),
            flush_threshold_size: AtomicU64::new(flush_threshold_size.bytes()),
            gc_deletes: AtomicI64::new(gc_deletes.nanos()),
            merge_scheduler_config: Arc::new(MergeSchedulerConfig::new(&settings)),
            merge_policy_config: Arc::new(MergePolicyConfig::new(&settings)),
            settings: ArcSwap::from_pointee(settings),
            metadata: ArcSwap::from_pointee(metadata),
            update_lock: Mutex::new(()),
            identity,
            node_settings,
            listeners,
            name_matcher,
            index,
            span: span.clone(),
        };
        debug!(
            uuid = %index_settings.identity.uuid,
            version = %index_settings.identity.version_created,
            listeners = index_settings.listeners.len(),
            "index settings created"
        );
        Ok(index_settings)
    }

    /// A new instance over the same metadata and node settings with `extra`
    /// listeners called before the existing ones. This instance is unchanged.
    pub fn new_with_listeners(
        &self,
        extra: impl IntoIterator<Item = SettingsListener>,
    ) -> SettingsResult<Self> {
        Self::build(
            (*self.index_metadata()).clone(),
            self.node_settings.clone(),
            self.listeners.with_prepended(extra),
            Arc::clone(&self.name_matcher),
        )
    }

    /// Apply new index metadata from the control plane.
    ///
    /// Returns `Ok(true)` if any `index.*` setting changed and the update was
    /// applied, `Ok(false)` if the settings were identical. Fails only when
    /// the creation version or uuid differ from this index's, in which case
    /// nothing is changed.
    ///
    /// Updates are serialized; listeners run while the update lock is held,
    /// so they must be quick.
    pub fn apply_update(&self, metadata: IndexMetadata) -> SettingsResult<bool> {
        // A poisoned lock means a previous update panicked; every write below
        // is a whole-value store, so there is nothing half-written to repair.
        let _guard = self
            .update_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let _entered = self.span.enter();

        validate_identity(&self.identity, metadata.settings())?;

        let candidate = merge(&self.node_settings, metadata.settings());
        self.metadata.store(Arc::new(metadata));

        let unchanged = self.settings.load().get_by_prefix(INDEX_SETTING_PREFIX)
            == candidate.get_by_prefix(INDEX_SETTING_PREFIX);
        if unchanged {
            debug!("settings update is a no-op");
            return Ok(false);
        }

        let candidate = Arc::new(candidate);
        self.settings.store(Arc::clone(&candidate));

        let failed = self.listeners.notify_all(&candidate);
        self.refresh_live_settings(&candidate);

        info!(listeners = self.listeners.len(), failed, "index settings updated");
        Ok(true)
    }

    /// Re-derive every live value, each falling back to its current value.
    fn refresh_live_settings(&self, settings: &Settings) {
        let current = self.translog_durability();
        let durability = settings.extract(INDEX_TRANSLOG_DURABILITY, current);
        if durability != current {
            info!(key = INDEX_TRANSLOG_DURABILITY, from = %current, to = %durability, "updating setting");
            self.durability.store(durability.to_u8(), Ordering::Relaxed);
        }

        let current = self.refresh_interval();
        let refresh_interval = settings.get_as_time(INDEX_REFRESH_INTERVAL, current);
        if refresh_interval != current {
            info!(key = INDEX_REFRESH_INTERVAL, from = %current, to = %refresh_interval, "updating setting");
            self.refresh_interval
                .store(refresh_interval.nanos(), Ordering::Relaxed);
        }

        let current = self.flush_threshold_size();
        let flush_threshold_size =
            settings.get_as_bytes_size(INDEX_TRANSLOG_FLUSH_THRESHOLD_SIZE, current);
        if flush_threshold_size != current {
            info!(key = INDEX_TRANSLOG_FLUSH_THRESHOLD_SIZE, from = %current, to = %flush_threshold_size, "updating setting");
            self.flush_threshold_size
                .store(flush_threshold_size.bytes(), Ordering::Relaxed);
        }

        let current = self.gc_deletes();
        let gc_deletes = settings.get_as_time(INDEX_GC_DELETES_SETTING, current);
        if gc_deletes != current {
            info!(key = INDEX_GC_DELETES_SETTING, from = %current, to = %gc_deletes, "updating setting");
            self.gc_deletes.store(gc_deletes.nanos(), Ordering::Relaxed);
        }

        self.merge_scheduler_config.refresh(settings);
        self.merge_policy_config.on_refresh_settings(settings);
    }

    /// The merged node and index settings, index settings winning.
    pub fn settings(&self) -> Arc<Settings> {
        self.settings.load_full()
    }

    /// Node settings this index was opened with. [`IndexSettings::settings`]
    /// is these overlaid with the index settings.
    pub fn node_settings(&self) -> &Settings {
        &self.node_settings
    }

    /// The most recently applied index metadata.
    pub fn index_metadata(&self) -> Arc<IndexMetadata> {
        self.metadata.load_full()
    }

    /// The index name.
    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn uuid(&self) -> &str {
        &self.identity.uuid
    }

    pub fn index_version_created(&self) -> Version {
        self.identity.version_created
    }

    pub fn number_of_shards(&self) -> Option<u32> {
        self.identity.number_of_shards
    }

    /// Read from the current settings; replicas can change at runtime.
    pub fn number_of_replicas(&self) -> Option<u32> {
        self.settings().extract_opt(SETTING_NUMBER_OF_REPLICAS)
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    pub fn custom_data_path(&self) -> Option<String> {
        self.settings().get(SETTING_DATA_PATH).map(str::to_string)
    }

    pub fn has_custom_data_path(&self) -> bool {
        self.settings().contains_key(SETTING_DATA_PATH)
    }

    /// Whether shards of this index live on a shared filesystem. Defaults to
    /// true for shadow replica indices.
    pub fn is_on_shared_filesystem(&self) -> bool {
        let settings = self.settings();
        let shadow = settings.get_as_bool(SETTING_SHADOW_REPLICAS, false);
        settings.get_as_bool(SETTING_SHARED_FILESYSTEM, shadow)
    }

    pub fn is_shadow_replica_index(&self) -> bool {
        self.shadow_replica_index
    }

    /// Listeners in call order.
    pub fn update_listeners(&self) -> &UpdateListeners {
        &self.listeners
    }

    /// Whether `expression` refers to this index.
    pub fn matches_index_name(&self, expression: &str) -> bool {
        (self.name_matcher)(expression)
    }

    pub fn default_field(&self) -> &str {
        &self.default_field
    }

    pub fn is_query_string_lenient(&self) -> bool {
        self.query_string_lenient
    }

    pub fn is_query_string_analyze_wildcard(&self) -> bool {
        self.query_string_analyze_wildcard
    }

    pub fn is_query_string_allow_leading_wildcard(&self) -> bool {
        self.query_string_allow_leading_wildcard
    }

    pub fn is_default_allow_unmapped_fields(&self) -> bool {
        self.default_allow_unmapped_fields
    }

    /// How often the translog is fsynced in the background when durability
    /// is [`Durability::Async`].
    pub fn translog_sync_interval(&self) -> TimeValue {
        self.sync_interval
    }

    pub fn is_flush_on_close(&self) -> bool {
        self.flush_on_close
    }

    pub fn translog_durability(&self) -> Durability {
        Durability::from_u8(self.durability.load(Ordering::Relaxed))
    }

    /// Interval between refreshes; [`TimeValue::MINUS_ONE`] disables them.
    pub fn refresh_interval(&self) -> TimeValue {
        TimeValue::from_nanos(self.refresh_interval.load(Ordering::Relaxed))
    }

    /// Translog size at which a flush is forced.
    pub fn flush_threshold_size(&self) -> ByteSizeValue {
        ByteSizeValue::from_bytes(self.flush_threshold_size.load(Ordering::Relaxed))
    }

    pub fn gc_deletes(&self) -> TimeValue {
        TimeValue::from_nanos(self.gc_deletes.load(Ordering::Relaxed))
    }

    pub fn gc_deletes_in_millis(&self) -> i64 {
        self.gc_deletes().millis()
    }

    /// The live merge scheduler configuration shared with the engine.
    pub fn merge_scheduler_config(&self) -> Arc<MergeSchedulerConfig> {
        Arc::clone(&self.merge_scheduler_config)
    }

    pub fn merge_scheduler(&self) -> MergeSchedulerSnapshot {
        self.merge_scheduler_config.snapshot()
    }

    pub fn merge_policy_config(&self) -> Arc<MergePolicyConfig> {
        Arc::clone(&self.merge_policy_config)
    }

    /// The merge policy to use right now.
    pub fn merge_policy(&self) -> MergePolicy {
        self.merge_policy_config.merge_policy()
    }
}

impl fmt::Debug for IndexSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexSettings")
            .field("index", &self.index)
            .field("identity", &self.identity)
            .field("settings", &self.settings.load())
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(pairs: &[(&str, &str)]) -> IndexMetadata {
        let settings = Settings::builder()
            .put("index.version.created", 2_000_099)
            .put("index.uuid", "abc");
        let settings = pairs
            .iter()
            .fold(settings, |b, (k, v)| b.put(*k, *v))
            .build();
        IndexMetadata::new("logs", settings)
    }

    #[test]
    fn test_defaults() {
        let s = IndexSettings::new(metadata(&[]), Settings::empty(), []).unwrap();
        assert_eq!(s.default_field(), "_all");
        assert!(!s.is_query_string_lenient());
        assert!(!s.is_query_string_analyze_wildcard());
        assert!(s.is_query_string_allow_leading_wildcard());
        assert!(s.is_default_allow_unmapped_fields());
        assert_eq!(s.translog_sync_interval(), TimeValue::from_secs(5));
        assert_eq!(s.translog_durability(), Durability::Request);
        assert_eq!(s.refresh_interval(), TimeValue::from_secs(1));
        assert_eq!(s.flush_threshold_size(), ByteSizeValue::from_mb(512));
        assert!(s.is_flush_on_close());
        assert_eq!(s.gc_deletes_in_millis(), 60_000);
        assert_eq!(s.number_of_shards(), None);
        assert_eq!(s.node_name(), "");
    }

    #[test]
    fn test_missing_version_is_rejected() {
        let metadata = IndexMetadata::new("logs", Settings::builder().put("index.uuid", "a").build());
        let err = IndexSettings::new(metadata, Settings::empty(), []).unwrap_err();
        assert_eq!(
            err,
            IndexSettingsError::MissingSetting {
                key: "index.version.created".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_initial_value_uses_default() {
        let s = IndexSettings::new(
            metadata(&[("index.translog.durability", "bogus"), ("index.gc_deletes", "later")]),
            Settings::empty(),
            [],
        )
        .unwrap();
        assert_eq!(s.translog_durability(), Durability::Request);
        assert_eq!(s.gc_deletes(), DEFAULT_GC_DELETES);
    }

    #[test]
    fn test_no_op_still_records_metadata() {
        let s = IndexSettings::new(metadata(&[]), Settings::empty(), []).unwrap();
        let renamed = IndexMetadata::new("logs-alias-view", metadata(&[]).settings().clone());
        assert!(!s.apply_update(renamed).unwrap());
        assert_eq!(s.index_metadata().index(), "logs-alias-view");
    }

    #[test]
    fn test_shared_filesystem_follows_shadow_replicas() {
        let s = IndexSettings::new(
            metadata(&[("index.shadow_replicas", "true")]),
            Settings::empty(),
            [],
        )
        .unwrap();
        assert!(s.is_shadow_replica_index());
        assert!(s.is_on_shared_filesystem());

        let s = IndexSettings::new(
            metadata(&[("index.shadow_replicas", "true"), ("index.shared_filesystem", "false")]),
            Settings::empty(),
            [],
        )
        .unwrap();
        assert!(!s.is_on_shared_filesystem());
    }
}
