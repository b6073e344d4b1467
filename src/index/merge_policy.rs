//! Tiered merge policy parameters.
//!
//! The storage engine asks [`MergePolicyConfig::merge_policy`] for the policy
//! to use when selecting merges; the settings store refreshes the parameters
//! in place after every accepted update.

use crate::error::ParseSettingError;
use crate::settings::{ByteSizeValue, SettingValue, Settings};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::{debug, info, warn};

pub const INDEX_MERGE_ENABLED: &str = "index.merge.enabled";
pub const INDEX_COMPOUND_FORMAT: &str = "index.compound_format";
pub const EXPUNGE_DELETES_ALLOWED: &str = "index.merge.policy.expunge_deletes_allowed";
pub const FLOOR_SEGMENT: &str = "index.merge.policy.floor_segment";
pub const MAX_MERGE_AT_ONCE: &str = "index.merge.policy.max_merge_at_once";
pub const MAX_MERGE_AT_ONCE_EXPLICIT: &str = "index.merge.policy.max_merge_at_once_explicit";
pub const MAX_MERGED_SEGMENT: &str = "index.merge.policy.max_merged_segment";
pub const SEGMENTS_PER_TIER: &str = "index.merge.policy.segments_per_tier";
pub const RECLAIM_DELETES_WEIGHT: &str = "index.merge.policy.reclaim_deletes_weight";

pub const DEFAULT_EXPUNGE_DELETES_ALLOWED: f64 = 10.0;
pub const DEFAULT_FLOOR_SEGMENT: ByteSizeValue = ByteSizeValue::from_mb(2);
pub const DEFAULT_MAX_MERGE_AT_ONCE: usize = 10;
pub const DEFAULT_MAX_MERGE_AT_ONCE_EXPLICIT: usize = 30;
pub const DEFAULT_MAX_MERGED_SEGMENT: ByteSizeValue = ByteSizeValue::from_gb(5);
pub const DEFAULT_SEGMENTS_PER_TIER: f64 = 10.0;
pub const DEFAULT_RECLAIM_DELETES_WEIGHT: f64 = 2.0;
pub const DEFAULT_NO_CFS_RATIO: f64 = 0.1;

/// The merge policy handed to the storage engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MergePolicy {
    Tiered(TieredMergePolicy),
    /// Merging is disabled for this index.
    NoMerge,
}

/// Parameters of a tiered merge policy at one point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TieredMergePolicy {
    pub no_cfs_ratio: f64,
    pub expunge_deletes_allowed: f64,
    pub floor_segment: ByteSizeValue,
    pub max_merge_at_once: usize,
    pub max_merge_at_once_explicit: usize,
    pub max_merged_segment: ByteSizeValue,
    pub segments_per_tier: f64,
    pub reclaim_deletes_weight: f64,
}

/// `index.compound_format`: `true`, `false`, or a ratio in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompoundFormat(pub f64);

impl SettingValue for CompoundFormat {
    fn parse_setting(raw: &str) -> Result<Self, ParseSettingError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => return Ok(CompoundFormat(1.0)),
            "false" => return Ok(CompoundFormat(0.0)),
            _ => {}
        }
        let ratio = f64::parse_setting(raw)?;
        if (0.0..=1.0).contains(&ratio) {
            Ok(CompoundFormat(ratio))
        } else {
            Err(ParseSettingError::out_of_range(raw, "must be true, false, or between 0.0 and 1.0"))
        }
    }
}

impl fmt::Display for CompoundFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An `f64` stored as bits in an `AtomicU64`.
#[derive(Debug)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Live tiered merge policy configuration.
#[derive(Debug)]
pub struct MergePolicyConfig {
    merges_enabled: bool,
    no_cfs_ratio: AtomicF64,
    expunge_deletes_allowed: AtomicF64,
    floor_segment: AtomicU64,
    max_merge_at_once: AtomicUsize,
    max_merge_at_once_explicit: AtomicUsize,
    max_merged_segment: AtomicU64,
    segments_per_tier: AtomicF64,
    reclaim_deletes_weight: AtomicF64,
}

impl MergePolicyConfig {
    pub fn new(settings: &Settings) -> Self {
        let merges_enabled = settings.get_as_bool(INDEX_MERGE_ENABLED, true);
        if !merges_enabled {
            warn!(
                "[{INDEX_MERGE_ENABLED}] is set to false, this should only be used in tests and can cause serious problems in production environments"
            );
        }
        let segments_per_tier = settings.get_as_f64(SEGMENTS_PER_TIER, DEFAULT_SEGMENTS_PER_TIER);
        let max_merge_at_once = adjust_max_merge_at_once(
            settings.extract(MAX_MERGE_AT_ONCE, DEFAULT_MAX_MERGE_AT_ONCE),
            segments_per_tier,
        );
        let no_cfs_ratio = settings
            .extract(INDEX_COMPOUND_FORMAT, CompoundFormat(DEFAULT_NO_CFS_RATIO))
            .0;

        let config = Self {
            merges_enabled,
            no_cfs_ratio: AtomicF64::new(no_cfs_ratio),
            expunge_deletes_allowed: AtomicF64::new(
                settings.get_as_f64(EXPUNGE_DELETES_ALLOWED, DEFAULT_EXPUNGE_DELETES_ALLOWED),
            ),
            floor_segment: AtomicU64::new(
                settings.get_as_bytes_size(FLOOR_SEGMENT, DEFAULT_FLOOR_SEGMENT).bytes(),
            ),
            max_merge_at_once: AtomicUsize::new(max_merge_at_once),
            max_merge_at_once_explicit: AtomicUsize::new(
                settings.extract(MAX_MERGE_AT_ONCE_EXPLICIT, DEFAULT_MAX_MERGE_AT_ONCE_EXPLICIT),
            ),
            max_merged_segment: AtomicU64::new(
                settings
                    .get_as_bytes_size(MAX_MERGED_SEGMENT, DEFAULT_MAX_MERGED_SEGMENT)
                    .bytes(),
            ),
            segments_per_tier: AtomicF64::new(segments_per_tier),
            reclaim_deletes_weight: AtomicF64::new(
                settings.get_as_f64(RECLAIM_DELETES_WEIGHT, DEFAULT_RECLAIM_DELETES_WEIGHT),
            ),
        };
        debug!(policy = ?config.tiered(), "using tiered merge policy");
        config
    }

    /// The policy to use right now.
    pub fn merge_policy(&self) -> MergePolicy {
        if self.merges_enabled {
            MergePolicy::Tiered(self.tiered())
        } else {
            MergePolicy::NoMerge
        }
    }

    pub fn merges_enabled(&self) -> bool {
        self.merges_enabled
    }

    fn tiered(&self) -> TieredMergePolicy {
        TieredMergePolicy {
            no_cfs_ratio: self.no_cfs_ratio.load(),
            expunge_deletes_allowed: self.expunge_deletes_allowed.load(),
            floor_segment: ByteSizeValue::from_bytes(self.floor_segment.load(Ordering::Relaxed)),
            max_merge_at_once: self.max_merge_at_once.load(Ordering::Relaxed),
            max_merge_at_once_explicit: self.max_merge_at_once_explicit.load(Ordering::Relaxed),
            max_merged_segment: ByteSizeValue::from_bytes(
                self.max_merged_segment.load(Ordering::Relaxed),
            ),
            segments_per_tier: self.segments_per_tier.load(),
            reclaim_deletes_weight: self.reclaim_deletes_weight.load(),
        }
    }

    /// Re-read every live parameter from `settings`, keeping the current
    /// value for anything absent or malformed.
    pub fn on_refresh_settings(&self, settings: &Settings) {
        let current = self.tiered();

        refresh_field(settings, EXPUNGE_DELETES_ALLOWED, current.expunge_deletes_allowed, |v| {
            self.expunge_deletes_allowed.store(v)
        });
        refresh_field(settings, FLOOR_SEGMENT, current.floor_segment, |v| {
            self.floor_segment.store(v.bytes(), Ordering::Relaxed)
        });
        refresh_field(
            settings,
            MAX_MERGE_AT_ONCE_EXPLICIT,
            current.max_merge_at_once_explicit,
            |v| self.max_merge_at_once_explicit.store(v, Ordering::Relaxed),
        );
        refresh_field(settings, MAX_MERGED_SEGMENT, current.max_merged_segment, |v| {
            self.max_merged_segment.store(v.bytes(), Ordering::Relaxed)
        });
        refresh_field(settings, RECLAIM_DELETES_WEIGHT, current.reclaim_deletes_weight, |v| {
            self.reclaim_deletes_weight.store(v)
        });
        refresh_field(
            settings,
            INDEX_COMPOUND_FORMAT,
            CompoundFormat(current.no_cfs_ratio),
            |v| self.no_cfs_ratio.store(v.0),
        );

        // segments_per_tier bounds max_merge_at_once, so read both together.
        let segments_per_tier = settings.extract(SEGMENTS_PER_TIER, current.segments_per_tier);
        let max_merge_at_once = adjust_max_merge_at_once(
            settings.extract(MAX_MERGE_AT_ONCE, current.max_merge_at_once),
            segments_per_tier,
        );
        if segments_per_tier != current.segments_per_tier {
            info!(key = SEGMENTS_PER_TIER, from = current.segments_per_tier, to = segments_per_tier, "updating setting");
            self.segments_per_tier.store(segments_per_tier);
        }
        if max_merge_at_once != current.max_merge_at_once {
            info!(key = MAX_MERGE_AT_ONCE, from = current.max_merge_at_once, to = max_merge_at_once, "updating setting");
            self.max_merge_at_once.store(max_merge_at_once, Ordering::Relaxed);
        }
    }
}

fn refresh_field<T>(settings: &Settings, key: &str, current: T, store: impl FnOnce(T))
where
    T: SettingValue + PartialEq + Copy,
{
    let value = settings.extract(key, current);
    if value != current {
        info!(key, from = %current, to = %value, "updating setting");
        store(value);
    }
}

/// `max_merge_at_once` may not exceed `segments_per_tier`, and is at least 2.
fn adjust_max_merge_at_once(max_merge_at_once: usize, segments_per_tier: f64) -> usize {
    if segments_per_tier >= max_merge_at_once as f64 {
        return max_merge_at_once;
    }
    let adjusted = (segments_per_tier as usize).max(2);
    warn!(
        from = max_merge_at_once,
        to = adjusted,
        segments_per_tier,
        "changing max_merge_at_once because segments_per_tier has to be higher or equal to it"
    );
    adjusted
}
