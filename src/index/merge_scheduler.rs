//! Merge scheduler limits.
//!
//! Held by the storage engine for the lifetime of the index and read on every
//! scheduling decision. Each field is its own atomic: readers never block, and
//! a reader that looks at two fields during a refresh may see one old and one
//! new value.

use crate::settings::Settings;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::info;

pub const MAX_THREAD_COUNT: &str = "index.merge.scheduler.max_thread_count";
pub const MAX_MERGE_COUNT: &str = "index.merge.scheduler.max_merge_count";
pub const AUTO_THROTTLE: &str = "index.merge.scheduler.auto_throttle";
pub const NOTIFY_ON_MERGE_FAILURE: &str = "index.merge.scheduler.notify_on_failure";
/// Node setting overriding the detected processor count.
pub const PROCESSORS: &str = "processors";

/// Live merge scheduler configuration.
#[derive(Debug)]
pub struct MergeSchedulerConfig {
    max_thread_count: AtomicUsize,
    max_merge_count: AtomicUsize,
    auto_throttle: AtomicBool,
    notify_on_merge_failure: bool,
}

impl MergeSchedulerConfig {
    pub fn new(settings: &Settings) -> Self {
        let max_thread_count =
            settings.extract(MAX_THREAD_COUNT, default_max_thread_count(settings));
        let max_merge_count = settings.extract(MAX_MERGE_COUNT, max_thread_count.saturating_add(5));
        Self {
            max_thread_count: AtomicUsize::new(max_thread_count),
            max_merge_count: AtomicUsize::new(max_merge_count),
            auto_throttle: AtomicBool::new(settings.get_as_bool(AUTO_THROTTLE, true)),
            notify_on_merge_failure: settings.get_as_bool(NOTIFY_ON_MERGE_FAILURE, true),
        }
    }

    /// Maximum number of merge threads running at once.
    pub fn max_thread_count(&self) -> usize {
        self.max_thread_count.load(Ordering::Relaxed)
    }

    pub fn set_max_thread_count(&self, value: usize) {
        self.max_thread_count.store(value, Ordering::Relaxed);
    }

    /// Maximum number of merges queued before indexing is throttled.
    pub fn max_merge_count(&self) -> usize {
        self.max_merge_count.load(Ordering::Relaxed)
    }

    pub fn set_max_merge_count(&self, value: usize) {
        self.max_merge_count.store(value, Ordering::Relaxed);
    }

    pub fn is_auto_throttle(&self) -> bool {
        self.auto_throttle.load(Ordering::Relaxed)
    }

    pub fn set_auto_throttle(&self, value: bool) {
        self.auto_throttle.store(value, Ordering::Relaxed);
    }

    /// Whether a failed merge should fail the shard. Fixed at creation.
    pub fn is_notify_on_merge_failure(&self) -> bool {
        self.notify_on_merge_failure
    }

    /// A point-in-time copy of the live fields.
    pub fn snapshot(&self) -> MergeSchedulerSnapshot {
        MergeSchedulerSnapshot {
            max_thread_count: self.max_thread_count(),
            max_merge_count: self.max_merge_count(),
            auto_throttle: self.is_auto_throttle(),
        }
    }

    /// Re-read the live fields from `settings`.
    ///
    /// Each field falls back to its current value when absent or malformed;
    /// real changes are logged.
    pub(crate) fn refresh(&self, settings: &Settings) {
        let current = self.max_thread_count();
        let max_thread_count = settings.extract(MAX_THREAD_COUNT, current);
        if max_thread_count != current {
            info!(key = MAX_THREAD_COUNT, from = current, to = max_thread_count, "updating setting");
            self.set_max_thread_count(max_thread_count);
        }

        let current = self.max_merge_count();
        let max_merge_count = settings.extract(MAX_MERGE_COUNT, current);
        if max_merge_count != current {
            info!(key = MAX_MERGE_COUNT, from = current, to = max_merge_count, "updating setting");
            self.set_max_merge_count(max_merge_count);
        }

        let current = self.is_auto_throttle();
        let auto_throttle = settings.extract(AUTO_THROTTLE, current);
        if auto_throttle != current {
            info!(key = AUTO_THROTTLE, from = current, to = auto_throttle, "updating setting");
            self.set_auto_throttle(auto_throttle);
        }
    }
}

/// Copy of the live merge scheduler fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSchedulerSnapshot {
    pub max_thread_count: usize,
    pub max_merge_count: usize,
    pub auto_throttle: bool,
}

/// `max(1, min(4, processors / 2))`, with processors taken from the
/// `processors` setting or the detected parallelism.
fn default_max_thread_count(settings: &Settings) -> usize {
    let detected = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let processors = settings.extract(PROCESSORS, detected);
    (processors / 2).clamp(1, 4)
}
