//! Per-index live configuration.
//!
//! ## Data Flow
//! ```text
//! control plane (IndexMetadata)
//!     → validate.rs (identity: creation version + uuid)
//!     → settings::merge (node settings overlaid with index settings)
//!     → settings.rs (atomic swap of the merged map)
//!     → listeners.rs (ordered, failure-isolated notification)
//!     → re-derived live values, merge_scheduler.rs, merge_policy.rs
//!
//! Background components read IndexSettings, MergeSchedulerConfig and
//! MergePolicyConfig directly and never wait on an update.
//! ```

pub mod listeners;
pub mod matcher;
pub mod merge_policy;
pub mod merge_scheduler;
pub mod metadata;
mod settings;
pub mod translog;
pub mod validate;
pub mod version;

pub use listeners::{SettingsListener, UpdateListeners};
pub use matcher::{IndexNameMatcher, default_matcher, simple_match};
pub use merge_policy::{MergePolicy, MergePolicyConfig, TieredMergePolicy};
pub use merge_scheduler::{MergeSchedulerConfig, MergeSchedulerSnapshot};
pub use metadata::IndexMetadata;
pub use settings::*;
pub use translog::Durability;
pub use validate::{IndexIdentity, validate_identity};
pub use version::Version;
