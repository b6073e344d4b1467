//! Live index settings.
//!
//! This crate holds the configuration of one open index: it merges node-level
//! defaults with index-level settings, hands the merged view to background
//! components (refresh, flush, merging), and applies updates from the control
//! plane atomically while notifying registered listeners.

pub mod cli;
pub mod error;
pub mod index;
pub mod settings;
pub mod watcher;

pub use error::{IdentityMismatch, IndexSettingsError, ParseSettingError};
pub use index::{IndexMetadata, IndexSettings, SettingsListener};
pub use settings::Settings;
