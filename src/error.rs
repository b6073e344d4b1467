//! Error types for the settings store.

use crate::index::version::Version;
use std::fmt;
use thiserror::Error;

/// A re-configuration disagrees with the index's immutable identity.
///
/// Raised before any state is touched; the store is left exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityMismatch {
    #[error("version mismatch on settings update expected: {expected} but was: {actual}")]
    Version { expected: Version, actual: Version },

    #[error("uuid mismatch on settings update expected: {expected} but was: {actual}")]
    Uuid { expected: String, actual: String },
}

impl IdentityMismatch {
    /// Name of the identity field that disagreed.
    pub fn field(&self) -> &'static str {
        match self {
            IdentityMismatch::Version { .. } => "version",
            IdentityMismatch::Uuid { .. } => "uuid",
        }
    }
}

/// Errors surfaced by [`IndexSettings`](crate::index::IndexSettings).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexSettingsError {
    #[error(transparent)]
    IdentityMismatch(#[from] IdentityMismatch),

    #[error("[{key}] is not present in the index settings")]
    MissingSetting { key: String },
}

/// A raw setting string could not be turned into its typed value.
///
/// Never escapes [`Settings::extract`](crate::settings::Settings::extract);
/// it only feeds the fallback warning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseSettingError {
    #[error("failed to parse [{value}] as a time value: {reason}")]
    InvalidTime { value: String, reason: String },

    #[error("failed to parse [{value}] as a byte size: {reason}")]
    InvalidByteSize { value: String, reason: String },

    #[error("failed to parse [{value}] as a boolean")]
    InvalidBool { value: String },

    #[error("failed to parse [{value}] as a number: {reason}")]
    InvalidNumber { value: String, reason: String },

    #[error("illegal value [{value}], use one of: [{expected}]")]
    UnknownVariant { value: String, expected: String },

    #[error("value [{value}] out of range: {reason}")]
    OutOfRange { value: String, reason: String },
}

impl ParseSettingError {
    pub fn invalid_time(value: &str, reason: impl fmt::Display) -> Self {
        Self::InvalidTime {
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_byte_size(value: &str, reason: impl fmt::Display) -> Self {
        Self::InvalidByteSize {
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_number(value: &str, reason: impl fmt::Display) -> Self {
        Self::InvalidNumber {
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn out_of_range(value: &str, reason: impl fmt::Display) -> Self {
        Self::OutOfRange {
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for store operations.
pub type SettingsResult<T> = std::result::Result<T, IndexSettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_mismatch_messages_name_both_values() {
        let err = IdentityMismatch::Uuid {
            expected: "abc".to_string(),
            actual: "xyz".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "uuid mismatch on settings update expected: abc but was: xyz"
        );
        assert_eq!(err.field(), "uuid");
    }

    #[test]
    fn test_identity_mismatch_converts_into_store_error() {
        let err: IndexSettingsError = IdentityMismatch::Version {
            expected: Version::from_id(2_000_099),
            actual: Version::from_id(1_070_099),
        }
        .into();
        assert!(matches!(
            err,
            IndexSettingsError::IdentityMismatch(IdentityMismatch::Version { .. })
        ));
        assert!(err.to_string().starts_with("version mismatch"));
    }

    #[test]
    fn test_unknown_variant_lists_options() {
        let err = ParseSettingError::UnknownVariant {
            value: "bogus".to_string(),
            expected: "REQUEST, ASYNC".to_string(),
        };
        assert_eq!(err.to_string(), "illegal value [bogus], use one of: [REQUEST, ASYNC]");
    }
}
