//! Index creation version.

use crate::error::ParseSettingError;
use crate::settings::SettingValue;
use serde::Serialize;
use std::fmt;

/// The on-disk format version an index was created with.
///
/// Encoded as a single integer id: `major * 1_000_000 + minor * 10_000 +
/// revision * 100 + build`, so `2000099` is `2.0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Version {
    id: u32,
}

impl Version {
    /// Stand-in for an absent or unreadable version; never equal to a real one.
    pub const UNKNOWN: Version = Version { id: 0 };

    pub const fn from_id(id: u32) -> Self {
        Self { id }
    }

    pub const fn id(&self) -> u32 {
        self.id
    }

    pub const fn major(&self) -> u32 {
        self.id / 1_000_000
    }

    pub const fn minor(&self) -> u32 {
        (self.id / 10_000) % 100
    }

    pub const fn revision(&self) -> u32 {
        (self.id / 100) % 100
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.id < 1_000_000 {
            // Not a release-encoded id; show it raw.
            return write!(f, "{}", self.id);
        }
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.revision())
    }
}

impl SettingValue for Version {
    fn parse_setting(raw: &str) -> Result<Self, ParseSettingError> {
        raw.trim()
            .parse::<u32>()
            .map(Version::from_id)
            .map_err(|e| ParseSettingError::invalid_number(raw, e))
    }
}
