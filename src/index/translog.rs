//! Translog durability mode.

use crate::error::ParseSettingError;
use crate::settings::{SettingEnum, SettingValue};
use serde::{Serialize, Serializer};
use std::fmt;

/// How aggressively writes are made durable before they are acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Durability {
    /// Fsync the translog after every request, before acknowledging it.
    #[default]
    Request,
    /// Fsync the translog in the background every sync interval.
    Async,
}

impl Durability {
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            Durability::Request => 0,
            Durability::Async => 1,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => Durability::Async,
            _ => Durability::Request,
        }
    }
}

impl SettingEnum for Durability {
    const VARIANTS: &'static [Self] = &[Durability::Request, Durability::Async];

    fn name(&self) -> &'static str {
        match self {
            Durability::Request => "REQUEST",
            Durability::Async => "ASYNC",
        }
    }
}

impl SettingValue for Durability {
    fn parse_setting(raw: &str) -> Result<Self, ParseSettingError> {
        Durability::from_name(raw)
    }
}

impl fmt::Display for Durability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Serialized with the same name it displays and parses as.
impl Serialize for Durability {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}
