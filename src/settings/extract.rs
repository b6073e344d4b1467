//! Typed extraction with fallback on malformed input.

use super::Settings;
use super::units::{ByteSizeValue, TimeValue};
use crate::error::ParseSettingError;
use std::fmt;
use tracing::warn;

/// A type that can be parsed from a raw setting string.
pub trait SettingValue: Sized + fmt::Display {
    fn parse_setting(raw: &str) -> Result<Self, ParseSettingError>;
}

/// An enumerated setting with a fixed, ordered set of variants.
///
/// Implementors get case-insensitive name lookup through [`SettingEnum::from_name`].
pub trait SettingEnum: Copy + 'static {
    const VARIANTS: &'static [Self];

    /// Canonical upper-case name.
    fn name(&self) -> &'static str;

    fn from_name(raw: &str) -> Result<Self, ParseSettingError> {
        let wanted = raw.trim();
        Self::VARIANTS
            .iter()
            .copied()
            .find(|v| v.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseSettingError::UnknownVariant {
                value: raw.to_string(),
                expected: Self::VARIANTS
                    .iter()
                    .map(|v| v.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

impl Settings {
    /// Typed value for `key`.
    ///
    /// Returns `fallback` when the key is missing. When the value is present
    /// but does not parse, logs a warning naming the key, the raw value and
    /// the fallback, then returns `fallback`.
    pub fn extract<T: SettingValue>(&self, key: &str, fallback: T) -> T {
        match self.try_get::<T>(key) {
            None => fallback,
            Some(Ok(value)) => value,
            Some(Err(err)) => {
                warn!(
                    key,
                    value = self.get(key).unwrap_or_default(),
                    fallback = %fallback,
                    error = %err,
                    "Can't apply setting, illegal value; using fallback"
                );
                fallback
            }
        }
    }

    /// Typed value for a setting with no default. Malformed values are
    /// logged and read as unset.
    pub fn extract_opt<T: SettingValue>(&self, key: &str) -> Option<T> {
        match self.try_get::<T>(key)? {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    key,
                    value = self.get(key).unwrap_or_default(),
                    error = %err,
                    "Can't apply setting, illegal value; treating as unset"
                );
                None
            }
        }
    }

    /// `None` if the key is unset, otherwise the parse outcome.
    pub fn try_get<T: SettingValue>(&self, key: &str) -> Option<Result<T, ParseSettingError>> {
        self.get(key).map(T::parse_setting)
    }

    pub fn get_as_bool(&self, key: &str, fallback: bool) -> bool {
        self.extract(key, fallback)
    }

    pub fn get_as_int(&self, key: &str, fallback: i32) -> i32 {
        self.extract(key, fallback)
    }

    pub fn get_as_f64(&self, key: &str, fallback: f64) -> f64 {
        self.extract(key, fallback)
    }

    pub fn get_as_time(&self, key: &str, fallback: TimeValue) -> TimeValue {
        self.extract(key, fallback)
    }

    pub fn get_as_bytes_size(&self, key: &str, fallback: ByteSizeValue) -> ByteSizeValue {
        self.extract(key, fallback)
    }
}

impl SettingValue for bool {
    fn parse_setting(raw: &str) -> Result<Self, ParseSettingError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" | "1" => Ok(true),
            "false" | "off" | "no" | "0" => Ok(false),
            _ => Err(ParseSettingError::InvalidBool {
                value: raw.to_string(),
            }),
        }
    }
}

macro_rules! number_setting {
    ($($ty:ty),*) => {
        $(
            impl SettingValue for $ty {
                fn parse_setting(raw: &str) -> Result<Self, ParseSettingError> {
                    raw.trim()
                        .parse::<$ty>()
                        .map_err(|e| ParseSettingError::invalid_number(raw, e))
                }
            }
        )*
    };
}

number_setting!(i32, i64, u32, u64, usize, f64);

impl SettingValue for String {
    fn parse_setting(raw: &str) -> Result<Self, ParseSettingError> {
        Ok(raw.to_string())
    }
}

impl SettingValue for TimeValue {
    fn parse_setting(raw: &str) -> Result<Self, ParseSettingError> {
        TimeValue::parse(raw)
    }
}

impl SettingValue for ByteSizeValue {
    fn parse_setting(raw: &str) -> Result<Self, ParseSettingError> {
        ByteSizeValue::parse(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Mode {
        Fast,
        Safe,
    }

    impl SettingEnum for Mode {
        const VARIANTS: &'static [Self] = &[Mode::Fast, Mode::Safe];

        fn name(&self) -> &'static str {
            match self {
                Mode::Fast => "FAST",
                Mode::Safe => "SAFE",
            }
        }
    }

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_missing_key_returns_fallback() {
        let s = Settings::empty();
        assert_eq!(s.get_as_int("index.number_of_shards", 7), 7);
        assert!(s.get_as_bool("index.flush_on_close", true));
        assert_eq!(
            s.get_as_time("index.refresh_interval", TimeValue::from_secs(1)),
            TimeValue::from_secs(1)
        );
    }

    #[test]
    fn test_malformed_value_returns_fallback() {
        let s = settings(&[
            ("a.int", "twelve"),
            ("a.bool", "maybe"),
            ("a.time", "whenever"),
            ("a.size", "huge"),
        ]);
        assert_eq!(s.get_as_int("a.int", 3), 3);
        assert!(!s.get_as_bool("a.bool", false));
        assert_eq!(s.get_as_time("a.time", TimeValue::ZERO), TimeValue::ZERO);
        assert_eq!(
            s.get_as_bytes_size("a.size", ByteSizeValue::from_mb(1)),
            ByteSizeValue::from_mb(1)
        );
    }

    #[test]
    fn test_well_formed_values_parse() {
        let s = settings(&[
            ("a.int", " 42 "),
            ("a.bool", "OFF"),
            ("a.float", "0.25"),
            ("a.size", "5gb"),
        ]);
        assert_eq!(s.get_as_int("a.int", 0), 42);
        assert!(!s.get_as_bool("a.bool", true));
        assert_eq!(s.get_as_f64("a.float", 1.0), 0.25);
        assert_eq!(
            s.get_as_bytes_size("a.size", ByteSizeValue::from_bytes(0)),
            ByteSizeValue::from_gb(5)
        );
    }

    #[test]
    fn test_enum_lookup_is_case_insensitive() {
        assert_eq!(Mode::from_name("fast").unwrap(), Mode::Fast);
        assert_eq!(Mode::from_name("Safe").unwrap(), Mode::Safe);
        let err = Mode::from_name("bogus").unwrap_err();
        assert_eq!(err.to_string(), "illegal value [bogus], use one of: [FAST, SAFE]");
    }

    #[test]
    fn test_try_get_distinguishes_missing_and_malformed() {
        let s = settings(&[("a.int", "x")]);
        assert!(s.try_get::<i32>("missing").is_none());
        assert!(matches!(s.try_get::<i32>("a.int"), Some(Err(_))));
    }
}
