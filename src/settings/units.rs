//! Duration and byte-size values as they appear in settings.
//!
//! Both types parse the human-friendly strings operators write in settings
//! files (`30s`, `512mb`) and render back to the most compact exact form.

use crate::error::ParseSettingError;
use std::fmt;
use std::time::Duration;

/// A duration setting. `-1` is a valid value meaning "disabled".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeValue {
    /// Nanoseconds; any negative value means disabled.
    nanos: i64,
}

const NANOS_PER_MICRO: i64 = 1_000;
const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Display units, largest first.
const TIME_UNITS: &[(i64, &str)] = &[
    (86_400 * NANOS_PER_SEC, "d"),
    (3_600 * NANOS_PER_SEC, "h"),
    (60 * NANOS_PER_SEC, "m"),
    (NANOS_PER_SEC, "s"),
    (NANOS_PER_MILLI, "ms"),
    (NANOS_PER_MICRO, "micros"),
    (1, "nanos"),
];

impl TimeValue {
    /// The disabled value, written `-1` in settings.
    pub const MINUS_ONE: TimeValue = TimeValue { nanos: -1 };

    pub const ZERO: TimeValue = TimeValue { nanos: 0 };

    pub const fn from_nanos(nanos: i64) -> Self {
        Self { nanos }
    }

    pub const fn from_millis(millis: i64) -> Self {
        if millis < 0 {
            Self::MINUS_ONE
        } else {
            Self {
                nanos: millis.saturating_mul(NANOS_PER_MILLI),
            }
        }
    }

    pub const fn from_secs(secs: i64) -> Self {
        if secs < 0 {
            Self::MINUS_ONE
        } else {
            Self {
                nanos: secs.saturating_mul(NANOS_PER_SEC),
            }
        }
    }

    /// Converts a std duration, saturating at `i64::MAX` nanoseconds.
    pub fn from_duration(duration: Duration) -> Self {
        Self {
            nanos: i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX),
        }
    }

    pub const fn nanos(&self) -> i64 {
        self.nanos
    }

    /// Milliseconds, or `-1` when disabled.
    pub const fn millis(&self) -> i64 {
        if self.nanos < 0 {
            -1
        } else {
            self.nanos / NANOS_PER_MILLI
        }
    }

    pub const fn is_disabled(&self) -> bool {
        self.nanos < 0
    }

    /// The std duration, or `None` when disabled.
    pub fn as_duration(&self) -> Option<Duration> {
        u64::try_from(self.nanos).ok().map(Duration::from_nanos)
    }

    /// Parses `-1`, a bare millisecond count, a fractional single-unit value
    /// (`1.5s`, `0.5h`), or a humantime expression such as `500ms`, `30s` or
    /// `1h 30m`.
    ///
    /// Units are case-insensitive, so `m` and `M` both mean minutes. Long
    /// humantime units (`months`, `y`/`years`) are still accepted.
    pub fn parse(raw: &str) -> Result<Self, ParseSettingError> {
        let value = raw.trim().to_ascii_lowercase();
        if value == "-1" {
            return Ok(Self::MINUS_ONE);
        }
        if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            let millis: i64 = value
                .parse()
                .map_err(|e: std::num::ParseIntError| ParseSettingError::invalid_time(raw, e))?;
            return Ok(Self::from_millis(millis));
        }
        if let Some(parsed) = parse_fractional_time(raw, &value) {
            return parsed;
        }
        humantime::parse_duration(&value)
            .map(Self::from_duration)
            .map_err(|e| ParseSettingError::invalid_time(raw, e))
    }
}

/// Single-unit suffixes accepted with a fractional number.
const FRACTIONAL_TIME_UNITS: &[(&str, i64)] = &[
    ("nanos", 1),
    ("ns", 1),
    ("micros", NANOS_PER_MICRO),
    ("us", NANOS_PER_MICRO),
    ("ms", NANOS_PER_MILLI),
    ("s", NANOS_PER_SEC),
    ("m", 60 * NANOS_PER_SEC),
    ("h", 3_600 * NANOS_PER_SEC),
    ("d", 86_400 * NANOS_PER_SEC),
];

/// `None` unless `value` is `<digits>.<digits><unit>`.
fn parse_fractional_time(raw: &str, value: &str) -> Option<Result<TimeValue, ParseSettingError>> {
    let split = value.find(|c: char| !(c.is_ascii_digit() || c == '.'))?;
    let (number, unit) = value.split_at(split);
    if !number.contains('.') {
        return None;
    }
    let per_unit = FRACTIONAL_TIME_UNITS
        .iter()
        .find(|(suffix, _)| *suffix == unit.trim())
        .map(|(_, per_unit)| *per_unit)?;
    let parsed = number
        .parse::<f64>()
        .map_err(|e| ParseSettingError::invalid_time(raw, e))
        .and_then(|n| {
            let nanos = (n * per_unit as f64).round();
            if !nanos.is_finite() || nanos >= i64::MAX as f64 {
                Err(ParseSettingError::out_of_range(raw, "duration too large"))
            } else {
                Ok(TimeValue::from_nanos(nanos as i64))
            }
        });
    Some(parsed)
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nanos < 0 {
            return write!(f, "-1");
        }
        if self.nanos == 0 {
            return write!(f, "0s");
        }
        for &(per_unit, suffix) in TIME_UNITS {
            if self.nanos % per_unit == 0 {
                return write!(f, "{}{}", self.nanos / per_unit, suffix);
            }
        }
        write!(f, "{}nanos", self.nanos)
    }
}

/// A size in bytes, written with binary units (`kb` = 1024 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ByteSizeValue {
    bytes: u64,
}

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;
const TB: u64 = GB * 1024;
const PB: u64 = TB * 1024;

const BYTE_UNITS: &[(u64, &str)] = &[(PB, "pb"), (TB, "tb"), (GB, "gb"), (MB, "mb"), (KB, "kb")];

impl ByteSizeValue {
    pub const fn from_bytes(bytes: u64) -> Self {
        Self { bytes }
    }

    pub const fn from_kb(kb: u64) -> Self {
        Self {
            bytes: kb.saturating_mul(KB),
        }
    }

    pub const fn from_mb(mb: u64) -> Self {
        Self {
            bytes: mb.saturating_mul(MB),
        }
    }

    pub const fn from_gb(gb: u64) -> Self {
        Self {
            bytes: gb.saturating_mul(GB),
        }
    }

    pub const fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Parses `<number><unit>`; the number may be fractional (`1.5gb`) and a
    /// missing unit means bytes.
    pub fn parse(raw: &str) -> Result<Self, ParseSettingError> {
        let value = raw.trim().to_ascii_lowercase();
        let split = value
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(value.len());
        let (number, unit) = value.split_at(split);
        let multiplier = match unit.trim() {
            "" | "b" => 1,
            "k" | "kb" => KB,
            "m" | "mb" => MB,
            "g" | "gb" => GB,
            "t" | "tb" => TB,
            "p" | "pb" => PB,
            _ => return Err(ParseSettingError::invalid_byte_size(raw, "unknown unit")),
        };
        if number.is_empty() {
            return Err(ParseSettingError::invalid_byte_size(raw, "missing number"));
        }
        if let Ok(whole) = number.parse::<u64>() {
            return whole
                .checked_mul(multiplier)
                .map(Self::from_bytes)
                .ok_or_else(|| ParseSettingError::invalid_byte_size(raw, "overflow"));
        }
        let fractional: f64 = number
            .parse()
            .map_err(|_| ParseSettingError::invalid_byte_size(raw, "not a number"))?;
        let bytes = fractional * multiplier as f64;
        if !bytes.is_finite() || bytes >= u64::MAX as f64 {
            return Err(ParseSettingError::invalid_byte_size(raw, "overflow"));
        }
        Ok(Self::from_bytes(bytes as u64))
    }
}

impl fmt::Display for ByteSizeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &(per_unit, suffix) in BYTE_UNITS {
            if self.bytes >= per_unit && self.bytes % per_unit == 0 {
                return write!(f, "{}{}", self.bytes / per_unit, suffix);
            }
        }
        write!(f, "{}b", self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_units() {
        assert_eq!(TimeValue::parse("1s").unwrap(), TimeValue::from_secs(1));
        assert_eq!(TimeValue::parse("30s").unwrap(), TimeValue::from_secs(30));
        assert_eq!(TimeValue::parse("500ms").unwrap(), TimeValue::from_millis(500));
        assert_eq!(TimeValue::parse("2m").unwrap(), TimeValue::from_secs(120));
        assert_eq!(TimeValue::parse("1h 30m").unwrap(), TimeValue::from_secs(5400));
    }

    #[test]
    fn test_parse_time_ignores_case() {
        assert_eq!(TimeValue::parse("30S").unwrap(), TimeValue::from_secs(30));
        assert_eq!(TimeValue::parse("1M").unwrap(), TimeValue::from_secs(60));
        assert_eq!(TimeValue::parse("500MS").unwrap(), TimeValue::from_millis(500));
    }

    #[test]
    fn test_parse_fractional_time() {
        assert_eq!(TimeValue::parse("1.5s").unwrap(), TimeValue::from_millis(1500));
        assert_eq!(TimeValue::parse("0.5h").unwrap(), TimeValue::from_secs(1800));
        assert_eq!(TimeValue::parse("2.5MS").unwrap(), TimeValue::from_nanos(2_500_000));
        assert!(TimeValue::parse("1.5parsecs").is_err());
        assert!(TimeValue::parse("1.2.3s").is_err());
    }

    #[test]
    fn test_parse_time_bare_number_is_millis() {
        assert_eq!(TimeValue::parse("1500").unwrap(), TimeValue::from_millis(1500));
        assert_eq!(TimeValue::parse("0").unwrap(), TimeValue::ZERO);
    }

    #[test]
    fn test_parse_time_minus_one_is_disabled() {
        let value = TimeValue::parse("-1").unwrap();
        assert!(value.is_disabled());
        assert_eq!(value.millis(), -1);
        assert_eq!(value.as_duration(), None);
        assert_eq!(value.to_string(), "-1");
    }

    #[test]
    fn test_parse_time_rejects_garbage() {
        assert!(TimeValue::parse("soon").is_err());
        assert!(TimeValue::parse("").is_err());
        assert!(TimeValue::parse("-5s").is_err());
    }

    #[test]
    fn test_time_display_uses_largest_exact_unit() {
        assert_eq!(TimeValue::from_secs(30).to_string(), "30s");
        assert_eq!(TimeValue::from_secs(60).to_string(), "1m");
        assert_eq!(TimeValue::from_millis(1500).to_string(), "1500ms");
        assert_eq!(TimeValue::from_secs(86_400).to_string(), "1d");
        assert_eq!(TimeValue::ZERO.to_string(), "0s");
    }

    #[test]
    fn test_parse_byte_sizes() {
        assert_eq!(ByteSizeValue::parse("512mb").unwrap(), ByteSizeValue::from_mb(512));
        assert_eq!(ByteSizeValue::parse("512MB").unwrap(), ByteSizeValue::from_mb(512));
        assert_eq!(ByteSizeValue::parse("1g").unwrap(), ByteSizeValue::from_gb(1));
        assert_eq!(ByteSizeValue::parse("100").unwrap(), ByteSizeValue::from_bytes(100));
        assert_eq!(ByteSizeValue::parse("2kb").unwrap(), ByteSizeValue::from_bytes(2048));
        assert_eq!(
            ByteSizeValue::parse("1.5gb").unwrap(),
            ByteSizeValue::from_bytes(GB + GB / 2)
        );
    }

    #[test]
    fn test_parse_byte_size_rejects_garbage() {
        assert!(ByteSizeValue::parse("lots").is_err());
        assert!(ByteSizeValue::parse("12parsecs").is_err());
        assert!(ByteSizeValue::parse("mb").is_err());
        assert!(ByteSizeValue::parse("-1").is_err());
    }

    #[test]
    fn test_byte_size_display() {
        assert_eq!(ByteSizeValue::from_mb(512).to_string(), "512mb");
        assert_eq!(ByteSizeValue::from_gb(5).to_string(), "5gb");
        assert_eq!(ByteSizeValue::from_bytes(1500).to_string(), "1500b");
        assert_eq!(ByteSizeValue::from_bytes(0).to_string(), "0b");
    }
}
