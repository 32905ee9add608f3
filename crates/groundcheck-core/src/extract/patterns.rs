//! Shared extraction patterns.
//!
//! Every pattern here is applied to free-form model output or raw tool output,
//! so they are intentionally loose. Validators only ever use the first match.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // =========================================================================
    // QUANTITY PATTERNS
    // =========================================================================

    /// Signed decimal followed by an optional degree mark and a C/F unit.
    pub static ref TEMPERATURE_PATTERN: Regex = Regex::new(
        r"(?i)(-?\d+(?:\.\d+)?)\s*°?\s*([CF])"
    ).unwrap();

    /// Unsigned decimal followed by a N/S hemisphere letter.
    pub static ref LATITUDE_PATTERN: Regex = Regex::new(
        r"(?i)(\d+(?:\.\d+)?)\s*°?\s*([NS])"
    ).unwrap();

    /// Unsigned decimal followed by an E/W hemisphere letter.
    pub static ref LONGITUDE_PATTERN: Regex = Regex::new(
        r"(?i)(\d+(?:\.\d+)?)\s*°?\s*([EW])"
    ).unwrap();

    /// Any number with a decimal point.
    pub static ref DECIMAL_PATTERN: Regex = Regex::new(
        r"-?\d+\.\d+"
    ).unwrap();

    // =========================================================================
    // TIME HINT PATTERNS
    // =========================================================================

    /// ISO-8601 datetime with optional seconds, fraction and offset.
    pub static ref ISO_DATETIME_PATTERN: Regex = Regex::new(
        r"\b\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?"
    ).unwrap();

    /// Bare calendar date.
    pub static ref DATE_PATTERN: Regex = Regex::new(
        r"\b\d{4}-\d{2}-\d{2}\b"
    ).unwrap();

    /// A known time-ish field name followed by its value, in JSON or
    /// `key=value` form.
    pub static ref LABELED_TIME_PATTERN: Regex = Regex::new(
        r#"(?i)"?\b(time_last_update_unix|time_last_update_utc|time_next_update_unix|observation_time|last_updated|localtime|datetime|timestamp|date|time|dt)\b"?\s*[:=]\s*"?([^",}\]\n]+)"?"#
    ).unwrap();

    /// Ten-digit integer that looks like a unix epoch in seconds.
    pub static ref UNIX_EPOCH_PATTERN: Regex = Regex::new(
        r"\b\d{10}\b"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_pattern_variants() {
        assert!(TEMPERATURE_PATTERN.is_match("It is 22°C outside"));
        assert!(TEMPERATURE_PATTERN.is_match("about 71 F"));
        assert!(TEMPERATURE_PATTERN.is_match("-3.5c"));
        assert!(!TEMPERATURE_PATTERN.is_match("twenty degrees"));
    }

    #[test]
    fn test_hemisphere_patterns() {
        assert!(LATITUDE_PATTERN.is_match("48.8566° N"));
        assert!(LONGITUDE_PATTERN.is_match("2.3522°E"));
        assert!(!LATITUDE_PATTERN.is_match("no digits here"));
    }

    #[test]
    fn test_labeled_time_pattern() {
        let caps = LABELED_TIME_PATTERN
            .captures(r#"{"time_last_update_unix": 1718841601, "rate": 0.93}"#)
            .unwrap();
        assert_eq!(&caps[1], "time_last_update_unix");
        assert_eq!(caps[2].trim(), "1718841601");
    }

    #[test]
    fn test_epoch_pattern_needs_ten_digits() {
        assert!(UNIX_EPOCH_PATTERN.is_match("ts 1718841601"));
        assert!(!UNIX_EPOCH_PATTERN.is_match("ts 171884160"));
        assert!(!UNIX_EPOCH_PATTERN.is_match("ts 17188416011"));
    }
}
