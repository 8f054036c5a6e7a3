//! `format` assertions.
//!
//! Each predicate is registered with the schema engine under its format name,
//! replacing the engine's built-in check where one exists.

use std::sync::OnceLock;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDate, NaiveTime};
use regex::Regex;
use uuid::Uuid;

fn decimal_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").ok())
        .as_ref()
}

/// Whether a decimal text is well formed.
pub fn is_decimal(text: &str) -> bool {
    decimal_pattern().is_some_and(|pattern| pattern.is_match(text))
}

/// Parse a time of day, with or without a UTC offset.
pub fn parse_time(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(&format!("1970-01-01T{text}"))
                .ok()
                .map(|dt| dt.time())
        })
}

pub fn is_date(text: &str) -> bool {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
}

pub fn is_time(text: &str) -> bool {
    parse_time(text).is_some()
}

pub fn is_date_time(text: &str) -> bool {
    DateTime::parse_from_rfc3339(text).is_ok()
}

pub fn is_uuid(text: &str) -> bool {
    Uuid::parse_str(text).is_ok()
}

/// Standard base64, the wire form of bytes.
pub fn is_binary(text: &str) -> bool {
    STANDARD.decode(text).is_ok()
}

/// Formats asserted during validation, by name.
pub const FORMATS: [(&str, fn(&str) -> bool); 6] = [
    ("date", is_date),
    ("time", is_time),
    ("date-time", is_date_time),
    ("uuid", is_uuid),
    ("decimal", is_decimal),
    ("binary", is_binary),
];

/// Whether `text` satisfies the named format. Unknown formats pass.
pub fn check_format(format: &str, text: &str) -> bool {
    FORMATS
        .iter()
        .find(|(name, _)| *name == format)
        .map_or(true, |(_, check)| check(text))
}
