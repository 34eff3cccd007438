//! Date normalization pass over outgoing payloads.

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::DateTime;
use serde_json::Value;

/// Default canonical date format.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Whether `format` is a `strftime` pattern chrono can render.
pub fn is_valid_date_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Recursively rewrite date-typed leaves into `format`.
///
/// RFC 3339 strings are reformatted in their own offset; every other string
/// leaf is trimmed. A date `format` cannot render is left as trimmed text.
pub fn format_request_dates(value: &mut Value, format: &str) {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            let mut rendered = String::new();
            *text = match DateTime::parse_from_rfc3339(trimmed) {
                Ok(date) if write!(rendered, "{}", date.format(format)).is_ok() => rendered,
                _ => trimmed.to_string(),
            };
        }
        Value::Object(map) => {
            for child in map.values_mut() {
                format_request_dates(child, format);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                format_request_dates(item, format);
            }
        }
        _ => {}
    }
}
