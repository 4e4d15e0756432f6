//! Raw setting values and the conversions parsing relies on.
//!
//! Settings arrive as stored: strings, numbers, booleans, and sometimes
//! arrays that were serialized to a JSON string before being written.
//! Conversions here never fail; a value that doesn't fit yields `None`.

use byte_unit::Byte;
use indexmap::IndexMap;
use serde_json::Value;

/// Stored key → raw value, in stored order.
pub type Settings = IndexMap<String, Value>;

/// Strip one leading literal `prefix` from `key`.
pub fn remove_setting_prefix<'a>(prefix: &str, key: &'a str) -> &'a str {
    key.strip_prefix(prefix).unwrap_or(key)
}

/// Loose truthiness of a stored value.
///
/// Empty strings, `"0"`, zero, `null`, `false` and empty collections are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Decode a string holding a serialized array or object; anything else is returned as is.
pub fn maybe_unserialize(value: &Value) -> Value {
    if let Value::String(s) = value {
        let trimmed = s.trim_start();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            if let Ok(decoded) = serde_json::from_str::<Value>(s) {
                return decoded;
            }
        }
    }
    value.clone()
}

/// Text form of a scalar. `false`, `null` and collections have none.
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("1".to_string()),
        Value::Bool(false) | Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Text form, treating the empty string as unset.
pub fn as_non_empty_text(value: &Value) -> Option<String> {
    as_text(value).filter(|s| !s.is_empty())
}

pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A list of strings from an array, a serialized array, or a comma separated string.
pub fn as_string_list(value: &Value) -> Option<Vec<String>> {
    match maybe_unserialize(value) {
        Value::Array(items) => Some(items.iter().filter_map(as_non_empty_text).collect()),
        Value::String(s) if !s.trim().is_empty() => Some(
            s.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        _ => None,
    }
}

/// Size limit in bytes from a number of bytes or a unit string such as `2MB`.
pub fn as_byte_size(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if let Ok(bytes) = s.parse::<u64>() {
                return Some(bytes);
            }
            Byte::parse_str(s, true).ok().map(|b| b.as_u64())
        }
        _ => None,
    }
}

/// Lowercase, dash separated slug of `title`.
///
/// ASCII letters, digits and underscores are kept; whitespace and dashes
/// collapse into a single dash; everything else is dropped.
pub fn sanitize_title(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c.to_ascii_lowercase());
        } else if (c.is_whitespace() || c == '-') && !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Meta key derived from a field name: the slug with dashes turned into underscores.
pub fn meta_key_from_name(name: &str) -> String {
    sanitize_title(name).replace('-', "_")
}
