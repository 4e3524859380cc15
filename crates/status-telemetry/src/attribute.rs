//! Span and measurement attributes.

use std::fmt;

use crate::error::{TelemetryError, TelemetryResult};

/// An attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    I64(i64),
    Bool(bool),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::I64(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// A key/value pair attached to a span or measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    pub key: String,
    pub value: Value,
}

impl KeyValue {
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Value::String(value.into()),
        }
    }

    pub fn i64(key: impl Into<String>, value: i64) -> Self {
        Self {
            key: key.into(),
            value: Value::I64(value),
        }
    }

    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        Self {
            key: key.into(),
            value: Value::Bool(value),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Look up the last value for `key` in an attribute list.
pub fn find<'a>(attributes: &'a [KeyValue], key: &str) -> Option<&'a Value> {
    attributes
        .iter()
        .rev()
        .find(|kv| kv.key == key)
        .map(|kv| &kv.value)
}

/// Check that `key` is usable as an attribute key.
///
/// Keys start with an ASCII letter, followed by ASCII alphanumerics,
/// `_`, `.` or `-`.
pub fn validate_key(key: &str) -> TelemetryResult<()> {
    let mut chars = key.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(TelemetryError::InvalidAttributeKey(key.to_string()))
    }
}

/// The Prometheus name `key` is exported under: every character outside
/// `[A-Za-z0-9_]` becomes `_`, and a leading digit gets a `_` prefix.
///
/// Distinct keys can share a name (`http.url` and `http_url`).
pub fn label_name(key: &str) -> String {
    let mut out: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_keys() {
        for key in ["team", "deployment.environment", "http.status_code", "a-b", "x1"] {
            assert!(validate_key(key).is_ok(), "{key} should be valid");
        }
    }

    #[test]
    fn invalid_keys() {
        for key in ["", "1abc", ".leading", "has space", "emoji🙂", "_under"] {
            assert_eq!(
                validate_key(key),
                Err(TelemetryError::InvalidAttributeKey(key.to_string())),
            );
        }
    }

    #[test]
    fn label_names() {
        assert_eq!(label_name("http.status_code"), "http_status_code");
        assert_eq!(label_name("a-b.c"), "a_b_c");
        assert_eq!(label_name("9lives"), "_9lives");
        assert_eq!(label_name("http.url"), label_name("http_url"));
    }

    #[test]
    fn find_returns_latest_value() {
        let attrs = vec![
            KeyValue::string("a", "first"),
            KeyValue::i64("b", 2),
            KeyValue::string("a", "second"),
        ];
        assert_eq!(find(&attrs, "a").and_then(Value::as_str), Some("second"));
        assert_eq!(find(&attrs, "b").and_then(Value::as_i64), Some(2));
        assert!(find(&attrs, "c").is_none());
    }

    #[test]
    fn display() {
        assert_eq!(KeyValue::i64("code", 200).to_string(), "code=200");
        assert_eq!(KeyValue::bool("ok", true).to_string(), "ok=true");
    }
}
