//! Declared field kinds and value coercion.
//!
//! # Responsibility
//! - Normalize raw JSON input into the canonical value shape per kind.
//! - Convert canonical values to and from SQLite column values.
//!
//! # Invariants
//! - Canonical shapes: text-like kinds are strings, `Bool` is a JSON bool,
//!   `Timestamp` is epoch milliseconds, `TagList` is a comma-delimited string.
//! - A value read back from storage compares equal to the value that was written.

use chrono::DateTime;
use rusqlite::types::Value as SqlValue;
use rusqlite::Row;
use serde_json::{Number, Value};
use std::collections::BTreeSet;

/// Separator used by the persisted tag column.
pub const TAG_DELIMITER: char = ',';

/// Storage-independent type of one declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Absolute `http`/`https` URL stored as text.
    Url,
    Integer,
    Real,
    Bool,
    /// Epoch milliseconds; RFC 3339 strings are accepted on input.
    Timestamp,
    /// Normalized, deduplicated, lowercase tag set stored comma-delimited.
    TagList,
}

impl FieldKind {
    fn is_text_like(self) -> bool {
        matches!(self, Self::Text | Self::Url | Self::TagList)
    }
}

/// One declared attribute of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub nullable: bool,
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
    pub min_value: Option<i64>,
    /// Applied on create when the field is omitted.
    pub default: Option<Value>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: true,
            min_len: None,
            max_len: None,
            min_value: None,
            default: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn min_len(mut self, len: usize) -> Self {
        self.min_len = Some(len);
        self
    }

    pub fn max_len(mut self, len: usize) -> Self {
        self.max_len = Some(len);
        self
    }

    pub fn min_value(mut self, value: i64) -> Self {
        self.min_value = Some(value);
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Normalizes a non-null input value, or explains why it is invalid.
    pub fn coerce(&self, value: &Value) -> Result<Value, String> {
        let normalized = match self.kind {
            FieldKind::Text => Value::String(expect_str(value)?.to_string()),
            FieldKind::Url => Value::String(coerce_url(value)?),
            FieldKind::Integer => Value::from(expect_i64(value)?),
            FieldKind::Real => Value::Number(coerce_real(value)?),
            FieldKind::Bool => Value::Bool(coerce_bool(value)?),
            FieldKind::Timestamp => Value::from(coerce_timestamp(value)?),
            FieldKind::TagList => Value::String(coerce_tags(value)?),
        };
        self.check_bounds(&normalized)?;
        Ok(normalized)
    }

    /// Converts a filter operand into a bindable SQL value.
    ///
    /// Text-like kinds accept any string so lookups by partial or legacy
    /// values stay possible; other kinds use the same coercion as writes.
    pub fn filter_operand(&self, value: &Value) -> Result<SqlValue, String> {
        if value.is_null() {
            return Ok(SqlValue::Null);
        }
        if self.kind.is_text_like() {
            return Ok(SqlValue::Text(expect_str(value)?.to_string()));
        }
        let normalized = match self.kind {
            FieldKind::Integer => Value::from(expect_i64(value)?),
            FieldKind::Real => Value::Number(coerce_real(value)?),
            FieldKind::Bool => Value::Bool(coerce_bool(value)?),
            FieldKind::Timestamp => Value::from(coerce_timestamp(value)?),
            _ => value.clone(),
        };
        Ok(to_sql_value(&normalized))
    }

    fn check_bounds(&self, value: &Value) -> Result<(), String> {
        if let Value::String(text) = value {
            let len = text.chars().count();
            if let Some(min) = self.min_len {
                if len < min {
                    return Err(format!("must be at least {min} characters"));
                }
            }
            if let Some(max) = self.max_len {
                if len > max {
                    return Err(format!("must be at most {max} characters"));
                }
            }
        }
        if let (Some(min), Some(number)) = (self.min_value, value.as_i64()) {
            if number < min {
                return Err(format!("must be >= {min}"));
            }
        }
        Ok(())
    }
}

/// Converts a canonical JSON value into a bindable SQL value.
pub fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        Value::Number(number) => match number.as_i64() {
            Some(int) => SqlValue::Integer(int),
            None => SqlValue::Real(number.as_f64().unwrap_or_default()),
        },
        Value::String(text) => SqlValue::Text(text.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// Reads one column into its canonical JSON shape.
pub fn read_column(row: &Row<'_>, column: &str, kind: FieldKind) -> rusqlite::Result<Value> {
    let value = match kind {
        FieldKind::Text | FieldKind::Url | FieldKind::TagList => row
            .get::<_, Option<String>>(column)?
            .map_or(Value::Null, Value::String),
        FieldKind::Integer | FieldKind::Timestamp => row
            .get::<_, Option<i64>>(column)?
            .map_or(Value::Null, Value::from),
        FieldKind::Real => row
            .get::<_, Option<f64>>(column)?
            .and_then(Number::from_f64)
            .map_or(Value::Null, Value::Number),
        FieldKind::Bool => row
            .get::<_, Option<i64>>(column)?
            .map_or(Value::Null, |flag| Value::Bool(flag != 0)),
    };
    Ok(value)
}

/// Normalizes one tag: trimmed and lowercased; blank tags are dropped.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Splits a persisted tag column back into tags.
pub fn split_tags(value: &str) -> Vec<String> {
    value.split(TAG_DELIMITER).filter_map(normalize_tag).collect()
}

fn expect_str(value: &Value) -> Result<&str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("expected a string, got {}", json_type(value)))
}

fn expect_i64(value: &Value) -> Result<i64, String> {
    value
        .as_i64()
        .ok_or_else(|| format!("expected an integer, got {}", json_type(value)))
}

fn coerce_url(value: &Value) -> Result<String, String> {
    let text = expect_str(value)?.trim();
    let parsed = url::Url::parse(text).map_err(|err| format!("invalid URL: {err}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(text.to_string()),
        other => Err(format!("unsupported URL scheme `{other}`; expected http or https")),
    }
}

fn coerce_real(value: &Value) -> Result<Number, String> {
    value
        .as_f64()
        .and_then(Number::from_f64)
        .ok_or_else(|| format!("expected a finite number, got {}", json_type(value)))
}

fn coerce_bool(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err("expected a boolean or 0/1".to_string()),
        },
        other => Err(format!("expected a boolean, got {}", json_type(other))),
    }
}

fn coerce_timestamp(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .ok_or_else(|| "expected epoch milliseconds".to_string()),
        Value::String(text) => DateTime::parse_from_rfc3339(text.trim())
            .map(|parsed| parsed.timestamp_millis())
            .map_err(|err| format!("invalid RFC 3339 timestamp: {err}")),
        other => Err(format!(
            "expected epoch milliseconds or RFC 3339 text, got {}",
            json_type(other)
        )),
    }
}

fn coerce_tags(value: &Value) -> Result<String, String> {
    let mut unique = BTreeSet::new();
    match value {
        Value::String(text) => unique.extend(split_tags(text)),
        Value::Array(items) => {
            for item in items {
                let tag = item
                    .as_str()
                    .ok_or_else(|| format!("tags must be strings, got {}", json_type(item)))?;
                if tag.contains(TAG_DELIMITER) {
                    return Err(format!("tag `{tag}` must not contain `{TAG_DELIMITER}`"));
                }
                unique.extend(normalize_tag(tag));
            }
        }
        other => {
            return Err(format!(
                "expected a tag list or delimited string, got {}",
                json_type(other)
            ))
        }
    }
    let tags: Vec<String> = unique.into_iter().collect();
    Ok(tags.join(&TAG_DELIMITER.to_string()))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
