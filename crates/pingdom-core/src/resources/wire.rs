//! Wire-shape helpers shared by the resource translations
//!
//! The service accepts id and tag lists as comma-separated strings on write
//! but returns them as arrays (of numbers, or of `{id}` / `{name}` objects)
//! on read. The `split_*` helpers accept every one of those shapes.

use serde_json::{Map, Value};

use crate::attributes::Attributes;
use crate::error::{Error, Result};

/// Copy attribute `attr` into `out[key]` when present
pub(crate) fn copy(attrs: &Attributes, out: &mut Map<String, Value>, attr: &str, key: &str) {
    if let Some(value) = attrs.get(attr) {
        out.insert(key.to_string(), value.clone());
    }
}

/// Copy `wire[key]` into attribute `attr` when present
pub(crate) fn copy_back(wire: &Value, attrs: &mut Attributes, key: &str, attr: &str) {
    if let Some(value) = wire.get(key).filter(|v| !v.is_null()) {
        attrs.set(attr, value.clone());
    }
}

/// Comma-join an integer set attribute when present
pub(crate) fn join_ints(attrs: &Attributes, out: &mut Map<String, Value>, attr: &str, key: &str) {
    if attrs.has(attr) {
        let joined = attrs
            .get_int_set(attr)
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        out.insert(key.to_string(), Value::String(joined));
    }
}

/// Comma-join a string set attribute when present
pub(crate) fn join_strs(attrs: &Attributes, out: &mut Map<String, Value>, attr: &str, key: &str) {
    if attrs.has(attr) {
        out.insert(key.to_string(), Value::String(attrs.get_str_set(attr).join(",")));
    }
}

/// Integer ids from any of the shapes the service uses
pub(crate) fn split_ints(value: &Value) -> Vec<i64> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(obj) => obj.get("id").and_then(as_int),
                other => as_int(other),
            })
            .collect(),
        Value::String(s) => s
            .split(',')
            .filter_map(|part| part.trim().parse().ok())
            .collect(),
        Value::Number(_) => as_int(value).into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Strings from any of the shapes the service uses
pub(crate) fn split_strs(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Set `attr` from an id list at `wire[key]`; empty lists are left unset
pub(crate) fn ints_back(wire: &Value, attrs: &mut Attributes, key: &str, attr: &str) {
    if let Some(value) = wire.get(key) {
        let ints = split_ints(value);
        if !ints.is_empty() {
            attrs.set(attr, ints);
        }
    }
}

/// Set `attr` from a string list at `wire[key]`; empty lists are left unset
pub(crate) fn strs_back(wire: &Value, attrs: &mut Attributes, key: &str, attr: &str) {
    if let Some(value) = wire.get(key) {
        let strs = split_strs(value);
        if !strs.is_empty() {
            attrs.set(attr, strs);
        }
    }
}

/// Integer that may arrive as a number or a numeric string
pub(crate) fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Required string field of a response
pub(crate) fn require_str<'a>(kind: &str, wire: &'a Value, key: &str) -> Result<&'a str> {
    wire.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(kind, wire, key))
}

/// Required integer field of a response
pub(crate) fn require_int(kind: &str, wire: &Value, key: &str) -> Result<i64> {
    wire.get(key)
        .and_then(as_int)
        .ok_or_else(|| malformed(kind, wire, key))
}

fn malformed(kind: &str, wire: &Value, key: &str) -> Error {
    Error::remote(
        kind,
        wire.get("id").and_then(Value::as_u64),
        format!("malformed response: missing field '{}'", key),
    )
}
