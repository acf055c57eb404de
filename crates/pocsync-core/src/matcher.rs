//! Structural subset matching between events and pipeline patterns.
//!
//! A pattern describes the shape an event must contain, not the shape it must
//! equal: extra keys in the event are ignored, every key in the pattern is
//! required. Matching is pure and performs no I/O.

use crate::types::JsonMap;
use serde_json::Value;

/// Test whether `value` structurally contains `pattern`.
///
/// - A null pattern matches everything.
/// - An object pattern requires `value` to be an object whose entries match
///   the pattern's entries recursively; a key absent from `value` is treated
///   as null.
/// - An array pattern requires `value` to be an array in which every pattern
///   element is matched by some value element, in any order.
/// - Anything else matches by equality.
pub fn matches(value: &Value, pattern: &Value) -> bool {
    match pattern {
        Value::Null => true,
        Value::Object(entries) => match value {
            Value::Object(map) => entries
                .iter()
                .all(|(key, sub)| matches(map.get(key).unwrap_or(&Value::Null), sub)),
            _ => false,
        },
        Value::Array(entries) => match value {
            Value::Array(items) => entries
                .iter()
                .all(|sub| items.iter().any(|item| matches(item, sub))),
            _ => false,
        },
        other => value == other,
    }
}

/// Test `value` against a pattern already known to be an object.
///
/// An empty pattern matches any object-shaped value.
pub fn matches_pattern(value: &Value, pattern: &JsonMap) -> bool {
    match value {
        Value::Object(map) => pattern
            .iter()
            .all(|(key, sub)| matches(map.get(key).unwrap_or(&Value::Null), sub)),
        _ => false,
    }
}
