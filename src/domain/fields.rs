//! Field-alias resolution for loosely shaped hub payloads.
//!
//! The hub is not consistent about field names (`jwt` vs `token`, `id` vs
//! `_id` vs `uuid`, ...). Each lookup takes an ordered list of candidate
//! names and returns the first one that carries a meaningful value.

use serde_json::Value;

/// `false`, `0`, `""`, `null`, `[]` and `{}` carry no value.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// First candidate field that is present, in priority order.
pub fn pick<'a>(root: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| root.get(*key))
        .find(|value| is_present(value))
}

/// Like [`pick`], rendered as text.
pub fn pick_text(root: &Value, keys: &[&str]) -> Option<String> {
    pick(root, keys).map(value_to_text)
}

/// Scalars render bare (no JSON quotes); containers render as JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Integer-like value: a non-negative JSON integer, an integral float, or a
/// decimal string.
pub fn as_u64_lenient(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Signed variant of [`as_u64_lenient`], used for hub counters.
pub fn as_i64_lenient(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
