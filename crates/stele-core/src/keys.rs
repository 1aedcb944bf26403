//! Storage-safe key normalization.
//!
//! Linked-data payloads routinely use property IRIs as mapping keys, and IRIs
//! contain `.`, which document stores reserve inside key paths. Keys are
//! rewritten `.` ⇄ `!` on the way in and out of storage; values are never
//! touched. [`encode_keys`] and [`decode_keys`] are mutual inverses on any
//! nested mapping/sequence structure.

use serde_json::{Map, Value};

/// Replace `.` with `!` in mapping keys, recursively. Pure; the input is
/// consumed and rebuilt, never mutated in place.
pub fn encode_keys(value: Value) -> Value { replace_in_keys(value, ".", "!") }

/// Replace `!` with `.` in mapping keys, recursively. Inverse of
/// [`encode_keys`].
pub fn decode_keys(value: Value) -> Value { replace_in_keys(value, "!", ".") }

fn replace_in_keys(value: Value, from: &str, to: &str) -> Value {
  match value {
    Value::Object(map) => {
      let rewritten: Map<String, Value> = map
        .into_iter()
        .map(|(key, inner)| {
          (key.replace(from, to), replace_in_keys(inner, from, to))
        })
        .collect();
      Value::Object(rewritten)
    }
    Value::Array(items) => Value::Array(
      items
        .into_iter()
        .map(|item| replace_in_keys(item, from, to))
        .collect(),
    ),
    other => other,
  }
}
