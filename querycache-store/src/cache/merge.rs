//! Deep merge of response payloads into stored data.

use serde_json::Value;

/// Merge `incoming` into `target`.
///
/// Objects merge key by key, recursively. Any other incoming value
/// (including arrays and `null`) replaces what was stored.
pub fn deep_merge(target: &mut Value, incoming: Value) {
    match (target, incoming) {
        (Value::Object(existing), Value::Object(fields)) => {
            for (name, value) in fields {
                match existing.get_mut(&name) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        existing.insert(name, value);
                    }
                }
            }
        }
        (target, incoming) => *target = incoming,
    }
}
