// crates/canmap/src/merge.rs

//! Structural merge of JSON configuration layers.

use serde_json::Value;

/// Merges `overlay` on top of `base`.
///
/// Objects merge key by key, arrays concatenate (`base` first), and any other
/// overlay value replaces the base value.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut dst), Value::Object(src)) => {
            for (key, src_value) in src {
                let merged = match dst.remove(&key) {
                    Some(dst_value) => merge_entry(dst_value, src_value),
                    None => src_value,
                };
                dst.insert(key, merged);
            }
            Value::Object(dst)
        }
        (_, overlay) => overlay,
    }
}

fn merge_entry(dst: Value, src: Value) -> Value {
    match (dst, src) {
        (dst @ Value::Object(_), src @ Value::Object(_)) => deep_merge(dst, src),
        (Value::Array(mut dst), Value::Array(src)) => {
            dst.extend(src);
            Value::Array(dst)
        }
        (_, src) => src,
    }
}
