//! Conflict policy for context values.
//!
//! - Arrays accumulate: items not already present are appended in order.
//! - Everything else (strings, numbers, objects, null) is last-write-wins.

use serde_json::Value;

/// Merge `incoming` onto `existing` following the context conflict policy.
pub fn merge_value(existing: Option<&Value>, incoming: &Value) -> Value {
    match (existing, incoming) {
        (Some(Value::Array(current)), Value::Array(items)) => {
            let mut merged = current.clone();
            for item in items {
                if !merged.contains(item) {
                    merged.push(item.clone());
                }
            }
            Value::Array(merged)
        }
        (_, Value::Array(items)) => Value::Array(dedup(items)),
        (_, scalar) => scalar.clone(),
    }
}

fn dedup(items: &[Value]) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_last_write_wins() {
        assert_eq!(merge_value(Some(&json!(1)), &json!(2)), json!(2));
        assert_eq!(merge_value(None, &json!("x")), json!("x"));
        assert_eq!(
            merge_value(Some(&json!({"a": 1})), &json!({"b": 2})),
            json!({"b": 2})
        );
    }

    #[test]
    fn test_lists_accumulate_without_duplicates() {
        let merged = merge_value(Some(&json!(["a", "b"])), &json!(["b", "c", "c"]));
        assert_eq!(merged, json!(["a", "b", "c"]));
    }

    #[test]
    fn test_fresh_list_is_deduplicated() {
        assert_eq!(merge_value(None, &json!([1, 1, 2])), json!([1, 2]));
    }

    #[test]
    fn test_list_replaces_scalar() {
        assert_eq!(merge_value(Some(&json!("x")), &json!(["y"])), json!(["y"]));
    }
}
