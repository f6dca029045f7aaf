//! Deep merge for JSON records.
//!
//! Used by the settings repository to lay a stored record over the default
//! record: keys present in the overlay win, missing keys keep their base
//! value, so adding a setting key later never breaks older stored data.

use serde_json::Value;

/// Deep merge two JSON values, with `overlay` taking precedence over `base`.
///
/// - Objects are merged recursively: keys in overlay override keys in base
/// - Arrays, strings, numbers, booleans are replaced entirely
/// - If overlay is null, the base value is preserved (null means "not specified")
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged_value = if let Some(base_value) = base_map.remove(&key) {
                    deep_merge(base_value, overlay_value)
                } else {
                    overlay_value
                };
                base_map.insert(key, merged_value);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn overlay_wins_and_missing_keys_survive() {
        let base = json!({"theme": "light", "autoSave": true});
        let overlay = json!({"theme": "dark", "customKey": 7});
        let result = deep_merge(base, overlay);
        assert_eq!(
            result,
            json!({"theme": "dark", "autoSave": true, "customKey": 7})
        );
    }

    #[test]
    fn null_preserves_base() {
        let base = json!({"fontSize": "medium"});
        let overlay = json!({"fontSize": null});
        assert_eq!(deep_merge(base, overlay), json!({"fontSize": "medium"}));
    }

    #[test]
    fn arrays_replaced_not_concatenated() {
        let base = json!({"items": [1, 2, 3]});
        let overlay = json!({"items": [4]});
        assert_eq!(deep_merge(base, overlay), json!({"items": [4]}));
    }

    #[test]
    fn nested_objects_merge_recursively() {
        let base = json!({"a": {"x": 1, "y": 2}});
        let overlay = json!({"a": {"y": 3}});
        assert_eq!(deep_merge(base, overlay), json!({"a": {"x": 1, "y": 3}}));
    }
}
