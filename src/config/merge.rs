//! Settings layer merging
//!
//! Objects merge by key; arrays and scalars are replaced by the later layer.

use serde_json::Value;

/// Merge `overlay` onto `base`.
///
/// - Objects: recursive merge by key
/// - Arrays: replaced whole
/// - Scalars and null: overlay wins
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Fold layers in order; the last layer has the highest precedence.
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_key_override_keeps_siblings() {
        let base = json!({
            "bonecast": { "data_dir": "data/bonecast", "compress": true }
        });
        let overlay = json!({
            "bonecast": { "compress": false }
        });
        let result = deep_merge(base, overlay);

        assert_eq!(result["bonecast"]["compress"], false);
        assert_eq!(result["bonecast"]["data_dir"], "data/bonecast");
    }

    #[test]
    fn test_array_is_replaced() {
        let result = deep_merge(json!({ "shapes": ["a", "b"] }), json!({ "shapes": ["c"] }));
        assert_eq!(result["shapes"], json!(["c"]));
    }

    #[test]
    fn test_null_overrides() {
        let result = deep_merge(json!({ "level": "info" }), json!({ "level": null }));
        assert!(result["level"].is_null());
    }

    #[test]
    fn test_merge_layers_precedence() {
        let builtin = json!({
            "bonecast": { "max_cache_bytes": 100, "compress": true },
            "logging": { "level": "info" }
        });
        let file = json!({
            "bonecast": { "max_cache_bytes": 200 },
            "logging": { "level": "debug" }
        });
        let cli = json!({
            "bonecast": { "max_cache_bytes": 50 }
        });

        let result = merge_layers(vec![builtin, file, cli]);

        assert_eq!(result["bonecast"]["max_cache_bytes"], 50);
        assert_eq!(result["bonecast"]["compress"], true);
        assert_eq!(result["logging"]["level"], "debug");
    }
}
