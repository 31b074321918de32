//! Configuration merge logic
//!
//! - Objects: deep-merge by key
//! - Arrays: replace (last wins)
//! - Scalars: override (last wins)

use serde_json::Value;

/// Deep merge `overlay` into `base`.
///
/// A `null` in the overlay overrides, so a layer can clear an inherited value.
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

/// Merge layers in order (first is base, last has highest precedence)
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_merge_keeps_siblings() {
        let base = json!({"extractor": {"timeout_seconds": 120, "termination_grace_seconds": 5}});
        let overlay = json!({"extractor": {"timeout_seconds": 30}});
        let result = deep_merge(base, overlay);

        assert_eq!(result["extractor"]["timeout_seconds"], 30);
        assert_eq!(result["extractor"]["termination_grace_seconds"], 5);
    }

    #[test]
    fn test_array_replace() {
        let base = json!({"extractor": {"args": ["a", "b", "c"]}});
        let overlay = json!({"extractor": {"args": ["x"]}});
        let result = deep_merge(base, overlay);

        assert_eq!(result["extractor"]["args"], json!(["x"]));
    }

    #[test]
    fn test_null_override() {
        let result = deep_merge(json!({"extractor": {"program": "ruby"}}), json!({"extractor": {"program": null}}));
        assert!(result["extractor"]["program"].is_null());
    }

    #[test]
    fn test_merge_layers() {
        let builtin = json!({"port": 1234, "host": "127.0.0.1"});
        let file = json!({"port": 4000, "log_level": "debug"});
        let cli = json!({"port": 5000});

        let result = merge_layers(vec![builtin, file, cli]);

        assert_eq!(result["port"], 5000);
        assert_eq!(result["host"], "127.0.0.1");
        assert_eq!(result["log_level"], "debug");
    }
}
