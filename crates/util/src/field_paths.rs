//! Dotted-path helpers over JSON values.
//!
//! Paths are dot-separated segments (`a.b.1.c`). On objects a segment is a
//! key; on arrays a segment that parses as an integer is an index.

use serde_json::Value;

/// Sentinel shown for paths that do not resolve.
pub const MISSING: &str = "-";

/// Resolve `path` inside `value`.
///
/// An empty path returns `value` itself.
pub fn multi_get<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Like [`multi_get`] but renders the result as display text.
///
/// Missing paths and `null` become [`MISSING`]; strings are unquoted; nested
/// values are compact JSON.
pub fn multi_get_text(value: &Value, path: &str) -> String {
    match multi_get(value, path) {
        None | Some(Value::Null) => MISSING.to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Flatten `value` into `(joined.path, leaf)` pairs in document order.
///
/// Array elements contribute their index to the path. Empty containers are
/// kept as leaves so that no attribute silently disappears.
pub fn flatten_leaves(value: &Value) -> Vec<(String, &Value)> {
    let mut leaves = Vec::new();
    collect_leaves(value, "", &mut leaves);
    leaves
}

fn collect_leaves<'a>(value: &'a Value, current_path: &str, leaves: &mut Vec<(String, &'a Value)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, nested_value) in map {
                collect_leaves(nested_value, &join_path(current_path, key), leaves);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, nested_value) in items.iter().enumerate() {
                collect_leaves(nested_value, &join_path(current_path, &index.to_string()), leaves);
            }
        }
        _ => leaves.push((current_path.to_string(), value)),
    }
}

fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_segments_index_lists() {
        let value = json!({"a": {"b": [{"c": 1}, {"c": 2}]}});
        assert_eq!(multi_get(&value, "a.b.1.c"), Some(&json!(2)));
        assert_eq!(multi_get_text(&value, "a.b.1.c"), "2");
    }

    #[test]
    fn missing_leaf_yields_sentinel() {
        let value = json!({"a": {"b": [{"c": 1}]}, "n": null});
        assert_eq!(multi_get_text(&value, "a.b.1.c"), MISSING);
        assert_eq!(multi_get_text(&value, "a.x"), MISSING);
        assert_eq!(multi_get_text(&value, "a.b.first"), MISSING);
        assert_eq!(multi_get_text(&value, "n"), MISSING);
    }

    #[test]
    fn renders_scalars_and_nested_values() {
        let value = json!({"name": "web", "ok": true, "tags": ["a", "b"]});
        assert_eq!(multi_get_text(&value, "name"), "web");
        assert_eq!(multi_get_text(&value, "ok"), "true");
        assert_eq!(multi_get_text(&value, "tags"), r#"["a","b"]"#);
    }

    #[test]
    fn flattens_in_document_order() {
        let value = json!({"id": 1, "net": {"ips": ["10.0.0.1", "10.0.0.2"]}, "meta": {}});
        let paths: Vec<String> = flatten_leaves(&value).into_iter().map(|(path, _)| path).collect();
        assert_eq!(paths, vec!["id", "net.ips.0", "net.ips.1", "meta"]);
    }
}
