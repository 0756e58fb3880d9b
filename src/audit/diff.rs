//! Diff generation for transaction log entries
//!
//! Summarizes which columns an UPDATE changed, for audit listings.

use serde_json::Value;

/// Generate a human-readable diff between two row snapshots
///
/// Only top-level columns are compared. Returns `None` when nothing changed.
pub fn generate_diff(before: &Value, after: &Value) -> Option<String> {
    let (Value::Object(before_obj), Value::Object(after_obj)) = (before, after) else {
        return (before != after)
            .then(|| format!("{} -> {}", format_value(before), format_value(after)));
    };

    let mut changes = Vec::new();

    for (key, before_val) in before_obj {
        match after_obj.get(key) {
            Some(after_val) if after_val != before_val => changes.push(format!(
                "{}: {} -> {}",
                key,
                format_value(before_val),
                format_value(after_val)
            )),
            Some(_) => {}
            None => changes.push(format!("{}: {} -> (removed)", key, format_value(before_val))),
        }
    }

    for (key, after_val) in after_obj {
        if !before_obj.contains_key(key) {
            changes.push(format!("{}: (added) -> {}", key, format_value(after_val)));
        }
    }

    if changes.is_empty() {
        None
    } else {
        Some(changes.join(", "))
    }
}

/// Format a JSON value for one-line display
fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) if s.chars().count() > 40 => {
            let head: String = s.chars().take(37).collect();
            format!("\"{}...\"", head)
        }
        Value::String(s) => format!("\"{}\"", s),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{{} fields}}", obj.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_moved_task_between_lists() {
        let before = json!({"id": "t1", "tekst": "Bellen", "lijst": "inbox"});
        let after = json!({"id": "t1", "tekst": "Bellen", "lijst": "opvolgen"});

        let diff = generate_diff(&before, &after).unwrap();
        assert_eq!(diff, "lijst: \"inbox\" -> \"opvolgen\"");
    }

    #[test]
    fn test_completion_sets_timestamp() {
        let before = json!({"id": "t1", "afgewerkt": null});
        let after = json!({"id": "t1", "afgewerkt": "2026-10-16T09:00:00Z"});

        let diff = generate_diff(&before, &after).unwrap();
        assert!(diff.contains("afgewerkt: null -> \"2026-10-16T09:00:00Z\""));
    }

    #[test]
    fn test_column_added_and_removed() {
        let before = json!({"id": "t1", "opmerkingen": "oud"});
        let after = json!({"id": "t1", "duur": 15});

        let diff = generate_diff(&before, &after).unwrap();
        assert!(diff.contains("opmerkingen: \"oud\" -> (removed)"));
        assert!(diff.contains("duur: (added) -> 15"));
    }

    #[test]
    fn test_identical_snapshots() {
        let row = json!({"id": "p1", "naam": "Thuis"});
        assert!(generate_diff(&row, &row).is_none());
    }

    #[test]
    fn test_long_text_truncated() {
        let before = json!({"tekst": "x".repeat(80)});
        let after = json!({"tekst": "kort"});

        let diff = generate_diff(&before, &after).unwrap();
        assert!(diff.contains("...\""));
    }

    #[test]
    fn test_non_object_values() {
        assert_eq!(
            generate_diff(&json!([1, 2]), &json!({"a": 1})).unwrap(),
            "[2 items] -> {1 fields}"
        );
    }
}
