use crate::model::Operation;
use serde_json::Value;
use std::collections::BTreeSet;

pub(super) fn matches(operation: Operation, values: &[String], input: &str) -> bool {
    let Ok(document) = serde_json::from_str::<Value>(input) else {
        return false;
    };

    let keys = flatten_keys(&document);
    match operation {
        Operation::HasOne => values.iter().any(|v| keys.contains(v)),
        Operation::HasAll => values.iter().all(|v| keys.contains(v)),
        _ => false,
    }
}

/// Collect the dotted field paths of a JSON document.
///
/// Arrays are transparent: the fields of their elements appear under the
/// array's own path, with no index segment. Numeric field names are treated
/// the same way.
#[must_use]
pub fn flatten_keys(document: &Value) -> BTreeSet<String> {
    let mut keys = BTreeSet::new();
    collect(document, None, &mut keys);
    keys
}

fn collect(node: &Value, prefix: Option<&str>, keys: &mut BTreeSet<String>) {
    match node {
        Value::Object(map) => {
            for (field, child) in map {
                // numeric field names are array-like positions: skip the segment, keep the subtree
                if field.parse::<u64>().is_ok() {
                    collect(child, prefix, keys);
                    continue;
                }

                let path = prefix.map_or_else(|| field.clone(), |p| format!("{p}.{field}"));
                collect(child, Some(&path), keys);
                let _ = keys.insert(path);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect(item, prefix, keys);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn flattens_nested_objects_and_arrays() {
        let doc = json!({
            "id": 1,
            "login": "user",
            "order": { "qty": 1, "items": [{ "sku": "a" }, { "sku": "b", "tags": ["x"] }] }
        });

        let keys: Vec<_> = flatten_keys(&doc).into_iter().collect();
        assert_eq!(
            keys,
            vec!["id", "login", "order", "order.items", "order.items.sku", "order.items.tags", "order.qty"]
        );
    }

    #[test]
    fn numeric_fields_keep_their_subtree() {
        let doc = json!({ "order": { "123": { "qty": 1 }, "7": 2 } });
        let keys: Vec<_> = flatten_keys(&doc).into_iter().collect();
        assert_eq!(keys, vec!["order", "order.qty"]);

        let input = r#"{"order":{"123":{"qty":1}}}"#;
        assert!(matches(Operation::HasAll, &values(&["order", "order.qty"]), input));
        assert!(!matches(Operation::HasOne, &values(&["order.123"]), input));
    }

    #[test]
    fn has_all_and_has_one() {
        let input = r#"{"product":"p","order":{"qty":1}}"#;
        assert!(matches(Operation::HasAll, &values(&["product", "order", "order.qty"]), input));
        assert!(!matches(Operation::HasAll, &values(&["product", "order", "order.total"]), input));
        assert!(matches(Operation::HasOne, &values(&["missing", "order.qty"]), input));
        assert!(!matches(Operation::HasOne, &values(&["missing"]), input));
    }

    #[test]
    fn without_nested_field_has_all_fails() {
        let input = r#"{"product":"p","order":{}}"#;
        assert!(!matches(Operation::HasAll, &values(&["product", "order", "order.qty"]), input));
    }

    #[test]
    fn invalid_json_is_false() {
        assert!(!matches(Operation::HasOne, &values(&["a"]), "{ not json"));
        assert!(!matches(Operation::HasAll, &[], "nope"));
    }
}
