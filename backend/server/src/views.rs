//! Named sub-views that entity serializers are assembled from.
use serde_json::{Map, Value, json};

pub fn identity(kind: &str, id: &str) -> Value {
    json!({ "__type__": kind, "id": id })
}

pub fn editable(authors: &[String]) -> Value {
    json!({ "authors": authors })
}

pub fn trashable(trashed: bool) -> Value {
    json!({ "trashed": trashed })
}

pub fn content(text: Option<&str>, resource: Option<&str>) -> Value {
    json!({ "text": text, "resource": resource })
}

/// Shallow merge of JSON objects, later keys win. Non-objects are skipped.
pub fn merge(parts: impl IntoIterator<Item = Value>) -> Value {
    let mut merged = Map::new();
    for part in parts {
        if let Value::Object(fields) = part {
            merged.extend(fields);
        }
    }
    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge() {
        let merged = merge([
            identity("Item", "Item:a"),
            trashable(false),
            json!({ "title": "Sleep", "trashed": true }),
        ]);
        assert_eq!(
            merged,
            json!({ "__type__": "Item", "id": "Item:a", "title": "Sleep", "trashed": true })
        );
    }
}
