//! Dotted-path navigation over JSON documents.

use serde_json::{Map, Value};

/// Look up a dotted path in a document. An empty path selects the whole
/// document; numeric components index into arrays.
pub fn get_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(doc);
    }

    let mut current = doc;
    for component in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(component)?,
            Value::Array(items) => items.get(component.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Set a dotted path in a document, creating intermediate objects as needed.
/// Existing non-object values along the path are replaced.
pub fn set_path(doc: &mut Value, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            ensure_object(doc).insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = ensure_object(doc)
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            set_path(child, rest, value);
        }
    }
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    value.as_object_mut().expect("value was just set to an object")
}
