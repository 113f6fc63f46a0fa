use serde_json::{Map, Value};

/// Schema versions that nest their fields under a `data` key.
const NESTED_SPEC_VERSIONS: [&str; 4] = ["2.0", "3.0", "2", "3"];

fn is_nested_spec(version: &Value) -> bool {
    match version {
        Value::String(s) => NESTED_SPEC_VERSIONS.contains(&s.as_str()),
        Value::Number(n) => matches!(n.as_u64(), Some(2) | Some(3)),
        _ => false,
    }
}

/// Collapse either card schema into one flat field map.
///
/// A document carrying `spec_version` 2 or 3 together with a `data` object
/// resolves to that nested object verbatim; anything else resolves to the
/// document itself. Never fails: missing keys fall through to the
/// as-is branch, and non-object input resolves to an empty map.
pub fn resolve_highest_spec(metadata: &Value) -> Map<String, Value> {
    let Some(object) = metadata.as_object() else {
        return Map::new();
    };

    if let Some(version) = object.get("spec_version") {
        if is_nested_spec(version) {
            if let Some(Value::Object(data)) = object.get("data") {
                return data.clone();
            }
        }
    }

    object.clone()
}

/// Read a string field from a resolved map, treating blank values as absent.
pub fn field_str<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
