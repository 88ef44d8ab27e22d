use serde_json::{Map, Value};

/// Keep only numeric fields of a property bag.
///
/// Nested mappings are filtered recursively and kept only if something
/// numeric survives. Strings, booleans, nulls and arrays are dropped.
pub fn filter_numeric(props: &Map<String, Value>) -> Map<String, Value> {
    props
        .iter()
        .filter_map(|(key, value)| {
            let kept = match value {
                Value::Number(_) => value.clone(),
                Value::Object(nested) => {
                    let filtered = filter_numeric(nested);
                    if filtered.is_empty() {
                        return None;
                    }
                    Value::Object(filtered)
                }
                _ => return None,
            };
            Some((key.clone(), kept))
        })
        .collect()
}
