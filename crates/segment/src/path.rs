use serde_json::{Map, Value};

/// Resolve a slash-delimited key path (`"context/device/id"`) inside a
/// nested JSON mapping.
///
/// Returns `None` as soon as a key is absent, or when an intermediate value
/// is not a mapping while segments remain.
pub fn lookup<'a>(root: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('/');
    let first = segments.next()?;
    let mut current = root.get(first)?;

    for key in segments {
        current = current.as_object()?.get(key)?;
    }
    Some(current)
}

/// [`lookup`] starting from an arbitrary value; only mappings are traversable.
pub fn lookup_value<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    lookup(root.as_object()?, path)
}
