use destination_core::{SegmentEvent, Settings, Unit};
use serde_json::Value;
use tracing::debug;

use crate::path::{lookup, lookup_value};

/// Work out which units an event should be attributed to.
///
/// A `properties.absmartly.units` value embedded by the client SDK wins over
/// the configured unit mapping. Anything other than a list there (including
/// `null`) resolves to no units, and list entries that are not `{type, uid}`
/// objects are dropped. The event is never modified.
pub fn extract_units(event: &SegmentEvent, settings: &Settings) -> Vec<Unit> {
    if let Some(units) = event
        .property_override()
        .and_then(|block| lookup_value(block, "units"))
    {
        return override_units(units);
    }

    settings
        .unit_fields()
        .filter_map(|(field, unit_type)| {
            let uid = match lookup(&event.fields, field)? {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            Some(Unit::new(unit_type, uid))
        })
        .collect()
}

fn override_units(units: &Value) -> Vec<Unit> {
    let Some(items) = units.as_array() else {
        debug!(units = %units, "override units are not a list");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(unit) => Some(unit),
            Err(e) => {
                debug!(unit = %item, error = %e, "dropping malformed override unit");
                None
            }
        })
        .collect()
}
