use destination_core::types::OVERRIDE_KEY;
use destination_core::{Goal, SegmentEvent, Settings};
use serde_json::Map;

use crate::properties::filter_numeric;

/// Build the single goal an event achieves under `name`.
///
/// `achievedAt` comes from `originalTimestamp`; properties are the numeric
/// view of the property bag, without the SDK override block.
pub fn build_goal(event: &SegmentEvent, name: impl Into<String>) -> Vec<Goal> {
    let properties = event
        .properties_map()
        .map(|props| {
            let mut filtered = filter_numeric(props);
            filtered.remove(OVERRIDE_KEY);
            filtered
        })
        .unwrap_or_else(Map::new);

    vec![Goal {
        name: name.into(),
        achieved_at: event.original_millis(),
        properties,
    }]
}

/// Map a track event name through `goalMapping`, passing unmapped names
/// through unchanged.
pub fn map_goal_name<'a>(event_name: &'a str, settings: &'a Settings) -> &'a str {
    settings
        .goal_mapping
        .get(event_name)
        .map(String::as_str)
        .unwrap_or(event_name)
}
