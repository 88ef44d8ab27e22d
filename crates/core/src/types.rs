use std::borrow::Cow;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Key of the block an upstream SDK embeds in `properties` / `traits` to
/// override unit mapping or to carry a ready-made exposure payload.
pub const OVERRIDE_KEY: &str = "absmartly";

/// Segment message kinds. Kinds this destination has no handler for
/// (identify, alias, ...) deserialize as `Other`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Track,
    Page,
    Screen,
    Group,
    #[serde(other)]
    Other,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Track => "track",
            EventKind::Page => "page",
            EventKind::Screen => "screen",
            EventKind::Group => "group",
            EventKind::Other => "other",
        }
    }
}

/// An inbound Segment message.
///
/// Fields the handlers read are typed; everything else (identity fields such
/// as `userId` / `anonymousId`, `context`, `messageId`, ...) lands in
/// `fields` and stays reachable for unit mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Track event name. Untyped like the bags below so a malformed message
    /// still deserializes and the handler decides what to do with it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<Value>,
    /// Page / screen name. Left untyped so a non-string name is detectable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traits: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl SegmentEvent {
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub fn message_id(&self) -> Option<&str> {
        self.fields.get("messageId").and_then(Value::as_str)
    }

    /// Track event name. Numeric names are used in their string form.
    pub fn event_name(&self) -> Option<Cow<'_, str>> {
        match self.event.as_ref()? {
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            _ => None,
        }
    }

    /// The property bag, when it is an object.
    pub fn properties_map(&self) -> Option<&Map<String, Value>> {
        self.properties.as_ref()?.as_object()
    }

    /// The trait bag, when it is an object.
    pub fn traits_map(&self) -> Option<&Map<String, Value>> {
        self.traits.as_ref()?.as_object()
    }

    /// The embedded override block in `properties`, if any.
    pub fn property_override(&self) -> Option<&Value> {
        self.properties_map()?.get(OVERRIDE_KEY)
    }

    /// The embedded override block in `traits`, if any.
    pub fn trait_override(&self) -> Option<&Value> {
        self.traits_map()?.get(OVERRIDE_KEY)
    }

    /// `originalTimestamp` as epoch milliseconds.
    pub fn original_millis(&self) -> Option<i64> {
        self.original_timestamp.as_deref().and_then(parse_millis)
    }

    /// `sentAt` as epoch milliseconds.
    pub fn sent_millis(&self) -> Option<i64> {
        self.sent_at.as_deref().and_then(parse_millis)
    }
}

/// Parse an ISO-8601 timestamp into epoch milliseconds. Full RFC 3339
/// date-times and bare `YYYY-MM-DD` dates (taken as UTC midnight) are
/// accepted.
pub fn parse_millis(timestamp: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(dt.timestamp_millis());
    }
    let date = NaiveDate::parse_from_str(timestamp, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis())
}

/// An identity the collector attributes goals and exposures to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Unit {
    #[serde(rename = "type")]
    pub unit_type: String,
    #[serde(deserialize_with = "uid_as_string")]
    pub uid: String,
}

impl Unit {
    pub fn new(unit_type: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            unit_type: unit_type.into(),
            uid: uid.into(),
        }
    }
}

fn uid_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "unit uid must be a string or number, got {other}"
        ))),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub name: String,
    /// Epoch millis; `null` when the event carried no parseable timestamp.
    pub achieved_at: Option<i64>,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoalPayload {
    pub published_at: Option<i64>,
    pub units: Vec<Unit>,
    pub goals: Vec<Goal>,
}

/// Body of a collector publish call.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Payload {
    Goals(GoalPayload),
    /// An embedded exposure payload, forwarded unmodified.
    Passthrough(Value),
}
