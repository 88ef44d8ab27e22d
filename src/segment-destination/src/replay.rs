//! Feed a stream of Segment messages through the dispatcher, one at a time.

use std::io::{Read, Write};

use destination_core::{DestinationResult, SegmentEvent, Settings};
use destination_segment::{EventDispatcher, Publisher};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Published,
    Skipped,
    Failed,
}

/// One line of replay output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayRecord {
    pub index: usize,
    pub message_id: Option<String>,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub published: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ReplaySummary {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Published => self.published += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

/// Read events from a single object, an array, or a stream of concatenated
/// (e.g. newline-delimited) objects.
pub fn read_events<R: Read>(reader: R) -> serde_json::Result<Vec<Value>> {
    let mut events = Vec::new();
    for value in serde_json::Deserializer::from_reader(reader).into_iter::<Value>() {
        match value? {
            Value::Array(items) => events.extend(items),
            other => events.push(other),
        }
    }
    Ok(events)
}

/// Dispatch every event in order, writing one JSON record per event to `out`.
pub async fn run<P: Publisher, W: Write>(
    dispatcher: &EventDispatcher<P>,
    settings: &Settings,
    events: Vec<Value>,
    mut out: W,
) -> DestinationResult<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for (index, raw) in events.into_iter().enumerate() {
        let record = match SegmentEvent::from_value(raw) {
            Ok(event) => {
                let message_id = event.message_id().map(String::from);
                match dispatcher.handle(&event, settings).await {
                    Ok(Some(response)) => ReplayRecord {
                        index,
                        message_id,
                        outcome: Outcome::Published,
                        response: Some(response),
                        error: None,
                    },
                    Ok(None) => ReplayRecord {
                        index,
                        message_id,
                        outcome: Outcome::Skipped,
                        response: None,
                        error: None,
                    },
                    Err(e) => {
                        warn!(index, error = %e, "event failed");
                        ReplayRecord {
                            index,
                            message_id,
                            outcome: Outcome::Failed,
                            response: None,
                            error: Some(e.to_string()),
                        }
                    }
                }
            }
            Err(e) => {
                warn!(index, error = %e, "event is not a valid Segment message");
                ReplayRecord {
                    index,
                    message_id: None,
                    outcome: Outcome::Failed,
                    response: None,
                    error: Some(e.to_string()),
                }
            }
        };

        summary.record(record.outcome);
        serde_json::to_writer(&mut out, &record)?;
        writeln!(out)?;
    }

    Ok(summary)
}
