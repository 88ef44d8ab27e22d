//! Per-kind Segment handlers.
//!
//! Every call is independent: it either returns the collector's decoded
//! response, `None` when there is nothing to publish, or an error.

use destination_core::{
    DestinationError, DestinationResult, EventKind, Goal, GoalPayload, Payload, SegmentEvent,
    Settings,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::goals::{build_goal, map_goal_name};
use crate::naming::{page_goal_name, screen_goal_name};
use crate::publisher::Publisher;
use crate::units::extract_units;

/// Track event name carrying an SDK exposure payload.
pub const EXPERIMENT_VIEWED: &str = "Experiment Viewed";

/// Routes Segment events to their handler and publishes the result.
pub struct EventDispatcher<P> {
    publisher: P,
}

impl<P: Publisher> EventDispatcher<P> {
    pub fn new(publisher: P) -> Self {
        Self { publisher }
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Dispatch an event by its kind. Kinds without a handler are a no-op.
    pub async fn handle(
        &self,
        event: &SegmentEvent,
        settings: &Settings,
    ) -> DestinationResult<Option<Value>> {
        match event.kind {
            EventKind::Track => self.on_track(event, settings).await,
            EventKind::Page => self.on_page(event, settings).await,
            EventKind::Screen => self.on_screen(event, settings).await,
            EventKind::Group => self.on_group(event, settings).await,
            EventKind::Other => {
                debug!(message_id = ?event.message_id(), "no handler for event kind");
                Ok(None)
            }
        }
    }

    pub async fn on_track(
        &self,
        event: &SegmentEvent,
        settings: &Settings,
    ) -> DestinationResult<Option<Value>> {
        let Some(event_name) = event.event_name() else {
            debug!(message_id = ?event.message_id(), "track event has no event name");
            return Ok(None);
        };

        if event_name == EXPERIMENT_VIEWED {
            return self
                .publish_exposure(event.property_override(), settings)
                .await;
        }

        let goals = build_goal(event, map_goal_name(&event_name, settings));
        self.publish_goals(event, goals, settings).await
    }

    pub async fn on_page(
        &self,
        event: &SegmentEvent,
        settings: &Settings,
    ) -> DestinationResult<Option<Value>> {
        if !settings.enable_page_view_tracking {
            debug!("page view tracking disabled");
            return Ok(None);
        }

        let name = required_name(event, "Page event requires page name.")?;
        let goals = build_goal(event, page_goal_name(name));
        self.publish_goals(event, goals, settings).await
    }

    pub async fn on_screen(
        &self,
        event: &SegmentEvent,
        settings: &Settings,
    ) -> DestinationResult<Option<Value>> {
        if !settings.enable_app_screen_view_tracking {
            debug!("app screen view tracking disabled");
            return Ok(None);
        }

        let name = required_name(event, "Screen event requires screen name.")?;
        let goals = build_goal(event, screen_goal_name(name));
        self.publish_goals(event, goals, settings).await
    }

    /// Deprecated route for exposures: group calls carrying the SDK payload
    /// in `traits`.
    pub async fn on_group(
        &self,
        event: &SegmentEvent,
        settings: &Settings,
    ) -> DestinationResult<Option<Value>> {
        self.publish_exposure(event.trait_override(), settings).await
    }

    async fn publish_goals(
        &self,
        event: &SegmentEvent,
        goals: Vec<Goal>,
        settings: &Settings,
    ) -> DestinationResult<Option<Value>> {
        if goals.is_empty() {
            return Ok(None);
        }

        let units = extract_units(event, settings);
        if units.is_empty() {
            debug!(message_id = ?event.message_id(), "no units resolved, nothing to publish");
            return Ok(None);
        }

        info!(
            kind = event.kind.as_str(),
            goal = %goals[0].name,
            units = units.len(),
            "publishing goal"
        );
        let payload = Payload::Goals(GoalPayload {
            published_at: event.sent_millis(),
            units,
            goals,
        });
        self.publisher.publish(&payload, settings).await.map(Some)
    }

    async fn publish_exposure(
        &self,
        block: Option<&Value>,
        settings: &Settings,
    ) -> DestinationResult<Option<Value>> {
        if !settings.enable_exposure_tracking {
            debug!("exposure tracking disabled");
            return Ok(None);
        }
        let Some(block) = block else {
            return Ok(None);
        };

        info!("publishing exposure payload");
        let payload = Payload::Passthrough(block.clone());
        self.publisher.publish(&payload, settings).await.map(Some)
    }
}

fn required_name<'a>(event: &'a SegmentEvent, message: &str) -> DestinationResult<&'a str> {
    event
        .name
        .as_ref()
        .and_then(Value::as_str)
        .ok_or_else(|| DestinationError::invalid_payload(message))
}
