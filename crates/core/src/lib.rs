pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, Settings};
pub use error::{DestinationError, DestinationResult};
pub use types::{EventKind, Goal, GoalPayload, Payload, SegmentEvent, Unit};
