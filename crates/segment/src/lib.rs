pub mod dispatcher;
pub mod goals;
pub mod naming;
pub mod path;
pub mod properties;
pub mod publisher;
pub mod units;

pub use dispatcher::EventDispatcher;
pub use publisher::{DryRunPublisher, HttpPublisher, Publisher};
