use thiserror::Error;

pub type DestinationResult<T> = Result<T, DestinationError>;

#[derive(Error, Debug)]
pub enum DestinationError {
    #[error("Invalid event payload: {0}")]
    InvalidPayload(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Collector transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DestinationError {
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload(message.into())
    }
}

impl From<config::ConfigError> for DestinationError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
