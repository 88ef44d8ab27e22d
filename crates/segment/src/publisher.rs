use async_trait::async_trait;
use destination_core::{DestinationError, DestinationResult, Payload, Settings};
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde_json::{json, Value};
use tracing::{debug, info};

/// Value of the `X-Agent` header identifying this integration.
pub const AGENT: &str = "segment";

const X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");
const X_AGENT: HeaderName = HeaderName::from_static("x-agent");
const X_ENVIRONMENT: HeaderName = HeaderName::from_static("x-environment");

/// Sends a payload to the collector and returns its decoded JSON response.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, payload: &Payload, settings: &Settings) -> DestinationResult<Value>;
}

/// Headers for a collector publish call.
pub fn collector_headers(settings: &Settings) -> DestinationResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(X_API_KEY, header_value(&settings.api_key, "apiKey")?);
    headers.insert(X_AGENT, HeaderValue::from_static(AGENT));
    headers.insert(
        X_ENVIRONMENT,
        header_value(&settings.environment, "environment")?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

fn header_value(value: &str, setting: &str) -> DestinationResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| {
        DestinationError::Config(format!(
            "{setting} contains characters not allowed in an HTTP header"
        ))
    })
}

/// Publishes over HTTP with a single `PUT {collectorEndpoint}/context`.
///
/// No timeout, retry or status check is applied; the response body is
/// decoded as JSON whatever the status.
#[derive(Debug, Clone, Default)]
pub struct HttpPublisher {
    http: reqwest::Client,
}

impl HttpPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    async fn publish(&self, payload: &Payload, settings: &Settings) -> DestinationResult<Value> {
        let url = settings.context_url();
        let body = serde_json::to_vec(payload)?;

        let response = self
            .http
            .put(&url)
            .headers(collector_headers(settings)?)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let decoded = response.json::<Value>().await?;
        info!(url = %url, status = status.as_u16(), "published to collector");
        Ok(decoded)
    }
}

/// Logs the payload instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunPublisher;

#[async_trait]
impl Publisher for DryRunPublisher {
    async fn publish(&self, payload: &Payload, settings: &Settings) -> DestinationResult<Value> {
        let body = serde_json::to_value(payload)?;
        debug!(url = %settings.context_url(), body = %body, "dry run, not publishing");
        Ok(json!({ "dryRun": true, "payload": body }))
    }
}

/// In-memory publisher that captures payloads for testing.
#[derive(Debug, Default)]
pub struct CapturePublisher {
    payloads: Mutex<Vec<Payload>>,
    response: Value,
}

impl CapturePublisher {
    pub fn new(response: Value) -> Self {
        Self {
            payloads: Mutex::new(Vec::new()),
            response,
        }
    }

    pub fn payloads(&self) -> Vec<Payload> {
        self.payloads.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.payloads.lock().len()
    }
}

#[async_trait]
impl Publisher for CapturePublisher {
    async fn publish(&self, payload: &Payload, _settings: &Settings) -> DestinationResult<Value> {
        self.payloads.lock().push(payload.clone());
        Ok(self.response.clone())
    }
}
