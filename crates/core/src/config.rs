use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::error::{DestinationError, DestinationResult};

/// Destination settings as supplied by the Segment host, one set per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub collector_endpoint: String,
    pub api_key: String,
    pub environment: String,
    /// Track event name → goal name.
    #[serde(default)]
    pub goal_mapping: BTreeMap<String, String>,
    /// Event field (slash-delimited path) → unit type, in the order the
    /// settings object lists them.
    #[serde(default)]
    pub unit_mapping: Map<String, Value>,
    #[serde(default)]
    pub enable_page_view_tracking: bool,
    #[serde(default)]
    pub enable_app_screen_view_tracking: bool,
    #[serde(default)]
    pub enable_exposure_tracking: bool,
}

impl Settings {
    pub fn from_json(raw: &str) -> DestinationResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> DestinationResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Check the settings are usable for publishing.
    pub fn validate(&self) -> DestinationResult<()> {
        if self.api_key.is_empty() {
            return Err(DestinationError::Config(
                "apiKey must not be empty".to_string(),
            ));
        }
        Url::parse(&self.collector_endpoint).map_err(|e| {
            DestinationError::Config(format!(
                "collectorEndpoint '{}' is not a valid URL: {e}",
                self.collector_endpoint
            ))
        })?;
        if let Some((field, _)) = self.unit_mapping.iter().find(|(_, v)| !v.is_string()) {
            return Err(DestinationError::Config(format!(
                "unitMapping entry '{field}' must map to a unit type string"
            )));
        }
        Ok(())
    }

    /// `(event field, unit type)` pairs in settings order. Entries whose unit
    /// type is not a string are skipped.
    pub fn unit_fields(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.unit_mapping
            .iter()
            .filter_map(|(field, unit_type)| Some((field.as_str(), unit_type.as_str()?)))
    }

    /// The collector's publish URL.
    pub fn context_url(&self) -> String {
        format!("{}/context", self.collector_endpoint.trim_end_matches('/'))
    }

    /// Apply process-level overrides (typically secrets from the environment).
    pub fn apply_overrides(&mut self, config: &AppConfig) {
        if let Some(endpoint) = &config.collector_endpoint {
            self.collector_endpoint = endpoint.clone();
        }
        if let Some(api_key) = &config.api_key {
            self.api_key = api_key.clone();
        }
        if let Some(environment) = &config.environment {
            self.environment = environment.clone();
        }
    }
}

/// Process configuration for the replay binary. Loaded from environment
/// variables with the prefix `SEGMENT_DESTINATION__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,
    #[serde(default)]
    pub collector_endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

fn default_settings_path() -> PathBuf {
    PathBuf::from("settings.json")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
            collector_endpoint: None,
            api_key: None,
            environment: None,
            dry_run: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("SEGMENT_DESTINATION")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
