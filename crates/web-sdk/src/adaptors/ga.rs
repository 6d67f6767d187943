//! Google Analytics 4 (GA4) adaptor: turns consumer data into gtag-style
//! `{name, params}` event payloads.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::ConsumerAdaptor;

/// GA4 caps event names at 40 characters.
const MAX_EVENT_NAME_LEN: usize = 40;
/// GA4 caps string parameter values at 100 characters.
const MAX_PARAM_VALUE_LEN: usize = 100;

/// Configuration for the GA4 adaptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GaConfig {
    /// GA4 Measurement ID, e.g. "G-XXXXXXXXXX".
    pub measurement_id: String,
    /// Tag every event for GA4 DebugView.
    pub debug_mode: bool,
}

/// Google Analytics 4 adaptor.
pub struct GaAdaptor {
    config: GaConfig,
}

impl GaAdaptor {
    pub fn new(config: GaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GaConfig {
        &self.config
    }

    /// GA4 event names are alphanumeric/underscore, start with a letter and
    /// are at most 40 characters.
    fn ga4_event_name(event: &str) -> String {
        let mut name: String = event
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
            name.insert_str(0, "event_");
        }
        name.truncate(MAX_EVENT_NAME_LEN);
        name
    }

    fn build_params(&self, data: &Map<String, Value>) -> Map<String, Value> {
        let mut params: Map<String, Value> = data
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) if s.chars().count() > MAX_PARAM_VALUE_LEN => {
                        Value::String(s.chars().take(MAX_PARAM_VALUE_LEN).collect())
                    }
                    other => other.clone(),
                };
                (key.clone(), value)
            })
            .collect();
        if self.config.debug_mode {
            params.insert("debug_mode".into(), Value::Bool(true));
        }
        params
    }
}

impl ConsumerAdaptor for GaAdaptor {
    fn platform(&self) -> &str {
        "ga4"
    }

    fn transform(&self, event: &str, data: &Map<String, Value>) -> Result<Value> {
        let name = Self::ga4_event_name(event);
        let params = self.build_params(data);

        debug!(
            event_name = %name,
            measurement_id = %self.config.measurement_id,
            param_count = params.len(),
            "GA4 event transformed"
        );

        Ok(serde_json::json!({
            "name": name,
            "params": params,
        }))
    }

    fn validate_config(&self) -> Result<()> {
        if self.config.measurement_id.is_empty() {
            return Err(anyhow!("GA4 measurement_id must not be empty"));
        }
        if !self.config.measurement_id.starts_with("G-") {
            return Err(anyhow!(
                "GA4 measurement_id must start with 'G-', got '{}'",
                self.config.measurement_id
            ));
        }
        Ok(())
    }
}
