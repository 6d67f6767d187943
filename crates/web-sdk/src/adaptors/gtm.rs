//! Google Tag Manager adaptor: turns consumer data into dataLayer push
//! objects.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::ConsumerAdaptor;

/// Configuration for the GTM adaptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GtmConfig {
    /// GTM container ID, e.g. "GTM-XXXXXXX".
    pub container_id: String,
    /// Prepended to every event name, e.g. "kollektor." → "kollektor.click".
    pub event_prefix: Option<String>,
}

/// Google Tag Manager adaptor.
pub struct GtmAdaptor {
    config: GtmConfig,
}

impl GtmAdaptor {
    pub fn new(config: GtmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GtmConfig {
        &self.config
    }

    fn event_name(&self, event: &str) -> String {
        match &self.config.event_prefix {
            Some(prefix) => format!("{prefix}{event}"),
            None => event.to_string(),
        }
    }
}

impl ConsumerAdaptor for GtmAdaptor {
    fn platform(&self) -> &str {
        "gtm"
    }

    fn transform(&self, event: &str, data: &Map<String, Value>) -> Result<Value> {
        let event_name = self.event_name(event);

        // Mapped fields go in flat; `event` always carries the GTM trigger name.
        let mut payload = data.clone();
        payload.insert("event".into(), Value::String(event_name.clone()));

        debug!(
            event_name = %event_name,
            container_id = %self.config.container_id,
            "GTM dataLayer push transformed"
        );

        Ok(Value::Object(payload))
    }

    fn validate_config(&self) -> Result<()> {
        if self.config.container_id.is_empty() {
            return Err(anyhow!("GTM container_id must not be empty"));
        }
        if !self.config.container_id.starts_with("GTM-") {
            return Err(anyhow!(
                "GTM container_id must start with 'GTM-', got '{}'",
                self.config.container_id
            ));
        }
        Ok(())
    }
}
