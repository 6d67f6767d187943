//! Consumer handlers: the callbacks interactions are forwarded to.
//!
//! A handler receives the interaction's event name and the consumer-shaped
//! data object produced by the consumer's field map.

use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use tracing::info;

/// Receives mapped interaction data for a consumer.
pub trait ConsumerHandler: Send + Sync {
    fn handle(&self, event: &str, data: &Map<String, Value>);
}

impl<F> ConsumerHandler for F
where
    F: Fn(&str, &Map<String, Value>) + Send + Sync,
{
    fn handle(&self, event: &str, data: &Map<String, Value>) {
        self(event, data)
    }
}

/// Handler that drops everything.
pub struct NoOpHandler;

impl ConsumerHandler for NoOpHandler {
    fn handle(&self, _event: &str, _data: &Map<String, Value>) {}
}

/// Handler that reports each call through `tracing`.
pub struct LogHandler {
    consumer: String,
}

impl LogHandler {
    pub fn new(consumer: impl Into<String>) -> Self {
        Self {
            consumer: consumer.into(),
        }
    }
}

impl ConsumerHandler for LogHandler {
    fn handle(&self, event: &str, data: &Map<String, Value>) {
        info!(
            consumer = %self.consumer,
            event,
            data = %serde_json::Value::Object(data.clone()),
            "interaction received"
        );
    }
}

/// In-memory handler that records calls for testing.
#[derive(Default)]
pub struct CaptureHandler {
    calls: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl CaptureHandler {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().expect("capture mutex poisoned").clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().expect("capture mutex poisoned").len()
    }

    pub fn count_event(&self, event: &str) -> usize {
        self.calls
            .lock()
            .expect("capture mutex poisoned")
            .iter()
            .filter(|(e, _)| e == event)
            .count()
    }

    pub fn clear(&self) {
        self.calls.lock().expect("capture mutex poisoned").clear();
    }
}

impl ConsumerHandler for CaptureHandler {
    fn handle(&self, event: &str, data: &Map<String, Value>) {
        self.calls
            .lock()
            .expect("capture mutex poisoned")
            .push((event.to_string(), data.clone()));
    }
}

/// Convenience: a handler that ignores every call.
pub fn noop_handler() -> Arc<dyn ConsumerHandler> {
    Arc::new(NoOpHandler)
}

/// Convenience: a capture handler for tests.
pub fn capture_handler() -> Arc<CaptureHandler> {
    Arc::new(CaptureHandler::new())
}
