//! Adaptors for turning consumer data into third-party analytics payloads.
//!
//! Each adaptor implements [`ConsumerAdaptor`] to transform a consumer's
//! mapped data into the JSON shape its platform expects (Google Tag Manager,
//! Google Analytics 4). An [`AdaptorHandler`] plugs an adaptor in as a
//! consumer handler and pushes every payload onto a shared [`DataLayer`].

pub mod ga;
pub mod gtm;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use serde_json::{Map, Value};
use tracing::warn;

use kollektor_core::{Consumer, ConsumerHandler, EventFilter};

/// Adaptor trait: transforms consumer data into a platform-specific payload.
pub trait ConsumerAdaptor: Send + Sync {
    /// Platform identifier (e.g. "gtm", "ga4").
    fn platform(&self) -> &str;

    /// Transform one forwarded interaction into the platform payload.
    fn transform(&self, event: &str, data: &Map<String, Value>) -> Result<Value>;

    /// Validate that the adaptor configuration is correct.
    fn validate_config(&self) -> Result<()>;
}

/// Append-only payload queue shared between adaptors and the host.
#[derive(Debug, Clone, Default)]
pub struct DataLayer {
    entries: Arc<Mutex<Vec<Value>>>,
}

impl DataLayer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Value>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, payload: Value) {
        self.lock().push(payload);
    }

    pub fn entries(&self) -> Vec<Value> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Take every queued payload, leaving the layer empty.
    pub fn drain(&self) -> Vec<Value> {
        std::mem::take(&mut *self.lock())
    }
}

/// Consumer handler backed by an adaptor.
pub struct AdaptorHandler<A> {
    adaptor: A,
    layer: DataLayer,
}

impl<A: ConsumerAdaptor> AdaptorHandler<A> {
    pub fn new(adaptor: A, layer: DataLayer) -> Self {
        Self { adaptor, layer }
    }

    pub fn adaptor(&self) -> &A {
        &self.adaptor
    }
}

impl<A: ConsumerAdaptor> ConsumerHandler for AdaptorHandler<A> {
    fn handle(&self, event: &str, data: &Map<String, Value>) {
        match self.adaptor.transform(event, data) {
            Ok(payload) => self.layer.push(payload),
            Err(e) => warn!(
                platform = self.adaptor.platform(),
                event,
                error = %e,
                "adaptor transform failed"
            ),
        }
    }
}

/// Build a consumer that forwards through `adaptor` into `layer`. The
/// adaptor configuration is validated first.
pub fn adaptor_consumer<'a, A>(
    name: impl Into<String>,
    events: EventFilter,
    map: impl IntoIterator<Item = (&'a str, &'a str)>,
    adaptor: A,
    layer: DataLayer,
) -> Result<Consumer>
where
    A: ConsumerAdaptor + 'static,
{
    adaptor.validate_config()?;
    Ok(Consumer::new(
        name,
        events,
        map,
        Arc::new(AdaptorHandler::new(adaptor, layer)),
    ))
}
