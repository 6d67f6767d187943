//! Session replay: builds a document from a recorded session and feeds its
//! events through a collector in timestamp order.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use kollektor_core::{Document, NodeId, NodeSpec, ScrollMetrics, TrackerOptions};
use kollektor_web_sdk::{DomEvent, PointerPosition};

#[derive(Debug, Deserialize)]
pub struct Session {
    pub document: NodeSpec,
    #[serde(default)]
    pub document_element: ScrollMetrics,
    #[serde(default)]
    pub body: ScrollMetrics,
    pub events: Vec<SessionEvent>,
}

#[derive(Debug, Deserialize)]
pub struct SessionEvent {
    pub kind: String,
    /// Selector of the element the event fires on; absent for document events.
    #[serde(default)]
    pub target: Option<String>,
    pub at_ms: u64,
    #[serde(default)]
    pub pointer: Option<PointerPosition>,
    /// Document element scroll metrics in effect from this event on.
    #[serde(default)]
    pub scroll: Option<ScrollMetrics>,
    /// Body scroll metrics in effect from this event on.
    #[serde(default)]
    pub body: Option<ScrollMetrics>,
}

#[derive(Debug)]
pub struct ReplaySummary {
    pub events: usize,
    pub forwarded: usize,
    pub tracked_scroll_distances: Vec<f64>,
}

impl Session {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read session {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse session {}", path.display()))
    }

    pub fn build_document(&self) -> Result<Document> {
        let mut doc = Document::from_spec(&self.document).context("invalid session document")?;
        doc.document_element = self.document_element;
        doc.body = self.body;
        Ok(doc)
    }
}

fn resolve_target(doc: &Document, selector: &str) -> Result<Option<NodeId>> {
    let found = doc
        .query_selector(selector)
        .with_context(|| format!("invalid target selector '{selector}'"))?
        .map(|el| el.id());
    if found.is_none() {
        warn!(selector, "replay target not found in document");
    }
    Ok(found)
}

/// Register and track with `options`, replay every event, then flush held
/// debounced events.
pub fn run(options: TrackerOptions, session: &Session) -> Result<ReplaySummary> {
    let mut doc = session.build_document()?;
    let mut collector = kollektor_web_sdk::register(options).context("configuration rejected")?;
    collector.track();

    let mut events: Vec<&SessionEvent> = session.events.iter().collect();
    events.sort_by_key(|e| e.at_ms);

    let mut forwarded = 0;
    for event in &events {
        if let Some(metrics) = event.scroll {
            doc.document_element = metrics;
        }
        if let Some(metrics) = event.body {
            doc.body = metrics;
        }
        let target = match &event.target {
            Some(selector) => resolve_target(&doc, selector)?,
            None => None,
        };
        let mut dom_event = DomEvent::new(event.kind.clone(), target, event.at_ms);
        if let Some(pointer) = event.pointer {
            dom_event = dom_event.with_pointer(pointer.x, pointer.y);
        }
        forwarded += collector.handle_event(&doc, &dom_event);
    }
    forwarded += collector.flush_pending(&doc);

    Ok(ReplaySummary {
        events: events.len(),
        forwarded,
        tracked_scroll_distances: collector.tracked_scroll_distances().to_vec(),
    })
}
