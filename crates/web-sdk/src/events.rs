//! Event types: raw host events fed to the collector and the structured
//! interaction records produced from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kollektor_core::NodeId;

/// Pointer coordinates carried by mouse events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerPosition {
    pub x: f64,
    pub y: f64,
}

/// A host event as dispatched on the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomEvent {
    /// Event name, e.g. `click` or `scroll`.
    pub kind: String,
    /// Element the event fired on; `None` means the document itself.
    #[serde(default)]
    pub target: Option<NodeId>,
    /// Host clock in milliseconds.
    pub timestamp_ms: u64,
    #[serde(default)]
    pub pointer: Option<PointerPosition>,
}

impl DomEvent {
    pub fn new(kind: impl Into<String>, target: Option<NodeId>, timestamp_ms: u64) -> Self {
        Self {
            kind: kind.into(),
            target,
            timestamp_ms,
            pointer: None,
        }
    }

    pub fn click(target: NodeId, timestamp_ms: u64) -> Self {
        Self::new("click", Some(target), timestamp_ms)
    }

    pub fn scroll(timestamp_ms: u64) -> Self {
        Self::new("scroll", None, timestamp_ms)
    }

    pub fn with_pointer(mut self, x: f64, y: f64) -> Self {
        self.pointer = Some(PointerPosition { x, y });
        self
    }
}

/// A structured interaction forwarded to consumers.
///
/// Consumer maps address fields by dot path over the serialized form, e.g.
/// `event_type`, `data.label`, `data.target.name`, `data.container.name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub data: InteractionData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InteractionData {
    Mouse(MouseData),
    Scroll(ScrollData),
}

/// Collected properties of an interaction with a tracked element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MouseData {
    pub label: String,
    pub action: String,
    pub identifier: String,
    pub tag: String,
    pub target: TargetRef,
    #[serde(default)]
    pub container: Option<ContainerRef>,
    #[serde(default)]
    pub pointer: Option<PointerPosition>,
}

/// Collected properties of a reached scroll distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollData {
    pub label: String,
    pub action: String,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRef {
    pub name: String,
    pub selector: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRef {
    pub name: String,
    pub selector: String,
}

impl Interaction {
    pub fn new(event_type: impl Into<String>, timestamp_ms: u64, data: InteractionData) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.into(),
            timestamp: timestamp_from_millis(timestamp_ms),
            data,
        }
    }

    pub fn label(&self) -> &str {
        match &self.data {
            InteractionData::Mouse(m) => &m.label,
            InteractionData::Scroll(s) => &s.label,
        }
    }

    pub fn is_scroll(&self) -> bool {
        matches!(self.data, InteractionData::Scroll(_))
    }
}

fn timestamp_from_millis(ms: u64) -> DateTime<Utc> {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_default()
}
