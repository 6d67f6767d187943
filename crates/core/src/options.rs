//! User-facing tracker options.
//!
//! Every field is optional; missing fields are filled from the selected
//! template when the options are resolved into a
//! [`Configuration`](crate::configuration::Configuration).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::consumer::ConsumerHandler;
use crate::dom::ElementRef;

/// Event name that matches every event in debounce rules and consumer filters.
pub const ALL_EVENTS: &str = "all";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateName {
    Custom,
    #[default]
    Default,
    Bootstrap4,
}

impl TemplateName {
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateName::Custom => "custom",
            TemplateName::Default => "default",
            TemplateName::Bootstrap4 => "bootstrap4",
        }
    }
}

/// Delay (milliseconds) applied to an event, or to every event with `"all"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebounceRule {
    pub event: String,
    pub delay: u64,
}

impl DebounceRule {
    pub fn new(event: impl Into<String>, delay: u64) -> Self {
        Self {
            event: event.into(),
            delay,
        }
    }

    pub fn applies_to(&self, event: &str) -> bool {
        self.event == event || self.event == ALL_EVENTS
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DebounceConfig {
    Single(DebounceRule),
    PerEvent(Vec<DebounceRule>),
}

impl DebounceConfig {
    /// Rule governing `event`. Only a single rule honours `"all"`; a rule
    /// list is matched by exact event name.
    pub fn rule_for(&self, event: &str) -> Option<&DebounceRule> {
        match self {
            DebounceConfig::Single(rule) => rule.applies_to(event).then_some(rule),
            DebounceConfig::PerEvent(rules) => rules.iter().find(|r| r.event == event),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacySettings {
    #[serde(default)]
    pub masking: bool,
    /// Minimum digit-run length that gets masked.
    #[serde(default = "default_mask_limit")]
    pub limit: usize,
    #[serde(default)]
    pub excluded_selectors: Vec<String>,
}

fn default_mask_limit() -> usize {
    5
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            masking: true,
            limit: default_mask_limit(),
            excluded_selectors: Vec::new(),
        }
    }
}

/// One event name or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventList {
    One(String),
    Many(Vec<String>),
}

impl EventList {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let events: &[String] = match self {
            EventList::One(event) => std::slice::from_ref(event),
            EventList::Many(events) => events,
        };
        events.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            EventList::One(event) => event.is_empty(),
            EventList::Many(events) => events.iter().all(String::is_empty),
        }
    }
}

impl From<&str> for EventList {
    fn from(event: &str) -> Self {
        EventList::One(event.to_string())
    }
}

impl From<Vec<&str>> for EventList {
    fn from(events: Vec<&str>) -> Self {
        EventList::Many(events.into_iter().map(str::to_string).collect())
    }
}

/// Consumer event filter: `"all"` or an explicit list of event names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFilter {
    All,
    Events(Vec<String>),
}

impl EventFilter {
    pub fn accepts(&self, event: &str) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Events(events) => events.iter().any(|e| e == event),
        }
    }
}

impl From<EventList> for EventFilter {
    fn from(list: EventList) -> Self {
        match list {
            EventList::One(event) if event == ALL_EVENTS => EventFilter::All,
            other => EventFilter::Events(other.iter().map(str::to_string).collect()),
        }
    }
}

impl<'de> Deserialize<'de> for EventFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        EventList::deserialize(deserializer).map(EventFilter::from)
    }
}

pub type ValueFn = Arc<dyn Fn(ElementRef<'_>) -> String + Send + Sync>;
pub type ElementPredicate = Arc<dyn Fn(ElementRef<'_>) -> bool + Send + Sync>;

/// Where a target reads its label or identifier from.
#[derive(Clone)]
pub enum ValueSource {
    Attribute(String),
    Custom(ValueFn),
}

impl ValueSource {
    pub fn attribute(name: impl Into<String>) -> Self {
        ValueSource::Attribute(name.into())
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(ElementRef<'_>) -> String + Send + Sync + 'static,
    {
        ValueSource::Custom(Arc::new(f))
    }

    /// Resolve against an element. `None` when the attribute is absent.
    pub fn resolve(&self, element: ElementRef<'_>) -> Option<String> {
        match self {
            ValueSource::Attribute(name) => element.attr(name).map(str::to_string),
            ValueSource::Custom(f) => Some(f(element)),
        }
    }
}

impl fmt::Debug for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSource::Attribute(name) => f.debug_tuple("Attribute").field(name).finish(),
            ValueSource::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl<'de> Deserialize<'de> for ValueSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(ValueSource::Attribute)
    }
}

/// Extra element check attached to a target or container.
#[derive(Clone)]
pub struct Condition(ElementPredicate);

impl Condition {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(ElementRef<'_>) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn test(&self, element: ElementRef<'_>) -> bool {
        (self.0)(element)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Condition(..)")
    }
}

/// A trackable element description.
#[derive(Debug, Clone, Deserialize)]
pub struct Target {
    pub name: String,
    pub selector: String,
    pub events: EventList,
    #[serde(default)]
    pub label_attribute: Option<ValueSource>,
    #[serde(default)]
    pub identifier_attribute: Option<ValueSource>,
    #[serde(skip)]
    pub condition: Option<Condition>,
}

impl Target {
    pub fn new(name: impl Into<String>, selector: impl Into<String>, events: impl Into<EventList>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
            events: events.into(),
            label_attribute: None,
            identifier_attribute: None,
            condition: None,
        }
    }

    pub fn with_label(mut self, source: ValueSource) -> Self {
        self.label_attribute = Some(source);
        self
    }

    pub fn with_identifier(mut self, source: ValueSource) -> Self {
        self.identifier_attribute = Some(source);
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// An enclosing region reported alongside an interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct Container {
    pub name: String,
    pub selector: String,
    #[serde(default)]
    pub name_attribute: Option<String>,
    #[serde(skip)]
    pub condition: Option<Condition>,
}

impl Container {
    pub fn new(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
            name_attribute: None,
            condition: None,
        }
    }

    pub fn with_name_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.name_attribute = Some(attribute.into());
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// A registered callback with its event filter and field map.
#[derive(Clone, Deserialize)]
pub struct Consumer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub events: Option<EventFilter>,
    /// Output key → dot path into the interaction record.
    #[serde(default)]
    pub map: Option<BTreeMap<String, String>>,
    #[serde(skip)]
    pub handler: Option<Arc<dyn ConsumerHandler>>,
}

impl Consumer {
    pub fn new<'a>(
        name: impl Into<String>,
        events: EventFilter,
        map: impl IntoIterator<Item = (&'a str, &'a str)>,
        handler: Arc<dyn ConsumerHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            events: Some(events),
            map: Some(
                map.into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            handler: Some(handler),
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn ConsumerHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Name, map, events and handler are all present. An empty event list
    /// counts as present.
    pub fn is_well_formed(&self) -> bool {
        !self.name.is_empty() && self.map.is_some() && self.events.is_some() && self.handler.is_some()
    }

    /// Whether this consumer receives `event`.
    pub fn accepts(&self, event: &str) -> bool {
        self.events.as_ref().is_some_and(|filter| filter.accepts(event))
    }
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("name", &self.name)
            .field("events", &self.events)
            .field("map", &self.map)
            .field("handler", &self.handler.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Options accepted by `register`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrackerOptions {
    pub template: Option<TemplateName>,
    pub is_debug: Option<bool>,
    /// `Some(None)` is an explicit `null`, distinct from an absent field.
    #[serde(deserialize_with = "deserialize_present")]
    pub debounce: Option<Option<DebounceConfig>>,
    pub privacy: Option<PrivacySettings>,
    pub targets: Option<Vec<Target>>,
    pub containers: Option<Vec<Container>>,
    pub consumers: Option<Vec<Consumer>>,
    pub scroll_distances: Option<Vec<f64>>,
}

fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl TrackerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, template: TemplateName) -> Self {
        self.template = Some(template);
        self
    }

    pub fn with_debug(mut self, is_debug: bool) -> Self {
        self.is_debug = Some(is_debug);
        self
    }

    /// `None` disables debouncing explicitly.
    pub fn with_debounce(mut self, debounce: Option<DebounceConfig>) -> Self {
        self.debounce = Some(debounce);
        self
    }

    pub fn with_privacy(mut self, privacy: PrivacySettings) -> Self {
        self.privacy = Some(privacy);
        self
    }

    pub fn with_targets(mut self, targets: Vec<Target>) -> Self {
        self.targets = Some(targets);
        self
    }

    pub fn with_containers(mut self, containers: Vec<Container>) -> Self {
        self.containers = Some(containers);
        self
    }

    pub fn with_consumer(mut self, consumer: Consumer) -> Self {
        self.consumers.get_or_insert_with(Vec::new).push(consumer);
        self
    }

    pub fn with_scroll_distances(mut self, distances: Vec<f64>) -> Self {
        self.scroll_distances = Some(distances);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debounce_rule_lookup() {
        let single = DebounceConfig::Single(DebounceRule::new("all", 300));
        assert_eq!(single.rule_for("click").map(|r| r.delay), Some(300));

        let scroll_only = DebounceConfig::Single(DebounceRule::new("scroll", 100));
        assert!(scroll_only.rule_for("click").is_none());
        assert!(scroll_only.rule_for("scroll").is_some());

        let list = DebounceConfig::PerEvent(vec![
            DebounceRule::new("all", 50),
            DebounceRule::new("scroll", 250),
        ]);
        assert_eq!(list.rule_for("scroll").map(|r| r.delay), Some(250));
        // `"all"` inside a list is just another event name.
        assert!(list.rule_for("click").is_none());
        assert!(DebounceConfig::PerEvent(vec![DebounceRule::new("all", 100)])
            .rule_for("click")
            .is_none());
    }

    #[test]
    fn test_event_filter_deserialize() {
        let all: EventFilter = serde_json::from_str(r#""all""#).unwrap();
        assert_eq!(all, EventFilter::All);
        assert!(all.accepts("anything"));

        let list: EventFilter = serde_json::from_str(r#"["click","scroll"]"#).unwrap();
        assert!(list.accepts("scroll"));
        assert!(!list.accepts("mouseover"));

        let one: EventFilter = serde_json::from_str(r#""click""#).unwrap();
        assert_eq!(one, EventFilter::Events(vec!["click".into()]));
    }

    #[test]
    fn test_options_deserialize() {
        let options: TrackerOptions = serde_json::from_str(
            r#"{
                "template": "bootstrap4",
                "debounce": [{"event": "scroll", "delay": 200}],
                "targets": [{"name": "cta", "selector": ".cta", "events": "click", "label_attribute": "data-label"}],
                "consumers": [{"name": "ga", "events": "all", "map": {"label": "data.label"}}],
                "scroll_distances": [50, 25]
            }"#,
        )
        .unwrap();
        assert_eq!(options.template, Some(TemplateName::Bootstrap4));
        assert!(matches!(options.debounce, Some(Some(DebounceConfig::PerEvent(_)))));
        let target = &options.targets.as_ref().unwrap()[0];
        assert!(matches!(&target.label_attribute, Some(ValueSource::Attribute(a)) if a == "data-label"));
        let consumer = &options.consumers.as_ref().unwrap()[0];
        assert_eq!(consumer.events, Some(EventFilter::All));
        assert!(consumer.handler.is_none());
        assert!(!consumer.is_well_formed());
        assert_eq!(options.scroll_distances, Some(vec![50.0, 25.0]));
    }

    #[test]
    fn test_consumer_presence_checks() {
        let consumers: Vec<Consumer> = serde_json::from_str(
            r#"[
                {"name": "  ", "events": [], "map": {}},
                {"name": "", "events": "all", "map": {}},
                {"name": "ga", "map": {}}
            ]"#,
        )
        .unwrap();
        let handler = crate::consumer::noop_handler();
        let bound: Vec<Consumer> = consumers.into_iter().map(|c| c.with_handler(handler.clone())).collect();

        assert!(bound[0].is_well_formed());
        assert!(!bound[0].accepts("click"));
        assert!(!bound[1].is_well_formed());
        assert!(bound[2].events.is_none());
        assert!(!bound[2].is_well_formed());
    }

    #[test]
    fn test_explicit_null_debounce() {
        let explicit: TrackerOptions = serde_json::from_str(r#"{"debounce": null}"#).unwrap();
        assert_eq!(explicit.debounce, Some(None));
        let absent: TrackerOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.debounce, None);
    }

    #[test]
    fn test_value_source_custom() {
        use crate::dom::{Document, NodeSpec};
        let doc = Document::from_spec(&NodeSpec::new("a").attr("href", "/x").text("Go")).unwrap();
        let link = doc.root().unwrap();
        let upper = ValueSource::custom(|el| el.text_content().to_uppercase());
        assert_eq!(upper.resolve(link), Some("GO".to_string()));
        assert_eq!(ValueSource::attribute("href").resolve(link), Some("/x".to_string()));
        assert_eq!(ValueSource::attribute("title").resolve(link), None);
    }
}
