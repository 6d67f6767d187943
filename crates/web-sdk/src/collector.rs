//! Interaction collector: validates options, registers listeners, analyses
//! dispatched events and forwards the resulting interactions to consumers.

use tracing::{debug, info, warn};

use kollektor_core::{
    Configuration, Document, ElementRef, KollektorError, KollektorResult, TrackerOptions,
};

use crate::events::{DomEvent, Interaction};
use crate::interactions::{
    find_target, mouse_interaction, scroll_interaction, scroll_percentage, CompiledContainer,
    CompiledTarget,
};
use crate::listeners::{Dispatch, ListenerRegistry};
use crate::mapping::map_to_consumer_object;
use crate::privacy::PrivacyManager;

/// Check options before anything is built. Failures are logged and returned.
pub fn validate_options(options: &TrackerOptions) -> KollektorResult<()> {
    let consumers = match options.consumers.as_deref() {
        Some(consumers) => consumers,
        None => {
            warn!("cannot be registered without any callbacks or plugins");
            return Err(KollektorError::Validation(
                "cannot be registered without any callbacks or plugins".to_string(),
            ));
        }
    };

    let bad_consumers: Vec<&str> = consumers
        .iter()
        .filter(|c| !c.is_well_formed())
        .map(|c| if c.name.is_empty() { "<unnamed>" } else { c.name.as_str() })
        .collect();
    if !bad_consumers.is_empty() {
        warn!(
            bad_consumers = ?bad_consumers,
            "all consumers must have a name, map, events and handler defined"
        );
        return Err(KollektorError::Validation(format!(
            "all consumers must have a name, map, events and handler defined: {}",
            bad_consumers.join(", ")
        )));
    }

    if let Some(distances) = &options.scroll_distances {
        if distances.iter().any(|d| !(0.0..=100.0).contains(d)) {
            warn!(scroll_distances = ?distances, "scroll distances can be only between 0 and 100");
            return Err(KollektorError::Validation(
                "scroll distances can be only between 0 and 100".to_string(),
            ));
        }
    }
    Ok(())
}

/// Validate `options`, merge them over their template and build a collector.
pub fn register(options: TrackerOptions) -> KollektorResult<Collector> {
    validate_options(&options)?;
    Collector::new(Configuration::resolve(options)).inspect_err(|e| {
        warn!(error = %e, "collector registration failed");
    })
}

pub struct Collector {
    config: Configuration,
    privacy: PrivacyManager,
    targets: Vec<CompiledTarget>,
    containers: Vec<CompiledContainer>,
    /// Present once tracking has started.
    listeners: Option<ListenerRegistry>,
    tracked_scroll_distances: Vec<f64>,
}

impl Collector {
    /// Build a collector from a resolved configuration, parsing every selector.
    pub fn new(config: Configuration) -> KollektorResult<Self> {
        let privacy = PrivacyManager::new(config.privacy.clone())?;
        let targets = config
            .targets
            .iter()
            .cloned()
            .map(CompiledTarget::compile)
            .collect::<KollektorResult<Vec<_>>>()?;
        let containers = config
            .containers
            .iter()
            .cloned()
            .map(CompiledContainer::compile)
            .collect::<KollektorResult<Vec<_>>>()?;

        if config.is_debug {
            debug!(
                template = config.template.as_str(),
                targets = targets.len(),
                containers = containers.len(),
                consumers = config.consumers.len(),
                scroll_distances = ?config.scroll_distances,
                "collector configured"
            );
        }

        Ok(Self {
            config,
            privacy,
            targets,
            containers,
            listeners: None,
            tracked_scroll_distances: Vec::new(),
        })
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn is_tracking(&self) -> bool {
        self.listeners.is_some()
    }

    pub fn listeners(&self) -> Option<&ListenerRegistry> {
        self.listeners.as_ref()
    }

    /// Scroll distances already reported, in the order they were reached.
    pub fn tracked_scroll_distances(&self) -> &[f64] {
        &self.tracked_scroll_distances
    }

    /// Start listening. Events handled before this are ignored.
    pub fn track(&mut self) {
        if self.listeners.is_some() {
            warn!("tracking already started");
            return;
        }
        let registry = ListenerRegistry::build(
            &self.targets,
            self.config.debounce.as_ref(),
            !self.config.scroll_distances.is_empty(),
        );
        info!(
            listeners = registry.interaction_listeners().len(),
            scroll = registry.scroll_listener().is_some(),
            "tracking started"
        );
        self.listeners = Some(registry);
    }

    /// Feed a host event. Held debounced events that came due by the event's
    /// time fire first. Returns the number of consumer invocations.
    pub fn handle_event(&mut self, doc: &Document, event: &DomEvent) -> usize {
        let Some(listeners) = self.listeners.as_mut() else {
            if self.config.is_debug {
                debug!(event = %event.kind, "event ignored, tracking not started");
            }
            return 0;
        };
        let mut ready = listeners.take_due(event.timestamp_ms);
        ready.extend(listeners.accept(event));
        self.run_all(doc, ready)
    }

    /// Advance the host clock, firing debounced events whose delay elapsed.
    pub fn advance(&mut self, doc: &Document, now_ms: u64) -> usize {
        let ready = match self.listeners.as_mut() {
            Some(listeners) => listeners.take_due(now_ms),
            None => return 0,
        };
        self.run_all(doc, ready)
    }

    /// Fire every held debounced event immediately.
    pub fn flush_pending(&mut self, doc: &Document) -> usize {
        let ready = match self.listeners.as_mut() {
            Some(listeners) => listeners.take_all(),
            None => return 0,
        };
        self.run_all(doc, ready)
    }

    fn run_all(&mut self, doc: &Document, ready: Vec<Dispatch>) -> usize {
        ready.into_iter().map(|d| self.run(doc, d)).sum()
    }

    fn run(&mut self, doc: &Document, dispatch: Dispatch) -> usize {
        match dispatch {
            Dispatch::Interaction(idx, event) => {
                let matched = self
                    .listeners
                    .as_ref()
                    .and_then(|l| l.interaction_listeners().get(idx))
                    .and_then(|listener| listener.find_match(doc, &event));
                match matched {
                    Some(element) => self.analyse_interaction_event(element, &event),
                    None => 0,
                }
            }
            Dispatch::Scroll(event) => self.analyse_scroll_event(doc, &event),
        }
    }

    fn analyse_interaction_event(&self, element: ElementRef<'_>, event: &DomEvent) -> usize {
        if self.privacy.is_element_excluded(element) {
            if self.config.is_debug {
                debug!(tag = element.tag(), "element excluded by privacy settings");
            }
            return 0;
        }
        let Some(target) = find_target(&self.targets, element) else {
            return 0;
        };
        let interaction = mouse_interaction(element, event, target, &self.containers);
        self.forward_to_consumers(&interaction)
    }

    fn analyse_scroll_event(&mut self, doc: &Document, event: &DomEvent) -> usize {
        let Some(percentage) = scroll_percentage(doc) else {
            return 0;
        };
        let passed: Vec<f64> = self
            .config
            .scroll_distances
            .iter()
            .copied()
            .filter(|d| *d < percentage)
            .collect();

        if self.config.is_debug {
            debug!(
                option_distances = ?self.config.scroll_distances,
                scroll_percentage = percentage,
                passed_distances = ?passed,
                tracked_distances = ?self.tracked_scroll_distances,
                "scroll analysed"
            );
        }

        let mut forwarded = 0;
        for distance in passed {
            if self.tracked_scroll_distances.contains(&distance) {
                continue;
            }
            forwarded += self.forward_to_consumers(&scroll_interaction(distance, event));
            self.tracked_scroll_distances.push(distance);
        }
        forwarded
    }

    fn forward_to_consumers(&self, interaction: &Interaction) -> usize {
        let mut forwarded = 0;
        for consumer in &self.config.consumers {
            if !consumer.accepts(&interaction.event_type) {
                continue;
            }
            let (Some(map), Some(handler)) = (&consumer.map, &consumer.handler) else {
                continue;
            };
            let data = match map_to_consumer_object(interaction, map, &self.privacy) {
                Ok(data) => data,
                Err(e) => {
                    warn!(consumer = %consumer.name, error = %e, "failed to map interaction");
                    continue;
                }
            };
            if self.config.is_debug {
                debug!(
                    consumer = %consumer.name,
                    event = %interaction.event_type,
                    interaction_id = %interaction.id,
                    provided_data = %serde_json::Value::Object(data.clone()),
                    "forwarding interaction"
                );
            }
            handler.handle(&interaction.event_type, &data);
            forwarded += 1;
        }
        forwarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kollektor_core::consumer::capture_handler;
    use kollektor_core::{
        Consumer, DebounceConfig, DebounceRule, EventFilter, NodeSpec, ScrollMetrics, Target,
        TemplateName,
    };
    use std::sync::Arc;

    fn consumer(events: EventFilter) -> (Consumer, Arc<kollektor_core::consumer::CaptureHandler>) {
        let handler = capture_handler();
        let consumer = Consumer::new(
            "capture",
            events,
            [("label", "data.label"), ("target", "data.target.name"), ("container", "data.container.name")],
            handler.clone(),
        );
        (consumer, handler)
    }

    fn page() -> Document {
        let mut doc = Document::from_spec(
            &NodeSpec::new("html").child(
                NodeSpec::new("body")
                    .child(
                        NodeSpec::new("nav")
                            .attr("aria-label", "primary")
                            .child(NodeSpec::new("a").id("home").attr("href", "/").child(NodeSpec::new("span").text("Home"))),
                    )
                    .child(
                        NodeSpec::new("form")
                            .attr("name", "login")
                            .child(NodeSpec::new("input").attr("type", "password"))
                            .child(NodeSpec::new("button").id("submit").text("Log in user 1234567")),
                    ),
            ),
        )
        .unwrap();
        doc.document_element = ScrollMetrics {
            scroll_top: 0.0,
            scroll_height: 2_000.0,
            client_height: 1_000.0,
        };
        doc
    }

    fn node(doc: &Document, selector: &str) -> kollektor_core::NodeId {
        doc.query_selector(selector).unwrap().unwrap().id()
    }

    #[test]
    fn test_register_requires_consumers() {
        assert!(matches!(register(TrackerOptions::new()), Err(KollektorError::Validation(_))));
        let empty = TrackerOptions {
            consumers: Some(vec![]),
            ..Default::default()
        };
        let mut collector = register(empty).unwrap();
        collector.track();
        assert!(collector.configuration().consumers.is_empty());
    }

    #[test]
    fn test_register_accepts_blank_name_and_empty_event_list() {
        let (mut c, handler) = consumer(EventFilter::Events(vec![]));
        c.name = "  ".into();
        let mut collector = register(TrackerOptions::new().with_consumer(c)).unwrap();
        collector.track();

        let doc = page();
        assert_eq!(collector.handle_event(&doc, &DomEvent::click(node(&doc, "#submit"), 0)), 0);
        assert_eq!(handler.count(), 0);
    }

    #[test]
    fn test_register_rejects_malformed_consumer() {
        let (good, _) = consumer(EventFilter::All);
        let mut no_handler = good.clone();
        no_handler.name = "broken".into();
        no_handler.handler = None;
        let err = register(TrackerOptions::new().with_consumer(good.clone()).with_consumer(no_handler))
            .err()
            .unwrap();
        assert!(err.to_string().contains("broken"));

        let mut no_events = good;
        no_events.name = "silent".into();
        no_events.events = None;
        let err = register(TrackerOptions::new().with_consumer(no_events)).err().unwrap();
        assert!(err.to_string().contains("silent"));
    }

    #[test]
    fn test_register_rejects_out_of_range_distances() {
        let (c, _) = consumer(EventFilter::All);
        for bad in [vec![-1.0], vec![50.0, 100.5], vec![f64::NAN]] {
            let options = TrackerOptions::new().with_consumer(c.clone()).with_scroll_distances(bad);
            assert!(matches!(register(options), Err(KollektorError::Validation(_))));
        }
        let ok = TrackerOptions::new().with_consumer(c).with_scroll_distances(vec![0.0, 100.0]);
        assert!(register(ok).is_ok());
    }

    #[test]
    fn test_register_rejects_bad_selector() {
        let (c, _) = consumer(EventFilter::All);
        let options = TrackerOptions::new()
            .with_consumer(c)
            .with_targets(vec![Target::new("bad", "a:hover", "click")]);
        assert!(matches!(register(options), Err(KollektorError::Selector { .. })));
    }

    #[test]
    fn test_events_ignored_before_track() {
        let doc = page();
        let (c, handler) = consumer(EventFilter::All);
        let mut collector = register(TrackerOptions::new().with_consumer(c)).unwrap();
        assert_eq!(collector.handle_event(&doc, &DomEvent::click(node(&doc, "span"), 0)), 0);
        collector.track();
        assert_eq!(collector.handle_event(&doc, &DomEvent::click(node(&doc, "span"), 1)), 1);
        assert_eq!(handler.count(), 1);
    }

    #[test]
    fn test_click_forwarded_with_mapped_data() {
        let doc = page();
        let (c, handler) = consumer(EventFilter::Events(vec!["click".into()]));
        let mut collector = register(TrackerOptions::new().with_consumer(c)).unwrap();
        collector.track();

        collector.handle_event(&doc, &DomEvent::click(node(&doc, "span"), 0));
        collector.handle_event(&doc, &DomEvent::click(node(&doc, "#submit"), 1));

        let calls = handler.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "click");
        assert_eq!(calls[0].1["label"], "Home");
        assert_eq!(calls[0].1["target"], "link");
        assert_eq!(calls[0].1["container"], "primary");
        assert_eq!(calls[1].1["label"], "Log in user nnnnnnn");
        assert_eq!(calls[1].1["target"], "button");
        assert_eq!(calls[1].1["container"], "login");
    }

    #[test]
    fn test_excluded_and_untracked_elements_dropped() {
        let doc = page();
        let (c, handler) = consumer(EventFilter::All);
        let mut collector = register(
            TrackerOptions::new()
                .with_consumer(c)
                .with_targets(vec![Target::new("field", "input", "click")]),
        )
        .unwrap();
        collector.track();
        assert_eq!(collector.handle_event(&doc, &DomEvent::click(node(&doc, "input"), 0)), 0);
        assert_eq!(collector.handle_event(&doc, &DomEvent::click(node(&doc, "#submit"), 0)), 0);
        assert_eq!(handler.count(), 0);
    }

    #[test]
    fn test_consumer_filter() {
        let doc = page();
        let (scroll_only, scroll_handler) = consumer(EventFilter::Events(vec!["scroll".into()]));
        let (all, all_handler) = consumer(EventFilter::All);
        let mut collector =
            register(TrackerOptions::new().with_consumer(scroll_only).with_consumer(all)).unwrap();
        collector.track();
        assert_eq!(collector.handle_event(&doc, &DomEvent::click(node(&doc, "#home"), 0)), 1);
        assert_eq!(scroll_handler.count(), 0);
        assert_eq!(all_handler.count(), 1);
    }

    #[test]
    fn test_scroll_distance_reported_once() {
        let mut doc = page();
        let (c, handler) = consumer(EventFilter::All);
        let mut collector = register(
            TrackerOptions::new()
                .with_consumer(c)
                .with_scroll_distances(vec![50.0, 25.0, 75.0]),
        )
        .unwrap();
        collector.track();

        doc.document_element.scroll_top = 300.0; // 30%
        assert_eq!(collector.handle_event(&doc, &DomEvent::scroll(0)), 1);
        doc.document_element.scroll_top = 600.0; // 60%
        assert_eq!(collector.handle_event(&doc, &DomEvent::scroll(1)), 1);
        doc.document_element.scroll_top = 100.0; // back up to 10%
        assert_eq!(collector.handle_event(&doc, &DomEvent::scroll(2)), 0);
        doc.document_element.scroll_top = 1_000.0; // 100%
        assert_eq!(collector.handle_event(&doc, &DomEvent::scroll(3)), 1);
        assert_eq!(collector.handle_event(&doc, &DomEvent::scroll(4)), 0);

        assert_eq!(collector.tracked_scroll_distances(), &[25.0, 50.0, 75.0]);
        let labels: Vec<String> = handler
            .calls()
            .iter()
            .map(|(_, d)| d["label"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            labels,
            vec!["Scroll distance 25%", "Scroll distance 50%", "Scroll distance 75%"]
        );
    }

    #[test]
    fn test_scroll_exactly_at_threshold_not_passed() {
        let mut doc = page();
        let (c, handler) = consumer(EventFilter::All);
        let mut collector =
            register(TrackerOptions::new().with_consumer(c).with_scroll_distances(vec![50.0])).unwrap();
        collector.track();
        doc.document_element.scroll_top = 500.0;
        collector.handle_event(&doc, &DomEvent::scroll(0));
        assert_eq!(handler.count(), 0);
    }

    #[test]
    fn test_debounced_clicks_collapse() {
        let doc = page();
        let (c, handler) = consumer(EventFilter::All);
        let mut collector = register(
            TrackerOptions::new()
                .with_template(TemplateName::Custom)
                .with_consumer(c)
                .with_debounce(Some(DebounceConfig::Single(DebounceRule::new("click", 200)))),
        )
        .unwrap();
        collector.track();

        let home = node(&doc, "#home");
        let submit = node(&doc, "#submit");
        assert_eq!(collector.handle_event(&doc, &DomEvent::click(home, 0)), 0);
        assert_eq!(collector.handle_event(&doc, &DomEvent::click(submit, 100)), 0);
        assert_eq!(collector.advance(&doc, 250), 0);
        assert_eq!(collector.advance(&doc, 300), 1);
        assert_eq!(handler.calls()[0].1["target"], "button");

        // A click after the quiet period fires the held one first.
        collector.handle_event(&doc, &DomEvent::click(home, 400));
        assert_eq!(collector.handle_event(&doc, &DomEvent::click(submit, 700)), 1);
        assert_eq!(collector.flush_pending(&doc), 1);
        assert_eq!(handler.count(), 3);
    }

    #[test]
    fn test_track_twice_is_noop() {
        let (c, _) = consumer(EventFilter::All);
        let mut collector = register(TrackerOptions::new().with_consumer(c)).unwrap();
        collector.track();
        collector.track();
        assert!(collector.is_tracking());
    }
}
