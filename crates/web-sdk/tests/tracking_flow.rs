//! Integration test for the register → track → interact → forward flow on a
//! Bootstrap-style page.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use kollektor_core::consumer::{capture_handler, CaptureHandler};
    use kollektor_core::{
        Consumer, Container, DebounceConfig, DebounceRule, Document, EventFilter, NodeId,
        NodeSpec, PrivacySettings, ScrollMetrics, Target, TemplateName, TrackerOptions,
        ValueSource,
    };
    use kollektor_web_sdk::{
        adaptor_consumer, global, register, DataLayer, DomEvent, GtmAdaptor, GtmConfig,
    };

    /// A navbar, a signup modal and an article card.
    fn sample_page() -> Document {
        let mut doc = Document::from_spec(
            &NodeSpec::new("html").child(
                NodeSpec::new("body")
                    .child(
                        NodeSpec::new("nav").class("navbar").child(
                            NodeSpec::new("a")
                                .class("nav-link")
                                .attr("href", "/pricing")
                                .child(NodeSpec::new("span").text("Pricing")),
                        ),
                    )
                    .child(
                        NodeSpec::new("div")
                            .class("modal")
                            .attr("aria-labelledby", "signup")
                            .child(NodeSpec::new("input").attr("name", "email"))
                            .child(NodeSpec::new("button").class("btn").id("join").text("Join")),
                    )
                    .child(
                        NodeSpec::new("div").class("card").child(
                            NodeSpec::new("a")
                                .class("card-link")
                                .attr("href", "/orders/1234567")
                                .text("Order 1234567"),
                        ),
                    ),
            ),
        )
        .unwrap();
        doc.document_element = ScrollMetrics {
            scroll_top: 0.0,
            scroll_height: 3_000.0,
            client_height: 1_000.0,
        };
        doc
    }

    fn node(doc: &Document, selector: &str) -> NodeId {
        doc.query_selector(selector).unwrap().unwrap().id()
    }

    fn analytics_consumer(events: EventFilter) -> (Consumer, Arc<CaptureHandler>) {
        let handler = capture_handler();
        let consumer = Consumer::new(
            "analytics",
            events,
            [
                ("eventCategory", "data.container.name"),
                ("eventAction", "event_type"),
                ("eventLabel", "data.label"),
                ("identifier", "data.identifier"),
                ("target", "data.target.name"),
            ],
            handler.clone(),
        );
        (consumer, handler)
    }

    #[test]
    fn test_bootstrap_click_flow() {
        let doc = sample_page();
        let (consumer, handler) = analytics_consumer(EventFilter::Events(vec!["click".into()]));
        let mut collector = register(
            TrackerOptions::new()
                .with_template(TemplateName::Bootstrap4)
                .with_consumer(consumer),
        )
        .unwrap();
        collector.track();

        collector.handle_event(&doc, &DomEvent::click(node(&doc, "span"), 10));
        collector.handle_event(&doc, &DomEvent::click(node(&doc, "#join"), 20));
        collector.handle_event(&doc, &DomEvent::click(node(&doc, ".card-link"), 30));
        // Not a target in this template.
        collector.handle_event(&doc, &DomEvent::click(node(&doc, "input"), 40));

        let calls = handler.calls();
        assert_eq!(calls.len(), 3);

        assert_eq!(calls[0].1["eventCategory"], "navbar");
        assert_eq!(calls[0].1["eventLabel"], "Pricing");
        assert_eq!(calls[0].1["identifier"], "/pricing");
        assert_eq!(calls[0].1["target"], "nav link");

        assert_eq!(calls[1].1["eventCategory"], "signup");
        assert_eq!(calls[1].1["identifier"], "join");

        assert_eq!(calls[2].1["eventCategory"], "card");
        assert_eq!(calls[2].1["eventLabel"], "Order nnnnnnn");
        assert_eq!(calls[2].1["identifier"], "/orders/nnnnnnn");
    }

    #[test]
    fn test_scroll_thresholds_with_template_debounce() {
        let mut doc = sample_page();
        let (consumer, handler) = analytics_consumer(EventFilter::All);
        let mut collector = register(
            TrackerOptions::new()
                .with_template(TemplateName::Bootstrap4)
                .with_consumer(consumer)
                .with_scroll_distances(vec![75.0, 25.0, 50.0, 25.0]),
        )
        .unwrap();
        collector.track();

        // Bootstrap debounces scroll by 200ms: a burst reports once.
        doc.document_element.scroll_top = 600.0; // 30%
        assert_eq!(collector.handle_event(&doc, &DomEvent::scroll(0)), 0);
        doc.document_element.scroll_top = 1_200.0; // 60%
        assert_eq!(collector.handle_event(&doc, &DomEvent::scroll(50)), 0);
        assert_eq!(collector.advance(&doc, 200), 0);
        assert_eq!(collector.advance(&doc, 250), 2);

        // Scrolling back up and down again does not repeat thresholds.
        doc.document_element.scroll_top = 100.0;
        collector.handle_event(&doc, &DomEvent::scroll(1_000));
        doc.document_element.scroll_top = 1_900.0; // 95%
        collector.handle_event(&doc, &DomEvent::scroll(1_100));
        collector.flush_pending(&doc);

        assert_eq!(collector.tracked_scroll_distances(), &[25.0, 50.0, 75.0]);
        let labels: Vec<_> = handler
            .calls()
            .into_iter()
            .map(|(event, data)| {
                assert_eq!(event, "scroll");
                data["eventLabel"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(
            labels,
            ["Scroll distance 25%", "Scroll distance 50%", "Scroll distance 75%"]
        );
    }

    #[test]
    fn test_custom_template_with_privacy_exclusion() {
        let doc = sample_page();
        let (consumer, handler) = analytics_consumer(EventFilter::All);
        let mut collector = register(
            TrackerOptions::new()
                .with_template(TemplateName::Custom)
                .with_consumer(consumer)
                .with_debounce(Some(DebounceConfig::PerEvent(vec![DebounceRule::new(
                    "mouseover",
                    100,
                )])))
                .with_privacy(PrivacySettings {
                    masking: false,
                    limit: 5,
                    excluded_selectors: vec![".modal *".into()],
                })
                .with_targets(vec![
                    Target::new("any link", "a, button", vec!["click", "mouseover"])
                        .with_label(ValueSource::attribute("href")),
                ])
                .with_containers(vec![Container::new("page", "body")]),
        )
        .unwrap();
        collector.track();

        // Excluded by privacy.
        assert_eq!(collector.handle_event(&doc, &DomEvent::click(node(&doc, "#join"), 0)), 0);

        let link = node(&doc, ".card-link");
        assert_eq!(collector.handle_event(&doc, &DomEvent::click(link, 10)), 1);
        assert_eq!(collector.handle_event(&doc, &DomEvent::new("mouseover", Some(link), 20)), 0);
        assert_eq!(collector.advance(&doc, 120), 1);

        let calls = handler.calls();
        assert_eq!(calls[0].1["eventLabel"], "/orders/1234567");
        assert_eq!(calls[0].1["eventCategory"], "page");
        assert_eq!(calls[1].0, "mouseover");
    }

    #[test]
    fn test_gtm_adaptor_consumer() {
        let doc = sample_page();
        let layer = DataLayer::new();
        let consumer = adaptor_consumer(
            "gtm",
            EventFilter::All,
            [("eventLabel", "data.label"), ("eventCategory", "data.container.name")],
            GtmAdaptor::new(GtmConfig {
                container_id: "GTM-K0LL3KT".into(),
                event_prefix: Some("kollektor.".into()),
            }),
            layer.clone(),
        )
        .unwrap();

        let mut collector = register(
            TrackerOptions::new()
                .with_template(TemplateName::Bootstrap4)
                .with_consumer(consumer),
        )
        .unwrap();
        collector.track();
        collector.handle_event(&doc, &DomEvent::click(node(&doc, "#join"), 0));

        let pushed = layer.drain();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0]["event"], "kollektor.click");
        assert_eq!(pushed[0]["eventLabel"], "Join");
        assert_eq!(pushed[0]["eventCategory"], "signup");
    }

    #[test]
    fn test_global_instance_flow() {
        global::unregister();
        let doc = sample_page();
        let (consumer, handler) = analytics_consumer(EventFilter::All);
        let options = TrackerOptions::new()
            .with_template(TemplateName::Bootstrap4)
            .with_consumer(consumer);

        let shared = global::register(options.clone()).unwrap();
        shared.borrow_mut().track();

        let again = global::instance().unwrap();
        again
            .borrow_mut()
            .handle_event(&doc, &DomEvent::click(node(&doc, "#join"), 0));
        assert_eq!(handler.count(), 1);

        // A second register hands back the same, already tracking instance.
        assert!(global::register(options).unwrap().borrow().is_tracking());
        global::unregister();
    }
}
