//! Interaction builders: turn a matched element or a scroll position into
//! an [`Interaction`] record.

use kollektor_core::{Container, Document, ElementRef, KollektorResult, SelectorList, Target};

use crate::events::{
    ContainerRef, DomEvent, Interaction, InteractionData, MouseData, ScrollData, TargetRef,
};

/// A target with its selector parsed.
#[derive(Debug, Clone)]
pub struct CompiledTarget {
    pub target: Target,
    pub selector: SelectorList,
}

impl CompiledTarget {
    pub fn compile(target: Target) -> KollektorResult<Self> {
        let selector = SelectorList::parse(&target.selector)?;
        Ok(Self { target, selector })
    }

    /// Selector matches and the optional condition holds.
    pub fn accepts(&self, element: ElementRef<'_>) -> bool {
        self.selector.matches(element)
            && self.target.condition.as_ref().map_or(true, |c| c.test(element))
    }
}

/// A container with its selector parsed.
#[derive(Debug, Clone)]
pub struct CompiledContainer {
    pub container: Container,
    pub selector: SelectorList,
}

impl CompiledContainer {
    pub fn compile(container: Container) -> KollektorResult<Self> {
        let selector = SelectorList::parse(&container.selector)?;
        Ok(Self { container, selector })
    }

    pub fn accepts(&self, element: ElementRef<'_>) -> bool {
        self.selector.matches(element)
            && self.container.condition.as_ref().map_or(true, |c| c.test(element))
    }

    /// The `name_attribute` value when present and non-empty, else the
    /// configured name.
    fn display_name(&self, element: ElementRef<'_>) -> String {
        self.container
            .name_attribute
            .as_deref()
            .and_then(|attr| element.attr(attr))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(&self.container.name)
            .to_string()
    }
}

/// First target, in configuration order, that accepts the element.
pub fn find_target<'t>(targets: &'t [CompiledTarget], element: ElementRef<'_>) -> Option<&'t CompiledTarget> {
    targets.iter().find(|t| t.accepts(element))
}

/// Closest enclosing container of the element, excluding the element itself.
pub fn find_container(containers: &[CompiledContainer], element: ElementRef<'_>) -> Option<ContainerRef> {
    element.ancestors().find_map(|ancestor| {
        containers
            .iter()
            .find(|c| c.accepts(ancestor))
            .map(|c| ContainerRef {
                name: c.display_name(ancestor),
                selector: c.container.selector.clone(),
            })
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Interaction with a tracked element.
pub fn mouse_interaction(
    element: ElementRef<'_>,
    event: &DomEvent,
    target: &CompiledTarget,
    containers: &[CompiledContainer],
) -> Interaction {
    let label = target
        .target
        .label_attribute
        .as_ref()
        .and_then(|source| source.resolve(element))
        .unwrap_or_else(|| element.text_content());
    let identifier = target
        .target
        .identifier_attribute
        .as_ref()
        .and_then(|source| source.resolve(element))
        .or_else(|| element.element_id().map(str::to_string))
        .unwrap_or_default();

    Interaction::new(
        event.kind.clone(),
        event.timestamp_ms,
        InteractionData::Mouse(MouseData {
            label: collapse_whitespace(&label),
            action: event.kind.clone(),
            identifier,
            tag: element.tag().to_string(),
            target: TargetRef {
                name: target.target.name.clone(),
                selector: target.target.selector.clone(),
            },
            container: find_container(containers, element),
            pointer: event.pointer,
        }),
    )
}

/// Interaction for a reached scroll distance.
pub fn scroll_interaction(distance: f64, event: &DomEvent) -> Interaction {
    Interaction::new(
        event.kind.clone(),
        event.timestamp_ms,
        InteractionData::Scroll(ScrollData {
            label: format!("Scroll distance {distance}%"),
            action: "scroll".to_string(),
            distance,
        }),
    )
}

/// How far the document is scrolled, in percent. Falls back to the body's
/// metrics when the document element reports zero. `None` when the document
/// cannot scroll.
pub fn scroll_percentage(doc: &Document) -> Option<f64> {
    let root = doc.document_element;
    let body = doc.body;
    let top = if root.scroll_top != 0.0 { root.scroll_top } else { body.scroll_top };
    let height = if root.scroll_height != 0.0 { root.scroll_height } else { body.scroll_height };
    let range = height - root.client_height;
    if range <= 0.0 || range.is_nan() {
        return None;
    }
    Some(top / range * 100.0)
}
