//! Listener registry: one interaction listener per event name with the
//! combined selectors of every target tracking that event, plus an optional
//! scroll listener, each optionally debounced.

use tracing::debug;

use kollektor_core::{DebounceConfig, Document, ElementRef, SelectorList};

use crate::debounce::Debouncer;
use crate::events::DomEvent;
use crate::interactions::CompiledTarget;

pub const SCROLL_EVENT: &str = "scroll";

#[derive(Debug, Clone)]
pub struct InteractionListener {
    pub event: String,
    pub selectors: SelectorList,
    debouncer: Option<Debouncer>,
}

impl InteractionListener {
    pub fn debounce_delay(&self) -> Option<u64> {
        self.debouncer.as_ref().map(Debouncer::delay_ms)
    }

    /// Walk from the event target through its ancestors and return the first
    /// element matching this listener's selectors.
    pub fn find_match<'d>(&self, doc: &'d Document, event: &DomEvent) -> Option<ElementRef<'d>> {
        doc.element(event.target?)?
            .self_and_ancestors()
            .find(|el| self.selectors.matches(*el))
    }
}

#[derive(Debug, Clone)]
pub struct ScrollListener {
    debouncer: Option<Debouncer>,
}

impl ScrollListener {
    pub fn debounce_delay(&self) -> Option<u64> {
        self.debouncer.as_ref().map(Debouncer::delay_ms)
    }
}

/// A listener invocation ready to run.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Index into [`ListenerRegistry::interaction_listeners`].
    Interaction(usize, DomEvent),
    Scroll(DomEvent),
}

impl Dispatch {
    fn timestamp_ms(&self) -> u64 {
        match self {
            Dispatch::Interaction(_, e) | Dispatch::Scroll(e) => e.timestamp_ms,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListenerRegistry {
    interaction: Vec<InteractionListener>,
    scroll: Option<ScrollListener>,
}

impl ListenerRegistry {
    /// Group target selectors by event (first-seen order) and attach the
    /// debounce rule governing each event.
    pub fn build(targets: &[CompiledTarget], debounce: Option<&DebounceConfig>, track_scroll: bool) -> Self {
        let mut by_event: Vec<(String, Vec<&SelectorList>)> = Vec::new();
        for compiled in targets {
            for event in compiled.target.events.iter() {
                match by_event.iter_mut().find(|(e, _)| e == event) {
                    Some((_, selectors)) => selectors.push(&compiled.selector),
                    None => by_event.push((event.to_string(), vec![&compiled.selector])),
                }
            }
        }

        let debouncer_for = |event: &str| {
            debounce
                .and_then(|d| d.rule_for(event))
                .map(|rule| Debouncer::new(rule.delay))
        };

        let interaction = by_event
            .into_iter()
            .map(|(event, selectors)| {
                let selectors = SelectorList::union(selectors);
                debug!(event = %event, selectors = %selectors, "interaction listener registered");
                InteractionListener {
                    debouncer: debouncer_for(&event),
                    event,
                    selectors,
                }
            })
            .collect();

        let scroll = track_scroll.then(|| ScrollListener {
            debouncer: debouncer_for(SCROLL_EVENT),
        });

        Self { interaction, scroll }
    }

    pub fn interaction_listeners(&self) -> &[InteractionListener] {
        &self.interaction
    }

    pub fn scroll_listener(&self) -> Option<&ScrollListener> {
        self.scroll.as_ref()
    }

    /// Route an incoming event. Debounced listeners hold it; the rest are
    /// returned for immediate dispatch, along with any held event that had
    /// already come due.
    pub fn accept(&mut self, event: &DomEvent) -> Vec<Dispatch> {
        let mut ready = Vec::new();
        for (idx, listener) in self.interaction.iter_mut().enumerate() {
            if listener.event != event.kind {
                continue;
            }
            match listener.debouncer.as_mut() {
                Some(debouncer) => {
                    if let Some(due) = debouncer.push(event.clone()) {
                        ready.push(Dispatch::Interaction(idx, due));
                    }
                }
                None => ready.push(Dispatch::Interaction(idx, event.clone())),
            }
        }
        if event.kind == SCROLL_EVENT {
            if let Some(listener) = self.scroll.as_mut() {
                match listener.debouncer.as_mut() {
                    Some(debouncer) => {
                        if let Some(due) = debouncer.push(event.clone()) {
                            ready.push(Dispatch::Scroll(due));
                        }
                    }
                    None => ready.push(Dispatch::Scroll(event.clone())),
                }
            }
        }
        ready
    }

    /// Held events whose quiet period elapsed by `now_ms`, oldest first.
    pub fn take_due(&mut self, now_ms: u64) -> Vec<Dispatch> {
        self.drain(|d| d.take_due(now_ms))
    }

    /// Every held event, oldest first.
    pub fn take_all(&mut self) -> Vec<Dispatch> {
        self.drain(Debouncer::flush)
    }

    fn drain(&mut self, mut release: impl FnMut(&mut Debouncer) -> Option<DomEvent>) -> Vec<Dispatch> {
        let mut ready: Vec<Dispatch> = self
            .interaction
            .iter_mut()
            .enumerate()
            .filter_map(|(idx, l)| {
                l.debouncer
                    .as_mut()
                    .and_then(&mut release)
                    .map(|e| Dispatch::Interaction(idx, e))
            })
            .collect();
        if let Some(event) = self
            .scroll
            .as_mut()
            .and_then(|l| l.debouncer.as_mut())
            .and_then(&mut release)
        {
            ready.push(Dispatch::Scroll(event));
        }
        ready.sort_by_key(Dispatch::timestamp_ms);
        ready
    }

    pub fn has_pending(&self) -> bool {
        self.interaction
            .iter()
            .filter_map(|l| l.debouncer.as_ref())
            .chain(self.scroll.as_ref().and_then(|l| l.debouncer.as_ref()))
            .any(|d| d.pending().is_some())
    }
}
