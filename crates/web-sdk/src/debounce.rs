//! Trailing-edge debounce driven by the host clock.
//!
//! An event is held until `delay_ms` passes without a newer one arriving;
//! a newer event replaces the held one and restarts the delay.

use crate::events::DomEvent;

#[derive(Debug, Clone)]
pub struct Debouncer {
    delay_ms: u64,
    pending: Option<DomEvent>,
}

impl Debouncer {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn pending(&self) -> Option<&DomEvent> {
        self.pending.as_ref()
    }

    fn deadline(&self) -> Option<u64> {
        self.pending
            .as_ref()
            .map(|e| e.timestamp_ms.saturating_add(self.delay_ms))
    }

    /// Hold `event`. A held event that was already due at `event`'s time is
    /// returned so it can fire before the new one replaces it.
    pub fn push(&mut self, event: DomEvent) -> Option<DomEvent> {
        let due = self.take_due(event.timestamp_ms);
        self.pending = Some(event);
        due
    }

    /// Release the held event when its quiet period has elapsed by `now_ms`.
    pub fn take_due(&mut self, now_ms: u64) -> Option<DomEvent> {
        match self.deadline() {
            Some(deadline) if deadline <= now_ms => self.pending.take(),
            _ => None,
        }
    }

    /// Release the held event regardless of time.
    pub fn flush(&mut self) -> Option<DomEvent> {
        self.pending.take()
    }
}
