//! Per-thread collector instance.
//!
//! The host drives tracking from a single event loop, so the shared instance
//! lives in thread-local storage rather than behind a lock.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::error;

use kollektor_core::{KollektorResult, TrackerOptions};

use crate::collector::{self, Collector};

pub type SharedCollector = Rc<RefCell<Collector>>;

thread_local! {
    static INSTANCE: RefCell<Option<SharedCollector>> = const { RefCell::new(None) };
}

/// Create the thread's collector on first call. Later calls still validate
/// `options` but return the existing instance unchanged.
pub fn register(options: TrackerOptions) -> KollektorResult<SharedCollector> {
    if let Some(existing) = INSTANCE.with(|slot| slot.borrow().clone()) {
        collector::validate_options(&options)?;
        return Ok(existing);
    }
    let created = Rc::new(RefCell::new(collector::register(options)?));
    INSTANCE.with(|slot| *slot.borrow_mut() = Some(created.clone()));
    Ok(created)
}

/// The thread's collector, if one was registered.
pub fn instance() -> Option<SharedCollector> {
    let current = INSTANCE.with(|slot| slot.borrow().clone());
    if current.is_none() {
        error!("no collector registered, call register first");
    }
    current
}

/// Drop the thread's collector so the next `register` builds a fresh one.
pub fn unregister() -> Option<SharedCollector> {
    INSTANCE.with(|slot| slot.borrow_mut().take())
}
