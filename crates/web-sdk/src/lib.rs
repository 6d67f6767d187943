//! Kollektor tracker: click and scroll interaction tracking over a host
//! document, with privacy masking, debouncing and field-mapped forwarding to
//! consumer callbacks.
//!
//! # Modules
//!
//! - [`events`]: Host events and interaction records
//! - [`collector`]: Registration, tracking and consumer forwarding
//! - [`global`]: Per-thread singleton accessor
//! - [`listeners`]: Per-event listener registry with debounce
//! - [`interactions`]: Target/container resolution and interaction builders
//! - [`mapping`]: Dot-path mapping into consumer objects
//! - [`privacy`]: Digit masking and element exclusion
//! - [`adaptors`]: Consumer adaptors (GTM, GA4)

pub mod adaptors;
pub mod collector;
pub mod debounce;
pub mod events;
pub mod global;
pub mod interactions;
pub mod listeners;
pub mod mapping;
pub mod privacy;

pub use adaptors::ga::{GaAdaptor, GaConfig};
pub use adaptors::gtm::{GtmAdaptor, GtmConfig};
pub use adaptors::{adaptor_consumer, AdaptorHandler, ConsumerAdaptor, DataLayer};
pub use collector::{register, validate_options, Collector};
pub use events::{DomEvent, Interaction, InteractionData, PointerPosition};
pub use privacy::PrivacyManager;
