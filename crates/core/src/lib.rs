pub mod config;
pub mod configuration;
pub mod consumer;
pub mod dom;
pub mod error;
pub mod options;
pub mod selector;
pub mod templates;

pub use config::AppConfig;
pub use configuration::Configuration;
pub use consumer::ConsumerHandler;
pub use dom::{Document, ElementRef, NodeId, NodeSpec, ScrollMetrics};
pub use error::{KollektorError, KollektorResult};
pub use options::{
    Condition, Consumer, Container, DebounceConfig, DebounceRule, EventFilter, EventList,
    PrivacySettings, Target, TemplateName, TrackerOptions, ValueSource, ALL_EVENTS,
};
pub use selector::SelectorList;
