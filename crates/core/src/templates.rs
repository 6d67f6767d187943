//! Built-in configuration templates.

use crate::configuration::Configuration;
use crate::options::{
    Container, DebounceConfig, DebounceRule, PrivacySettings, Target, TemplateName, ValueSource,
};

/// Resolve a template name to its configuration. `Custom` starts from the
/// default template.
pub fn template(name: TemplateName) -> Configuration {
    match name {
        TemplateName::Bootstrap4 => bootstrap4_template(),
        TemplateName::Default | TemplateName::Custom => default_template(),
    }
}

fn default_privacy() -> PrivacySettings {
    PrivacySettings {
        masking: true,
        limit: 5,
        excluded_selectors: vec![
            "input[type='password']".to_string(),
            "[data-kollektor-ignore]".to_string(),
        ],
    }
}

/// Plain HTML: links, buttons and the landmark regions around them.
pub fn default_template() -> Configuration {
    Configuration {
        template: TemplateName::Default,
        is_debug: false,
        privacy: default_privacy(),
        debounce: None,
        targets: vec![
            Target::new("link", "a[href]", "click").with_identifier(ValueSource::attribute("href")),
            Target::new(
                "button",
                "button, [role='button'], input[type='submit'], input[type='button']",
                "click",
            ),
        ],
        containers: vec![
            Container::new("header", "header"),
            Container::new("navigation", "nav").with_name_attribute("aria-label"),
            Container::new("main", "main"),
            Container::new("form", "form").with_name_attribute("name"),
            Container::new("footer", "footer"),
        ],
        consumers: Vec::new(),
        scroll_distances: vec![25.0, 50.0, 75.0, 90.0],
    }
}

/// Bootstrap 4 component classes.
pub fn bootstrap4_template() -> Configuration {
    let mut privacy = default_privacy();
    privacy.excluded_selectors.push(".modal input".to_string());

    Configuration {
        template: TemplateName::Bootstrap4,
        is_debug: false,
        privacy,
        debounce: Some(DebounceConfig::Single(DebounceRule::new("scroll", 200))),
        targets: vec![
            Target::new("button", ".btn", "click"),
            Target::new("nav link", ".nav-link", "click").with_identifier(ValueSource::attribute("href")),
            Target::new("dropdown item", ".dropdown-item", "click"),
            Target::new("list group item", ".list-group-item-action", "click"),
            Target::new("card link", ".card-link", "click").with_identifier(ValueSource::attribute("href")),
            Target::new("navbar brand", ".navbar-brand", "click"),
        ],
        containers: vec![
            Container::new("navbar", ".navbar"),
            Container::new("modal", ".modal").with_name_attribute("aria-labelledby"),
            Container::new("dropdown", ".dropdown"),
            Container::new("card", ".card"),
            Container::new("tab", ".tab-pane").with_name_attribute("id"),
            Container::new("jumbotron", ".jumbotron"),
        ],
        consumers: Vec::new(),
        scroll_distances: vec![25.0, 50.0, 75.0, 90.0],
    }
}
