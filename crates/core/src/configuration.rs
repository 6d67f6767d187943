//! Resolved tracker configuration: user options merged over a template.

use crate::options::{
    Consumer, Container, DebounceConfig, PrivacySettings, Target, TemplateName, TrackerOptions,
};
use crate::templates;

#[derive(Debug, Clone)]
pub struct Configuration {
    pub template: TemplateName,
    pub is_debug: bool,
    pub privacy: PrivacySettings,
    pub debounce: Option<DebounceConfig>,
    pub targets: Vec<Target>,
    pub containers: Vec<Container>,
    pub consumers: Vec<Consumer>,
    /// Ascending and de-duplicated.
    pub scroll_distances: Vec<f64>,
}

impl Configuration {
    /// Merge `options` over the template they name. Per field the user value
    /// wins, otherwise the template's. Consumers never come from a template.
    pub fn resolve(options: TrackerOptions) -> Self {
        let template = options.template.unwrap_or_default();
        if template == TemplateName::Custom {
            return Self::resolve_custom(options);
        }

        let TrackerOptions {
            is_debug,
            debounce,
            privacy,
            targets,
            containers,
            consumers,
            scroll_distances,
            ..
        } = options;
        let base = templates::template(template);

        Self {
            template: base.template,
            is_debug: is_debug.unwrap_or(false) || base.is_debug,
            privacy: privacy.unwrap_or(base.privacy),
            // An explicit null does not clear a template's debounce.
            debounce: debounce.flatten().or(base.debounce),
            targets: targets.unwrap_or(base.targets),
            containers: containers.unwrap_or(base.containers),
            consumers: consumers.unwrap_or_default(),
            scroll_distances: normalize_distances(scroll_distances.unwrap_or(base.scroll_distances)),
        }
    }

    /// `custom` starts from the default template; an explicit null debounce
    /// disables debouncing.
    fn resolve_custom(options: TrackerOptions) -> Self {
        let TrackerOptions {
            is_debug,
            debounce,
            privacy,
            targets,
            containers,
            consumers,
            scroll_distances,
            ..
        } = options;
        let base = templates::default_template();

        Self {
            template: TemplateName::Custom,
            is_debug: is_debug.unwrap_or(false) || base.is_debug,
            privacy: privacy.unwrap_or(base.privacy),
            debounce: match debounce {
                Some(explicit) => explicit,
                None => base.debounce,
            },
            targets: targets.unwrap_or(base.targets),
            containers: containers.unwrap_or(base.containers),
            consumers: consumers.unwrap_or_default(),
            scroll_distances: normalize_distances(scroll_distances.unwrap_or(base.scroll_distances)),
        }
    }
}

fn normalize_distances(mut distances: Vec<f64>) -> Vec<f64> {
    distances.sort_by(f64::total_cmp);
    distances.dedup();
    distances
}
