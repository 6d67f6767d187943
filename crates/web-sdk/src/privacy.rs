//! Privacy manager: digit-run masking of collected strings and selector
//! based exclusion of elements.

use std::borrow::Cow;

use regex::{Captures, Regex};

use kollektor_core::{ElementRef, KollektorError, KollektorResult, PrivacySettings, SelectorList};

pub struct PrivacyManager {
    settings: PrivacySettings,
    digit_run: Regex,
    excluded: Vec<SelectorList>,
}

impl PrivacyManager {
    pub fn new(settings: PrivacySettings) -> KollektorResult<Self> {
        let digit_run = Regex::new(&format!("[0-9]{{{},}}", settings.limit.max(1))).map_err(|e| {
            KollektorError::Config(format!("invalid privacy limit {}: {e}", settings.limit))
        })?;
        let excluded = settings
            .excluded_selectors
            .iter()
            .map(|s| SelectorList::parse(s))
            .collect::<KollektorResult<Vec<_>>>()?;
        Ok(Self {
            settings,
            digit_run,
            excluded,
        })
    }

    pub fn settings(&self) -> &PrivacySettings {
        &self.settings
    }

    /// Replace every digit of a number with `n` when the number has at least
    /// `limit` digits, e.g. `id_12345678` → `id_nnnnnnnn`. Returns the input
    /// unchanged when masking is off.
    pub fn mask_long_numbers<'a>(&self, value: &'a str) -> Cow<'a, str> {
        if !self.settings.masking {
            return Cow::Borrowed(value);
        }
        self.digit_run
            .replace_all(value, |caps: &Captures<'_>| "n".repeat(caps[0].len()))
    }

    /// True when the element matches any excluded selector.
    pub fn is_element_excluded(&self, element: ElementRef<'_>) -> bool {
        self.excluded.iter().any(|s| s.matches(element))
    }
}
