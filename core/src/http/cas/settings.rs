//! Runtime feature gate for the CAS bridge.
//!
//! Everything defaults to off. With `enabled == false` every entry point
//! falls back to the application's own login flow and no CAS URL is ever
//! contacted.

use std::collections::HashMap;

/// CAS bridge settings.
///
/// # Example
/// ```
/// use actix_cas_core::http::cas::CasSettings;
///
/// let settings = CasSettings::new()
///     .enabled(true)
///     .autocreate(true)
///     .extra_attribute("firstname")
///     .extra_attribute("mail")
///     .default_language("en");
///
/// assert!(settings.is_enabled());
/// assert!(!settings.single_sign_out_enabled());
/// ```
#[derive(Debug, Clone)]
pub struct CasSettings {
    enabled: bool,
    autocreate: bool,
    single_sign_out: bool,
    extra_attributes: Vec<String>,
    default_language: String,
}

impl Default for CasSettings {
    fn default() -> Self {
        CasSettings {
            enabled: false,
            autocreate: false,
            single_sign_out: false,
            extra_attributes: Vec::new(),
            default_language: "en".to_string(),
        }
    }
}

impl CasSettings {
    /// Creates settings with every feature disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns the whole bridge on or off (builder pattern).
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Allows unknown principals to self-register (builder pattern).
    pub fn autocreate(mut self, autocreate: bool) -> Self {
        self.autocreate = autocreate;
        self
    }

    /// Accepts server-initiated logout notifications (builder pattern).
    ///
    /// Turning this on also switches session establishment to `Preserve`
    /// mode so the notification can be correlated with the session it
    /// should terminate.
    pub fn single_sign_out(mut self, single_sign_out: bool) -> Self {
        self.single_sign_out = single_sign_out;
        self
    }

    /// Adds one attribute name to import from validation responses
    /// (builder pattern).
    pub fn extra_attribute(mut self, name: &str) -> Self {
        self.extra_attributes.push(name.to_string());
        self
    }

    /// Replaces the list of attribute names to import (builder pattern).
    pub fn extra_attributes(mut self, names: &[&str]) -> Self {
        self.extra_attributes = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Sets the language assigned to auto-provisioned users when the
    /// registration form leaves it blank (builder pattern).
    pub fn default_language(mut self, language: &str) -> Self {
        self.default_language = language.to_string();
        self
    }

    /// Returns whether the bridge is active at all.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns whether unknown principals may self-register.
    pub fn autocreate_enabled(&self) -> bool {
        self.autocreate
    }

    /// Returns whether single-sign-out notifications are honored.
    pub fn single_sign_out_enabled(&self) -> bool {
        self.single_sign_out
    }

    /// Returns the configured attribute import list.
    pub fn get_extra_attributes(&self) -> &[String] {
        &self.extra_attributes
    }

    /// Returns the fallback language for provisioned users.
    pub fn get_default_language(&self) -> &str {
        &self.default_language
    }

    /// Filters a validation response's attribute map down to the
    /// configured import list. Names without a value simply stay absent.
    pub fn extra_attributes_from(
        &self,
        attributes: &HashMap<String, String>,
    ) -> HashMap<String, String> {
        self.extra_attributes
            .iter()
            .filter_map(|name| {
                attributes
                    .get(name)
                    .map(|value| (name.clone(), value.clone()))
            })
            .collect()
    }
}
