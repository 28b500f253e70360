//! Post-login redirect sanitizer.
//!
//! The `ref` query parameter names where the user wanted to go before
//! being bounced to CAS. It is attacker-controllable, so anything that
//! could escape the local site is discarded in favor of the configured
//! default.

use regex::Regex;

/// Decides where a finished login may redirect to.
///
/// Candidates carrying a scheme (`http://` / `https://`) or a `@` (the
/// userinfo trick, `/@evil.example`) are rejected outright; everything
/// else is treated as a local path and resolved against the base URL.
#[derive(Debug, Clone)]
pub struct RedirectPolicy {
    default_url: String,
    base_url: String,
    reject: Regex,
}

impl RedirectPolicy {
    /// Creates a policy sending rejected/absent candidates to
    /// `default_url` and resolving accepted ones against `base_url`.
    pub fn new(default_url: &str, base_url: &str) -> Self {
        RedirectPolicy {
            default_url: default_url.to_string(),
            base_url: base_url.to_string(),
            // Compiled once; the pattern is a constant so this cannot fail.
            reject: Regex::new(r"https?://|@").unwrap(),
        }
    }

    /// Returns the final redirect target for a candidate `ref` value.
    ///
    /// An empty candidate is accepted like any other local path and
    /// resolves to the bare base URL.
    pub fn sanitize(&self, candidate: Option<&str>) -> String {
        match candidate {
            Some(target) if !self.reject.is_match(target) => {
                format!("{}{}", self.base_url, target)
            }
            _ => self.default_url.clone(),
        }
    }

    /// Returns the fallback target.
    pub fn get_default_url(&self) -> &str {
        &self.default_url
    }

    /// Returns the base URL local paths resolve against.
    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}
