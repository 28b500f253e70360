//! Local user model for CAS-authenticated accounts.
//!
//! A `CasUser` is the local record a validated CAS principal resolves to.
//! Unlike password-backed user models it carries no credential at all:
//! authentication always happens at the external CAS server, so the local
//! record only holds identity, preferences and lifecycle state.

use std::collections::HashMap;
use std::fmt;

/// Lifecycle state of a local user record.
///
/// Auto-provisioned users start out `Unregistered` while the registration
/// form is being filled in, and are activated in the same flow once the
/// submission validates. `Locked` covers accounts an administrator has
/// deactivated after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserStatus {
    /// Record exists (or is being built) but registration never completed.
    #[default]
    Unregistered,
    /// Fully registered and allowed to log in.
    Active,
    /// Deactivated; login is refused with a "pending" style rejection.
    Locked,
}

/// A local user record keyed by login name.
///
/// # Example
/// ```
/// use actix_cas_core::http::cas::{CasUser, UserStatus};
///
/// let user = CasUser::new("alice")
///     .language("en")
///     .attribute("mail", "alice@example.com")
///     .activate();
///
/// assert!(user.is_active());
/// assert!(!user.is_admin());
/// ```
#[derive(Debug, Clone)]
pub struct CasUser {
    login: String,
    admin: bool,
    language: String,
    status: UserStatus,
    last_login_on: Option<u64>,
    attributes: HashMap<String, String>,
}

impl CasUser {
    /// Creates a new, unregistered, non-admin user with the given login.
    pub fn new(login: &str) -> Self {
        CasUser {
            login: login.to_string(),
            admin: false,
            language: String::new(),
            status: UserStatus::Unregistered,
            last_login_on: None,
            attributes: HashMap::new(),
        }
    }

    /// Sets the admin flag (builder pattern).
    ///
    /// Provisioning flows never call this with `true`; it exists so that
    /// seeded/administrative stores can represent existing admins.
    pub fn admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    /// Sets the locale/language preference (builder pattern).
    pub fn language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    /// Adds a single profile attribute (builder pattern).
    pub fn attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    /// Merges a map of profile attributes (builder pattern).
    pub fn attributes(mut self, attributes: HashMap<String, String>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    /// Marks the user active (builder pattern).
    pub fn activate(mut self) -> Self {
        self.status = UserStatus::Active;
        self
    }

    /// Marks the user locked (builder pattern).
    pub fn lock(mut self) -> Self {
        self.status = UserStatus::Locked;
        self
    }

    /// Records a successful login at `timestamp` (seconds since epoch).
    pub fn touch_login(&mut self, timestamp: u64) {
        self.last_login_on = Some(timestamp);
    }

    /// Returns the login name.
    pub fn get_login(&self) -> &str {
        &self.login
    }

    /// Returns whether this user is an administrator.
    pub fn is_admin(&self) -> bool {
        self.admin
    }

    /// Returns whether this user may log in.
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// Returns the lifecycle status.
    pub fn get_status(&self) -> UserStatus {
        self.status
    }

    /// Returns the locale/language preference.
    pub fn get_language(&self) -> &str {
        &self.language
    }

    /// Returns the last successful login, seconds since epoch.
    pub fn get_last_login_on(&self) -> Option<u64> {
        self.last_login_on
    }

    /// Returns all profile attributes.
    pub fn get_attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    /// Returns a single profile attribute.
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|v| v.as_str())
    }
}

impl fmt::Display for CasUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CasUser {{ login: {}, status: {:?}, admin: {} }}",
            self.login, self.status, self.admin
        )
    }
}
