//! Maps validated principals onto local user records.
//!
//! Resolution is a pure function of the principal, the store's state and
//! the autocreate flag. The registration sub-flow lives here too: it is
//! the only path that writes to the store, and it never trusts the
//! submitted login or admin fields.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::http::cas::store::{StoreError, UserStore};
use crate::http::cas::user::CasUser;

/// What a principal resolved to.
#[derive(Debug)]
pub enum Resolution {
    /// Active local user; login may proceed.
    Found(CasUser),
    /// A record exists but is not active.
    Pending(CasUser),
    /// No record, autocreate on: registration form pre-filled from the
    /// principal and imported attributes.
    NeedsRegistration(CasUser),
    /// No record, autocreate off.
    NotFound,
}

/// Registration submission.
///
/// `login` and `admin` are accepted in the payload but never read:
/// the login always comes from the validated principal and provisioned
/// accounts are never administrators.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub admin: Option<bool>,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub mail: String,
    #[serde(default)]
    pub language: Option<String>,
}

impl RegistrationForm {
    /// Returns every validation failure, not just the first.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.firstname.trim().is_empty() {
            errors.push("first name is required".to_string());
        }
        if self.lastname.trim().is_empty() {
            errors.push("last name is required".to_string());
        }
        let mail = self.mail.trim();
        if mail.is_empty() {
            errors.push("email is required".to_string());
        } else if !mail_is_plausible(mail) {
            errors.push("email is invalid".to_string());
        }
        errors
    }
}

// One `@` with something on both sides and no whitespace. Deliverability
// is the mail server's problem.
fn mail_is_plausible(mail: &str) -> bool {
    if mail.contains(char::is_whitespace) {
        return false;
    }
    match mail.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

/// Recoverable registration failure: the form is re-rendered with these
/// messages and the user may correct and resubmit.
#[derive(Debug)]
pub struct RegistrationError {
    errors: Vec<String>,
}

impl RegistrationError {
    pub fn new(errors: Vec<String>) -> Self {
        RegistrationError { errors }
    }

    pub fn get_errors(&self) -> &[String] {
        &self.errors
    }
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.errors.join("; "))
    }
}

impl std::error::Error for RegistrationError {}

/// Resolves principals against a [`UserStore`].
pub struct IdentityResolver<S: UserStore> {
    store: Arc<S>,
    default_language: String,
}

impl<S: UserStore> IdentityResolver<S> {
    pub fn new(store: Arc<S>, default_language: &str) -> Self {
        IdentityResolver {
            store,
            default_language: default_language.to_string(),
        }
    }

    /// Decides what to do with a validated principal.
    pub async fn resolve(
        &self,
        principal: &str,
        extras: &HashMap<String, String>,
        autocreate: bool,
    ) -> Result<Resolution, StoreError> {
        match self.store.find_by_login(principal).await? {
            Some(user) if user.is_active() => Ok(Resolution::Found(user)),
            Some(user) => Ok(Resolution::Pending(user)),
            None if autocreate => Ok(Resolution::NeedsRegistration(
                self.prefill(principal, extras),
            )),
            None => Ok(Resolution::NotFound),
        }
    }

    /// Builds the candidate record the registration form is seeded from.
    ///
    /// Imported attributes land in the attribute map, except `language`
    /// which maps onto the language field. `login` and `admin` extras
    /// are discarded: those fields are forced.
    pub fn prefill(&self, principal: &str, extras: &HashMap<String, String>) -> CasUser {
        let mut attributes = extras.clone();
        attributes.remove("login");
        attributes.remove("admin");
        let language = attributes
            .remove("language")
            .unwrap_or_else(|| self.default_language.clone());

        CasUser::new(principal)
            .language(&language)
            .attributes(attributes)
    }

    /// Creates and activates a local account for `principal` from a form
    /// submission.
    pub async fn register(
        &self,
        principal: &str,
        form: &RegistrationForm,
        extras: &HashMap<String, String>,
    ) -> Result<CasUser, RegistrationError> {
        let errors = form.validate();
        if !errors.is_empty() {
            return Err(RegistrationError::new(errors));
        }

        let language = form
            .language
            .as_deref()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or(&self.default_language)
            .to_string();

        // login comes from the principal and admin stays false, whatever
        // the submission claimed
        let user = self
            .prefill(principal, extras)
            .language(&language)
            .attribute("firstname", form.firstname.trim())
            .attribute("lastname", form.lastname.trim())
            .attribute("mail", form.mail.trim())
            .activate();

        match self.store.create(&user).await {
            Ok(()) => Ok(user),
            // lost a race with a concurrent registration of the same
            // principal: recoverable, like any validation failure
            Err(StoreError::AlreadyExists) => Err(RegistrationError::new(vec![
                "an account with this login already exists".to_string(),
            ])),
            Err(other) => Err(RegistrationError::new(vec![other.to_string()])),
        }
    }
}
