//! CAS entry points.
//!
//! [`CasAuthService`] glues the pieces together: gate check, ticket
//! validation, identity resolution, session establishment and the two
//! logout directions. Applications mount its methods on whatever routes
//! they like; the `test` member shows a complete wiring.

use std::collections::HashMap;
use std::sync::Arc;

use actix_session::Session;
use actix_web::http::header::LOCATION;
use actix_web::{HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::http::cas::audit::{timestamp_secs, AuditLogger, AuthEvent};
use crate::http::cas::redirect::RedirectPolicy;
use crate::http::cas::resolver::{IdentityResolver, RegistrationForm, Resolution};
use crate::http::cas::session::{BindMode, SessionActor, SessionBinder, SessionKeys};
use crate::http::cas::settings::CasSettings;
use crate::http::cas::sign_out::{parse_logout_request, SingleSignOutRegistry};
use crate::http::cas::store::UserStore;
use crate::http::cas::ticket::{TicketValidation, TicketValidator};
use crate::http::cas::user::CasUser;
use crate::http::error::CasError;

// ============================================================================
// URL configuration
// ============================================================================

/// Where the bridge lives and where it sends people.
///
/// # Example
/// ```
/// use actix_cas_core::http::cas::CasUrls;
///
/// let urls = CasUrls::new("http://localhost:8080");
/// assert_eq!(urls.service_url(), "http://localhost:8080/cas");
/// ```
#[derive(Debug, Clone)]
pub struct CasUrls {
    base_url: String,
    cas_path: String,
    register_path: String,
    login_url: String,
    logout_success_url: String,
    default_success_url: String,
    account_url: String,
}

impl CasUrls {
    /// Creates the default layout under `base_url` (no trailing slash).
    pub fn new(base_url: &str) -> Self {
        CasUrls {
            base_url: base_url.trim_end_matches('/').to_string(),
            cas_path: "/cas".to_string(),
            register_path: "/cas/register".to_string(),
            login_url: "/login".to_string(),
            logout_success_url: "/".to_string(),
            default_success_url: "/".to_string(),
            account_url: "/my/account".to_string(),
        }
    }

    /// Path of the CAS callback endpoint (builder pattern).
    pub fn cas_path(mut self, path: &str) -> Self {
        self.cas_path = path.to_string();
        self
    }

    /// Path of the registration endpoint (builder pattern).
    pub fn register_path(mut self, path: &str) -> Self {
        self.register_path = path.to_string();
        self
    }

    /// The application's own login page, used when the bridge is
    /// disabled (builder pattern).
    pub fn login_url(mut self, url: &str) -> Self {
        self.login_url = url.to_string();
        self
    }

    /// Where a finished logout lands (builder pattern).
    pub fn logout_success_url(mut self, url: &str) -> Self {
        self.logout_success_url = url.to_string();
        self
    }

    /// Where a finished login lands when no safe `ref` was given
    /// (builder pattern).
    pub fn default_success_url(mut self, url: &str) -> Self {
        self.default_success_url = url.to_string();
        self
    }

    /// Where freshly registered users land (builder pattern).
    pub fn account_url(mut self, url: &str) -> Self {
        self.account_url = url.to_string();
        self
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }

    pub fn get_cas_path(&self) -> &str {
        &self.cas_path
    }

    pub fn get_register_path(&self) -> &str {
        &self.register_path
    }

    pub fn get_login_url(&self) -> &str {
        &self.login_url
    }

    pub fn get_logout_success_url(&self) -> &str {
        &self.logout_success_url
    }

    pub fn get_default_success_url(&self) -> &str {
        &self.default_success_url
    }

    pub fn get_account_url(&self) -> &str {
        &self.account_url
    }

    /// The absolute service URL tickets are issued for.
    pub fn service_url(&self) -> String {
        format!("{}{}", self.base_url, self.cas_path)
    }
}

// ============================================================================
// Request payloads
// ============================================================================

/// Query parameters the CAS endpoints understand.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CasQuery {
    /// Service ticket appended by the CAS server after authentication.
    #[serde(default)]
    pub ticket: Option<String>,
    /// Where the user wanted to go; passes through the redirect policy.
    #[serde(default, rename = "ref")]
    pub redirect: Option<String>,
}

/// Form body of a single-sign-out notification.
#[derive(Debug, Deserialize)]
pub struct SignOutNotification {
    #[serde(rename = "logoutRequest")]
    pub logout_request: String,
}

enum Established {
    /// A validated principal is on the session.
    Principal(String),
    /// No principal yet; the response sends the user off to get one.
    Redirect(HttpResponse),
}

// ============================================================================
// Service
// ============================================================================

/// The CAS authentication bridge.
pub struct CasAuthService<V: TicketValidator, S: UserStore> {
    settings: CasSettings,
    urls: CasUrls,
    validator: Arc<V>,
    store: Arc<S>,
    resolver: IdentityResolver<S>,
    binder: SessionBinder,
    redirects: RedirectPolicy,
    registry: SingleSignOutRegistry,
    audit: AuditLogger,
}

impl<V: TicketValidator, S: UserStore> CasAuthService<V, S> {
    pub fn new(settings: CasSettings, urls: CasUrls, validator: Arc<V>, store: Arc<S>) -> Self {
        let resolver = IdentityResolver::new(store.clone(), settings.get_default_language());
        let redirects = RedirectPolicy::new(urls.get_default_success_url(), urls.get_base_url());
        CasAuthService {
            settings,
            urls,
            validator,
            store,
            resolver,
            binder: SessionBinder::default(),
            redirects,
            registry: SingleSignOutRegistry::new(),
            audit: AuditLogger::stdout(),
        }
    }

    /// Replaces the audit logger (builder pattern).
    pub fn audit_logger(mut self, audit: AuditLogger) -> Self {
        self.audit = audit;
        self
    }

    /// Replaces the session key names (builder pattern).
    ///
    /// Install the same keys as app data (see [`Self::get_session_keys`])
    /// so the `CasActor` extractor reads the renamed entries too.
    pub fn session_keys(mut self, keys: SessionKeys) -> Self {
        self.binder = SessionBinder::new(keys);
        self
    }

    /// Returns the session key names in use, for installation as app
    /// data alongside the sign-out registry.
    pub fn get_session_keys(&self) -> SessionKeys {
        self.binder.get_keys().clone()
    }

    /// Returns a handle on the sign-out registry, shared with this
    /// service. Install it as app data so the actor extractor can see
    /// terminations.
    pub fn sign_out_registry(&self) -> SingleSignOutRegistry {
        self.registry.clone()
    }

    pub fn get_settings(&self) -> &CasSettings {
        &self.settings
    }

    pub fn get_urls(&self) -> &CasUrls {
        &self.urls
    }

    // ------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------

    /// `GET /cas` — the service URL the CAS server redirects back to.
    pub async fn login(
        &self,
        req: &HttpRequest,
        session: &Session,
        query: &CasQuery,
    ) -> Result<HttpResponse, CasError> {
        if !self.settings.is_enabled() {
            return Ok(redirect(self.urls.get_login_url()));
        }
        if self.current_actor(session).is_some() {
            // already signed in; just honor the ref
            return Ok(redirect(&self.redirects.sanitize(query.redirect.as_deref())));
        }

        let principal = match self.establish(req, session, query).await? {
            Established::Principal(principal) => principal,
            Established::Redirect(response) => return Ok(response),
        };

        let extras = self.binder.extra_attributes(session);
        let resolution = self
            .resolve_or_fail(req, &principal, &extras)
            .await?;

        match resolution {
            Resolution::Found(user) => {
                self.complete_login(req, session, &user).await?;
                Ok(redirect(&self.redirects.sanitize(query.redirect.as_deref())))
            }
            Resolution::NeedsRegistration(_) => Ok(redirect(self.urls.get_register_path())),
            Resolution::Pending(_) => Err(self.refuse_pending(req, &principal)),
            Resolution::NotFound => Err(self.refuse_unknown(req, principal)),
        }
    }

    /// `GET /cas/register` — renders the pre-filled registration form.
    pub async fn register_form(
        &self,
        req: &HttpRequest,
        session: &Session,
        query: &CasQuery,
    ) -> Result<HttpResponse, CasError> {
        if !self.settings.is_enabled() {
            return Ok(redirect(self.urls.get_login_url()));
        }
        if self.current_actor(session).is_some() {
            return Ok(redirect(self.urls.get_account_url()));
        }

        let principal = match self.establish(req, session, query).await? {
            Established::Principal(principal) => principal,
            Established::Redirect(response) => return Ok(response),
        };

        let extras = self.binder.extra_attributes(session);
        match self.resolve_or_fail(req, &principal, &extras).await? {
            Resolution::NeedsRegistration(prefilled) => Ok(self.render_registration(
                prefilled.get_login(),
                prefilled.get_attribute("firstname").unwrap_or(""),
                prefilled.get_attribute("lastname").unwrap_or(""),
                prefilled.get_attribute("mail").unwrap_or(""),
                prefilled.get_language(),
                &[],
            )),
            Resolution::Found(user) => {
                // account appeared since validation; sign in directly
                self.complete_login(req, session, &user).await?;
                Ok(redirect(self.urls.get_account_url()))
            }
            Resolution::Pending(_) => Err(self.refuse_pending(req, &principal)),
            Resolution::NotFound => Err(self.refuse_unknown(req, principal)),
        }
    }

    /// `POST /cas/register` — creates the account and signs the user in.
    pub async fn register_submit(
        &self,
        req: &HttpRequest,
        session: &Session,
        form: &RegistrationForm,
    ) -> Result<HttpResponse, CasError> {
        if !self.settings.is_enabled() {
            return Ok(redirect(self.urls.get_login_url()));
        }
        if self.current_actor(session).is_some() {
            return Ok(redirect(self.urls.get_account_url()));
        }

        // re-entry relies on the principal stored at validation time;
        // the single-use ticket is long gone by now
        let principal = match self.establish(req, session, &CasQuery::default()).await? {
            Established::Principal(principal) => principal,
            Established::Redirect(response) => return Ok(response),
        };

        let extras = self.binder.extra_attributes(session);
        match self.resolve_or_fail(req, &principal, &extras).await? {
            Resolution::NeedsRegistration(_) => {
                match self.resolver.register(&principal, form, &extras).await {
                    Ok(user) => {
                        self.audit.log(
                            AuthEvent::provisioned(user.get_login())
                                .remote_addr(remote_addr(req)),
                        );
                        self.complete_login(req, session, &user).await?;
                        Ok(redirect(self.urls.get_account_url()))
                    }
                    Err(err) => {
                        self.audit.log(AuthEvent::provisioning_failed(
                            &principal,
                            &err.to_string(),
                        ));
                        Ok(self.render_registration(
                            &principal,
                            &form.firstname,
                            &form.lastname,
                            &form.mail,
                            form.language.as_deref().unwrap_or(""),
                            err.get_errors(),
                        ))
                    }
                }
            }
            Resolution::Found(user) => {
                self.complete_login(req, session, &user).await?;
                Ok(redirect(self.urls.get_account_url()))
            }
            Resolution::Pending(_) => Err(self.refuse_pending(req, &principal)),
            Resolution::NotFound => Err(self.refuse_unknown(req, principal)),
        }
    }

    /// `GET /logout` — ends the local session, then the CAS one.
    ///
    /// Local state is dropped first so logout completes even when the
    /// CAS server is unreachable; the remote leg is a plain redirect
    /// that lands back on the logout-success page via the service
    /// parameter.
    pub async fn logout(&self, req: &HttpRequest, session: &Session) -> HttpResponse {
        let actor = self.binder.current_user(session);
        self.binder.logout(session);
        if let Some(actor) = &actor {
            self.audit
                .log(AuthEvent::logout(&actor.login).remote_addr(remote_addr(req)));
        }

        if !self.settings.is_enabled() {
            return redirect(self.urls.get_logout_success_url());
        }
        let back = format!(
            "{}{}",
            self.urls.get_base_url(),
            self.urls.get_logout_success_url()
        );
        redirect(&self.validator.logout_url(&back))
    }

    /// `POST /cas` — single-sign-out notification from the CAS server.
    ///
    /// A body with no `SessionIndex` answers 400 whatever the flags say;
    /// a well-formed notification always answers 200, acknowledged and
    /// ignored when the feature is off.
    pub fn single_sign_out(&self, notification: &SignOutNotification) -> HttpResponse {
        let ticket = match parse_logout_request(&notification.logout_request) {
            Some(ticket) => ticket,
            None => return HttpResponse::BadRequest().finish(),
        };
        if !self.settings.is_enabled() || !self.settings.single_sign_out_enabled() {
            return HttpResponse::Ok().finish();
        }
        let known = self.registry.terminate(&ticket);
        self.audit.log(AuthEvent::single_sign_out(&ticket, known));
        HttpResponse::Ok().finish()
    }

    /// Returns the signed-in actor, purging sessions whose ticket has
    /// been terminated by the CAS server.
    pub fn current_actor(&self, session: &Session) -> Option<SessionActor> {
        let actor = self.binder.current_user(session)?;
        if let Some(ticket) = self.binder.bound_ticket(session) {
            if self.registry.is_terminated(&ticket) {
                self.binder.logout(session);
                return None;
            }
        }
        Some(actor)
    }

    // ------------------------------------------------------------------
    // Flow pieces
    // ------------------------------------------------------------------

    /// Gets a validated principal onto the session, validating the
    /// presented ticket if there is one, or bouncing to the CAS server
    /// if not.
    async fn establish(
        &self,
        req: &HttpRequest,
        session: &Session,
        query: &CasQuery,
    ) -> Result<Established, CasError> {
        if let Some(principal) = self.binder.principal(session) {
            return Ok(Established::Principal(principal));
        }

        let ticket = match query.ticket.as_deref() {
            Some(ticket) if !ticket.is_empty() => ticket,
            _ => {
                let to_cas = self.validator.login_url(&self.urls.service_url());
                return Ok(Established::Redirect(redirect(&to_cas)));
            }
        };

        match self.validator.validate(ticket, &self.urls.service_url()).await {
            TicketValidation::Validated {
                principal,
                attributes,
            } => {
                let extras = self.settings.extra_attributes_from(&attributes);
                self.binder
                    .set_principal(session, &principal, &extras, Some(ticket))
                    .map_err(|_| CasError::Failure)?;
                Ok(Established::Principal(principal))
            }
            TicketValidation::Refused => {
                self.audit
                    .log(AuthEvent::login_refused().remote_addr(remote_addr(req)));
                Err(CasError::Failure)
            }
        }
    }

    async fn resolve_or_fail(
        &self,
        req: &HttpRequest,
        principal: &str,
        extras: &HashMap<String, String>,
    ) -> Result<Resolution, CasError> {
        self.resolver
            .resolve(principal, extras, self.settings.autocreate_enabled())
            .await
            .map_err(|err| {
                self.audit.log(
                    AuthEvent::login_refused()
                        .remote_addr(remote_addr(req))
                        .message(&err.to_string()),
                );
                CasError::Failure
            })
    }

    async fn complete_login(
        &self,
        req: &HttpRequest,
        session: &Session,
        user: &CasUser,
    ) -> Result<(), CasError> {
        self.record_login(user.get_login()).await;
        self.audit.log(
            AuthEvent::login_success(user.get_login()).remote_addr(remote_addr(req)),
        );

        let mode = if self.settings.single_sign_out_enabled() {
            BindMode::Preserve
        } else {
            BindMode::Rotate
        };
        self.binder
            .bind(session, user, mode)
            .map_err(|_| CasError::Failure)?;
        if mode == BindMode::Preserve {
            if let Some(ticket) = self.binder.bound_ticket(session) {
                self.registry.register(&ticket);
            }
        }
        Ok(())
    }

    /// Best-effort last-login stamp; a store hiccup must not fail an
    /// otherwise valid login.
    async fn record_login(&self, login: &str) {
        let _ = self.store.record_login(login, timestamp_secs()).await;
    }

    fn refuse_pending(&self, req: &HttpRequest, principal: &str) -> CasError {
        self.audit.log(
            AuthEvent::account_pending(principal).remote_addr(remote_addr(req)),
        );
        CasError::AccountPending
    }

    fn refuse_unknown(&self, req: &HttpRequest, principal: String) -> CasError {
        self.audit.log(
            AuthEvent::user_not_found(&principal).remote_addr(remote_addr(req)),
        );
        CasError::UserNotFound { login: principal }
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    fn render_registration(
        &self,
        login: &str,
        firstname: &str,
        lastname: &str,
        mail: &str,
        language: &str,
        errors: &[String],
    ) -> HttpResponse {
        let mut error_block = String::new();
        if !errors.is_empty() {
            error_block.push_str("        <ul class=\"errors\">\n");
            for error in errors {
                error_block.push_str(&format!("            <li>{}</li>\n", escape_html(error)));
            }
            error_block.push_str("        </ul>\n");
        }

        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Complete your registration</title>
</head>
<body>
    <h1>Complete your registration</h1>
    <p>Signed in at the identity provider as <strong>{login}</strong>.</p>
{errors}    <form method="post" action="{action}">
        <p>
            <label for="firstname">First name</label>
            <input type="text" id="firstname" name="firstname" value="{firstname}">
        </p>
        <p>
            <label for="lastname">Last name</label>
            <input type="text" id="lastname" name="lastname" value="{lastname}">
        </p>
        <p>
            <label for="mail">Email</label>
            <input type="text" id="mail" name="mail" value="{mail}">
        </p>
        <p>
            <label for="language">Language</label>
            <input type="text" id="language" name="language" value="{language}">
        </p>
        <p>
            <button type="submit">Register</button>
        </p>
    </form>
</body>
</html>"#,
            login = escape_html(login),
            errors = error_block,
            action = escape_html(self.urls.get_register_path()),
            firstname = escape_html(firstname),
            lastname = escape_html(lastname),
            mail = escape_html(mail),
            language = escape_html(language),
        );

        HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(html)
    }
}

fn redirect(url: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((LOCATION, url.to_string()))
        .finish()
}

fn remote_addr(req: &HttpRequest) -> Option<String> {
    req.connection_info()
        .realip_remote_addr()
        .map(|addr| addr.to_string())
}

// Attribute values come from the CAS server and form echoes come from
// the client; both go through here before landing in markup.
fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
