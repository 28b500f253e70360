//! Common test utilities and configuration.
//!
//! Builds a full application around the bridge with an in-memory user
//! store and ticket validator, and hands back handles on both so tests
//! can seed state and observe what the flows did.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use actix_session::storage::CookieSessionStore;
use actix_session::{Session, SessionMiddleware};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::ServiceResponse;
use actix_web::http::header;
use actix_web::{get, post, test, web, App, HttpRequest, HttpResponse, Responder};

use actix_cas_core::http::cas::{
    AuditLogger, CasActor, CasAuthService, CasQuery, CasSettings, CasUrls, CasUser,
    InMemoryEventStore, InMemoryUserStore, RegistrationForm, SessionBinder, SessionKeys,
    SignOutNotification, SingleSignOutRegistry, StaticTicketValidator,
};
use actix_cas_core::http::error::CasError;

pub const BASE_URL: &str = "http://localhost:8080";
pub const CAS_SERVER: &str = "https://cas.example.com";

pub type CasService = CasAuthService<StaticTicketValidator, InMemoryUserStore>;

// =============================================================================
// Test Configuration
// =============================================================================

/// Gate on, everything else off.
pub fn enabled_settings() -> CasSettings {
    CasSettings::new().enabled(true)
}

/// Gate + autocreate, with the profile attributes imported.
pub fn autocreate_settings() -> CasSettings {
    CasSettings::new()
        .enabled(true)
        .autocreate(true)
        .extra_attributes(&["firstname", "lastname", "mail"])
}

/// Gate + single-sign-out.
pub fn sign_out_settings() -> CasSettings {
    CasSettings::new().enabled(true).single_sign_out(true)
}

/// Handles on the app's collaborators.
pub struct TestHarness {
    pub store: Arc<InMemoryUserStore>,
    pub validator: Arc<StaticTicketValidator>,
    pub events: InMemoryEventStore,
    pub registry: SingleSignOutRegistry,
}

impl TestHarness {
    pub async fn seed_active_user(&self, login: &str) {
        self.store
            .add_user(CasUser::new(login).language("en").activate())
            .await;
    }

    pub async fn seed_pending_user(&self, login: &str) {
        self.store.add_user(CasUser::new(login).language("en")).await;
    }

    pub async fn issue_ticket(&self, ticket: &str, principal: &str) {
        self.validator.issue(ticket, principal).await;
    }

    pub async fn issue_ticket_with_attributes(
        &self,
        ticket: &str,
        principal: &str,
        attributes: &[(&str, &str)],
    ) {
        let attributes: HashMap<String, String> = attributes
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.validator
            .issue_with_attributes(ticket, principal, attributes)
            .await;
    }
}

// =============================================================================
// Test Handlers
// =============================================================================

#[get("/")]
pub async fn home(session: Session) -> impl Responder {
    let body = match SessionBinder::default().current_user(&session) {
        Some(actor) => format!("Welcome back, {}!", actor.login),
        None => "Welcome!".to_string(),
    };
    HttpResponse::Ok().body(body)
}

#[get("/login")]
pub async fn login_page() -> impl Responder {
    HttpResponse::Ok().body("Local login page")
}

#[get("/my/account")]
pub async fn account(actor: CasActor) -> impl Responder {
    HttpResponse::Ok().body(format!("Account of {}", actor.login))
}

#[get("/cas")]
pub async fn cas_login(
    req: HttpRequest,
    session: Session,
    query: web::Query<CasQuery>,
    service: web::Data<CasService>,
) -> Result<HttpResponse, CasError> {
    service.login(&req, &session, &query).await
}

#[post("/cas")]
pub async fn cas_sign_out(
    notification: web::Form<SignOutNotification>,
    service: web::Data<CasService>,
) -> HttpResponse {
    service.single_sign_out(&notification)
}

#[get("/cas/register")]
pub async fn cas_register_form(
    req: HttpRequest,
    session: Session,
    query: web::Query<CasQuery>,
    service: web::Data<CasService>,
) -> Result<HttpResponse, CasError> {
    service.register_form(&req, &session, &query).await
}

#[post("/cas/register")]
pub async fn cas_register_submit(
    req: HttpRequest,
    session: Session,
    form: web::Form<RegistrationForm>,
    service: web::Data<CasService>,
) -> Result<HttpResponse, CasError> {
    service.register_submit(&req, &session, &form).await
}

#[get("/logout")]
pub async fn logout(
    req: HttpRequest,
    session: Session,
    service: web::Data<CasService>,
) -> HttpResponse {
    service.logout(&req, &session).await
}

// =============================================================================
// Test App Builder
// =============================================================================

/// Creates a fully configured test application around `settings`.
pub async fn create_test_app(
    settings: CasSettings,
) -> (
    impl actix_web::dev::Service<
        actix_http::Request,
        Response = ServiceResponse,
        Error = actix_web::Error,
    >,
    TestHarness,
) {
    create_test_app_with_keys(settings, SessionKeys::default()).await
}

/// Like [`create_test_app`], with renamed session entries.
pub async fn create_test_app_with_keys(
    settings: CasSettings,
    keys: SessionKeys,
) -> (
    impl actix_web::dev::Service<
        actix_http::Request,
        Response = ServiceResponse,
        Error = actix_web::Error,
    >,
    TestHarness,
) {
    let store = Arc::new(InMemoryUserStore::new());
    let validator = Arc::new(StaticTicketValidator::new(CAS_SERVER));
    let events = InMemoryEventStore::new();

    let service: CasService = CasAuthService::new(
        settings,
        CasUrls::new(BASE_URL),
        validator.clone(),
        store.clone(),
    )
    .audit_logger(AuditLogger::new().with_handler(Arc::new(events.clone())))
    .session_keys(keys);
    let registry = service.sign_out_registry();

    let keys_data = web::Data::new(service.get_session_keys());
    let service = web::Data::new(service);
    let registry_data = web::Data::new(registry.clone());

    let app = test::init_service(
        App::new()
            .app_data(service)
            .app_data(registry_data)
            .app_data(keys_data)
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
                    .cookie_secure(false)
                    .build(),
            )
            .service(home)
            .service(login_page)
            .service(account)
            .service(cas_login)
            .service(cas_sign_out)
            .service(cas_register_form)
            .service(cas_register_submit)
            .service(logout),
    )
    .await;

    (
        app,
        TestHarness {
            store,
            validator,
            events,
            registry,
        },
    )
}

// =============================================================================
// Helpers
// =============================================================================

/// The session cookie set by a response, if any.
pub fn session_cookie_opt(resp: &ServiceResponse) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|c| c.name() == "id")
        .map(|c| c.into_owned())
}

/// The session cookie set by a response; panics when absent.
pub fn session_cookie(resp: &ServiceResponse) -> Cookie<'static> {
    session_cookie_opt(resp).expect("response set no session cookie")
}

/// The `Location` header of a redirect response.
pub fn location(resp: &ServiceResponse) -> String {
    resp.headers()
        .get(header::LOCATION)
        .expect("response has no Location header")
        .to_str()
        .unwrap()
        .to_string()
}

/// A CAS `logoutRequest` document carrying `ticket` as session index.
pub fn logout_request_body(ticket: &str) -> String {
    format!(
        "<samlp:LogoutRequest xmlns:samlp=\"urn:oasis:names:tc:SAML:2.0:protocol\" \
         ID=\"LR-1\" Version=\"2.0\" IssueInstant=\"2024-01-01T00:00:00Z\">\
         <saml:NameID xmlns:saml=\"urn:oasis:names:tc:SAML:2.0:assertion\">@NOT_USED@</saml:NameID>\
         <samlp:SessionIndex>{}</samlp:SessionIndex>\
         </samlp:LogoutRequest>",
        ticket
    )
}

/// Reads the response body as a UTF-8 string.
pub async fn body_string(resp: ServiceResponse) -> String {
    let bytes = test::read_body(resp).await;
    String::from_utf8(bytes.to_vec()).unwrap()
}
