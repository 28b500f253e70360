//! Routes delegating to the CAS bridge.

use actix_session::Session;
use actix_web::{get, post, web, HttpRequest, HttpResponse};

use actix_cas_core::http::cas::{
    CasAuthService, CasQuery, InMemoryUserStore, RegistrationForm, SignOutNotification,
    StaticTicketValidator,
};
use actix_cas_core::http::error::CasError;

/// The concrete bridge this demo wires up.
pub type CasService = CasAuthService<StaticTicketValidator, InMemoryUserStore>;

/// Service URL the CAS server redirects back to with a ticket.
#[get("/cas")]
pub async fn cas_login(
    req: HttpRequest,
    session: Session,
    query: web::Query<CasQuery>,
    service: web::Data<CasService>,
) -> Result<HttpResponse, CasError> {
    service.login(&req, &session, &query).await
}

/// Single-sign-out notifications POSTed by the CAS server.
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
