//! Rejections the CAS entry points surface to the browser.
//!
//! Everything here renders as 403. The generic `Failure` message
//! deliberately says nothing about whether the ticket was bad, expired
//! or replayed.

use actix_web::http::StatusCode;
use actix_web::{error, HttpResponse, HttpResponseBuilder};
use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum CasError {
    /// Ticket refused by the CAS server, or session state could not be
    /// established.
    #[display("CAS authentication failed.")]
    Failure,

    /// Validated principal with no local account and autocreate off.
    #[display("No local account for '{login}' and automatic account creation is disabled.")]
    UserNotFound { login: String },

    /// Local account exists but is pending activation (or locked).
    #[display("Your account was created and is now pending administrator approval.")]
    AccountPending,
}

impl error::ResponseError for CasError {
    fn status_code(&self) -> StatusCode {
        StatusCode::FORBIDDEN
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponseBuilder::new(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(self.to_string())
    }
}
