//! Ticket validation boundary.
//!
//! The bridge never inspects a service ticket itself: it hands the
//! opaque ticket plus the service URL it was issued for to a
//! [`TicketValidator`] and acts on the outcome. Production deployments
//! implement the trait against a real CAS server's `/serviceValidate`
//! endpoint; tests and demos use [`StaticTicketValidator`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Outcome of presenting a ticket to the CAS server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketValidation {
    /// The server vouched for `principal`, with whatever attributes it
    /// chose to release.
    Validated {
        principal: String,
        attributes: HashMap<String, String>,
    },
    /// Unknown, expired or already-consumed ticket.
    Refused,
}

impl TicketValidation {
    pub fn is_validated(&self) -> bool {
        matches!(self, TicketValidation::Validated { .. })
    }
}

/// Boundary to the external CAS server.
#[async_trait]
pub trait TicketValidator: Send + Sync {
    /// Presents `ticket` for `service` and reports what the server said.
    async fn validate(&self, ticket: &str, service: &str) -> TicketValidation;

    /// URL on the CAS server where an unauthenticated user should be
    /// sent to obtain a ticket for `service`.
    fn login_url(&self, service: &str) -> String;

    /// URL on the CAS server that ends the server-side session and then
    /// returns to `service`.
    fn logout_url(&self, service: &str) -> String;
}

/// Builds the CAS login URL for a server base and service.
pub fn cas_login_url(server_url: &str, service: &str) -> String {
    format!(
        "{}/login?service={}",
        server_url,
        urlencoding::encode(service)
    )
}

/// Builds the CAS logout URL for a server base and return target.
pub fn cas_logout_url(server_url: &str, service: &str) -> String {
    format!(
        "{}/logout?service={}",
        server_url,
        urlencoding::encode(service)
    )
}

struct IssuedTicket {
    principal: String,
    attributes: HashMap<String, String>,
    consumed: bool,
}

/// In-memory validator with pre-issued, single-use tickets.
///
/// Mirrors the external protocol's ticket semantics: a ticket validates
/// exactly once and any replay is refused. Cloning shares the ticket
/// table.
///
/// # Example
/// ```
/// use actix_cas_core::http::cas::{StaticTicketValidator, TicketValidator};
///
/// # actix_web::rt::System::new().block_on(async {
/// let validator = StaticTicketValidator::new("https://cas.example.com");
/// validator.issue("ST-1234", "alice").await;
///
/// assert!(validator.validate("ST-1234", "http://localhost:8080/cas").await.is_validated());
/// // replay
/// assert!(!validator.validate("ST-1234", "http://localhost:8080/cas").await.is_validated());
/// # });
/// ```
#[derive(Clone)]
pub struct StaticTicketValidator {
    server_url: String,
    tickets: Arc<RwLock<HashMap<String, IssuedTicket>>>,
}

impl StaticTicketValidator {
    pub fn new(server_url: &str) -> Self {
        StaticTicketValidator {
            server_url: server_url.to_string(),
            tickets: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Pre-issues a ticket vouching for `principal`, with no attributes.
    pub async fn issue(&self, ticket: &str, principal: &str) {
        self.issue_with_attributes(ticket, principal, HashMap::new())
            .await;
    }

    /// Pre-issues a ticket carrying released attributes.
    pub async fn issue_with_attributes(
        &self,
        ticket: &str,
        principal: &str,
        attributes: HashMap<String, String>,
    ) {
        let mut tickets = self.tickets.write().await;
        tickets.insert(
            ticket.to_string(),
            IssuedTicket {
                principal: principal.to_string(),
                attributes,
                consumed: false,
            },
        );
    }

    /// Returns the CAS server base URL.
    pub fn get_server_url(&self) -> &str {
        &self.server_url
    }
}

#[async_trait]
impl TicketValidator for StaticTicketValidator {
    async fn validate(&self, ticket: &str, _service: &str) -> TicketValidation {
        let mut tickets = self.tickets.write().await;
        match tickets.get_mut(ticket) {
            Some(issued) if !issued.consumed => {
                issued.consumed = true;
                TicketValidation::Validated {
                    principal: issued.principal.clone(),
                    attributes: issued.attributes.clone(),
                }
            }
            _ => TicketValidation::Refused,
        }
    }

    fn login_url(&self, service: &str) -> String {
        cas_login_url(&self.server_url, service)
    }

    fn logout_url(&self, service: &str) -> String {
        cas_logout_url(&self.server_url, service)
    }
}
