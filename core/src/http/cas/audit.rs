//! Authentication event log.
//!
//! Every security-relevant decision the bridge takes (successful login,
//! refused ticket, provisioning, logout in either direction) is emitted
//! as an [`AuthEvent`] to the registered handlers. The default handler
//! prints to stdout in the classic one-line audit format; tests register
//! an [`InMemoryEventStore`] to assert on what was emitted.

use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

// ============================================================================
// Event model
// ============================================================================

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEventType {
    /// A validated principal resolved to an active user and was signed in.
    LoginSuccess,
    /// The CAS server refused the presented ticket.
    LoginRefused,
    /// Validated principal with no local account and autocreate off.
    UserNotFound,
    /// Local account exists but is not active.
    AccountPending,
    /// A new local account was created through the registration flow.
    UserProvisioned,
    /// Registration submission was rejected.
    ProvisioningFailed,
    /// User-initiated logout.
    Logout,
    /// Server-initiated single-sign-out notification.
    SingleSignOut,
}

impl AuthEventType {
    fn default_severity(&self) -> AuthEventSeverity {
        match self {
            AuthEventType::LoginSuccess
            | AuthEventType::UserProvisioned
            | AuthEventType::Logout => AuthEventSeverity::Info,
            AuthEventType::SingleSignOut => AuthEventSeverity::Warning,
            AuthEventType::LoginRefused
            | AuthEventType::UserNotFound
            | AuthEventType::AccountPending
            | AuthEventType::ProvisioningFailed => AuthEventSeverity::Error,
        }
    }
}

impl fmt::Display for AuthEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthEventType::LoginSuccess => "LOGIN_SUCCESS",
            AuthEventType::LoginRefused => "LOGIN_REFUSED",
            AuthEventType::UserNotFound => "USER_NOT_FOUND",
            AuthEventType::AccountPending => "ACCOUNT_PENDING",
            AuthEventType::UserProvisioned => "USER_PROVISIONED",
            AuthEventType::ProvisioningFailed => "PROVISIONING_FAILED",
            AuthEventType::Logout => "LOGOUT",
            AuthEventType::SingleSignOut => "SINGLE_SIGN_OUT",
        };
        write!(f, "{}", name)
    }
}

/// How loud.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEventSeverity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for AuthEventSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthEventSeverity::Info => "INFO",
            AuthEventSeverity::Warning => "WARN",
            AuthEventSeverity::Error => "ERROR",
        };
        write!(f, "{}", name)
    }
}

/// One audit record.
#[derive(Debug, Clone)]
pub struct AuthEvent {
    pub event_type: AuthEventType,
    pub severity: AuthEventSeverity,
    pub principal: Option<String>,
    pub remote_addr: Option<String>,
    pub message: Option<String>,
    /// Seconds since epoch.
    pub timestamp: u64,
}

impl AuthEvent {
    /// Creates an event with the type's default severity, stamped now.
    pub fn new(event_type: AuthEventType) -> Self {
        AuthEvent {
            event_type,
            severity: event_type.default_severity(),
            principal: None,
            remote_addr: None,
            message: None,
            timestamp: timestamp_secs(),
        }
    }

    /// Attaches the principal this event is about (builder pattern).
    pub fn principal(mut self, principal: &str) -> Self {
        self.principal = Some(principal.to_string());
        self
    }

    /// Attaches the client address (builder pattern).
    pub fn remote_addr(mut self, remote_addr: Option<String>) -> Self {
        self.remote_addr = remote_addr;
        self
    }

    /// Attaches free-form detail (builder pattern).
    pub fn message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    pub fn login_success(principal: &str) -> Self {
        Self::new(AuthEventType::LoginSuccess).principal(principal)
    }

    pub fn login_refused() -> Self {
        Self::new(AuthEventType::LoginRefused)
    }

    pub fn user_not_found(principal: &str) -> Self {
        Self::new(AuthEventType::UserNotFound).principal(principal)
    }

    pub fn account_pending(principal: &str) -> Self {
        Self::new(AuthEventType::AccountPending).principal(principal)
    }

    pub fn provisioned(principal: &str) -> Self {
        Self::new(AuthEventType::UserProvisioned).principal(principal)
    }

    pub fn provisioning_failed(principal: &str, detail: &str) -> Self {
        Self::new(AuthEventType::ProvisioningFailed)
            .principal(principal)
            .message(detail)
    }

    pub fn logout(principal: &str) -> Self {
        Self::new(AuthEventType::Logout).principal(principal)
    }

    pub fn single_sign_out(ticket: &str, known: bool) -> Self {
        let detail = if known {
            format!("ticket {} terminated", ticket)
        } else {
            format!("ticket {} terminated (no live session)", ticket)
        };
        Self::new(AuthEventType::SingleSignOut).message(&detail)
    }
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.event_type)?;
        if let Some(principal) = &self.principal {
            write!(f, " '{}'", principal)?;
        }
        if let Some(addr) = &self.remote_addr {
            write!(f, " from {}", addr)?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Receives every emitted event.
pub trait AuthEventHandler: Send + Sync {
    fn handle(&self, event: &AuthEvent);
}

/// Prints events to stdout, one line each.
pub struct StdoutHandler;

impl AuthEventHandler for StdoutHandler {
    fn handle(&self, event: &AuthEvent) {
        println!("[AUDIT] {}", event);
    }
}

/// Collects events in memory so tests can assert on them.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<Vec<AuthEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<AuthEvent> {
        self.events.read().unwrap().clone()
    }

    /// Counts recorded events of one type.
    pub fn count_of(&self, event_type: AuthEventType) -> usize {
        self.events
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    pub fn clear(&self) {
        self.events.write().unwrap().clear();
    }
}

impl AuthEventHandler for InMemoryEventStore {
    fn handle(&self, event: &AuthEvent) {
        self.events.write().unwrap().push(event.clone());
    }
}

// ============================================================================
// Logger
// ============================================================================

/// Fans events out to the registered handlers.
#[derive(Clone, Default)]
pub struct AuditLogger {
    handlers: Vec<Arc<dyn AuthEventHandler>>,
}

impl AuditLogger {
    /// Creates a logger with no handlers; events are dropped until one
    /// is registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a logger printing to stdout.
    pub fn stdout() -> Self {
        Self::new().with_handler(Arc::new(StdoutHandler))
    }

    /// Registers an additional handler (builder pattern).
    pub fn with_handler(mut self, handler: Arc<dyn AuthEventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Emits one event to every handler.
    pub fn log(&self, event: AuthEvent) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }
}

pub(crate) fn timestamp_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
