//! CAS single-sign-on bridge.
//!
//! Delegates authentication to an external CAS server: the user is sent
//! to the server's login page, comes back with a single-use service
//! ticket, the ticket is exchanged for a verified principal and the
//! principal is mapped onto a local user record, auto-provisioning on
//! first sight when policy allows. Logout propagates in both directions,
//! including server-initiated single-sign-out.
//!
//! Pieces, wired together by [`CasAuthService`]:
//! - [`CasSettings`] — runtime feature gate
//! - [`TicketValidator`] — boundary to the external server
//! - [`IdentityResolver`] / [`UserStore`] — principal to local account
//! - [`SessionBinder`] / [`CasActor`] — session state and extraction
//! - [`SingleSignOutRegistry`] — ticket terminations
//! - [`RedirectPolicy`] — open-redirect defense for the `ref` parameter
//! - [`AuditLogger`] — authentication event log

pub mod audit;
pub mod handler;
pub mod redirect;
pub mod resolver;
pub mod session;
pub mod settings;
pub mod sign_out;
pub mod store;
pub mod ticket;
pub mod user;

pub use audit::{
    AuditLogger, AuthEvent, AuthEventHandler, AuthEventSeverity, AuthEventType,
    InMemoryEventStore, StdoutHandler,
};
pub use handler::{CasAuthService, CasQuery, CasUrls, SignOutNotification};
pub use redirect::RedirectPolicy;
pub use resolver::{IdentityResolver, RegistrationError, RegistrationForm, Resolution};
pub use session::{BindMode, CasActor, SessionActor, SessionBinder, SessionError, SessionKeys};
pub use settings::CasSettings;
pub use sign_out::{parse_logout_request, SingleSignOutRegistry};
pub use store::{InMemoryUserStore, StoreError, UserStore};
pub use ticket::{
    cas_login_url, cas_logout_url, StaticTicketValidator, TicketValidation, TicketValidator,
};
pub use user::{CasUser, UserStatus};
