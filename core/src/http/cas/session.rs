//! Session establishment and teardown.
//!
//! Two layers of session state exist. The *principal* claim is written
//! as soon as a ticket validates, before the local account is resolved,
//! so the registration flow can reload without re-presenting the
//! single-use ticket. The *actor* claim is written only when an active
//! local user is signed in; it is what [`CasActor`] extracts.

use std::collections::HashMap;
use std::fmt;
use std::future::{ready, Ready};
use std::ops::Deref;

use actix_session::{Session, SessionExt};
use actix_web::dev::Payload;
use actix_web::{error, web, FromRequest, HttpRequest};
use serde::{Deserialize, Serialize};

use crate::http::cas::sign_out::SingleSignOutRegistry;
use crate::http::cas::user::CasUser;

// ============================================================================
// Keys and modes
// ============================================================================

const ACTOR_KEY: &str = "cas_actor";
const PRINCIPAL_KEY: &str = "cas_principal";
const TICKET_KEY: &str = "cas_ticket";
const ATTRIBUTES_KEY: &str = "cas_attributes";

/// Names of the session entries the bridge owns.
#[derive(Debug, Clone)]
pub struct SessionKeys {
    actor_key: String,
    principal_key: String,
    ticket_key: String,
    attributes_key: String,
}

impl Default for SessionKeys {
    fn default() -> Self {
        SessionKeys {
            actor_key: ACTOR_KEY.to_string(),
            principal_key: PRINCIPAL_KEY.to_string(),
            ticket_key: TICKET_KEY.to_string(),
            attributes_key: ATTRIBUTES_KEY.to_string(),
        }
    }
}

impl SessionKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renames the signed-in actor entry (builder pattern).
    pub fn actor_key(mut self, key: &str) -> Self {
        self.actor_key = key.to_string();
        self
    }

    /// Renames the validated-principal entry (builder pattern).
    pub fn principal_key(mut self, key: &str) -> Self {
        self.principal_key = key.to_string();
        self
    }

    /// Renames the bound-ticket entry (builder pattern).
    pub fn ticket_key(mut self, key: &str) -> Self {
        self.ticket_key = key.to_string();
        self
    }

    /// Renames the imported-attributes entry (builder pattern).
    pub fn attributes_key(mut self, key: &str) -> Self {
        self.attributes_key = key.to_string();
        self
    }
}

/// How a session is established on successful login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMode {
    /// Keep the current session and its ticket binding, so a
    /// single-sign-out notification can find it later.
    Preserve,
    /// Rotate the session identifier (fixation defense) and drop the
    /// ticket binding.
    Rotate,
}

// ============================================================================
// Actor
// ============================================================================

/// The signed-in user as stored in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionActor {
    pub login: String,
    pub admin: bool,
    pub language: String,
}

impl SessionActor {
    pub fn from_user(user: &CasUser) -> Self {
        SessionActor {
            login: user.get_login().to_string(),
            admin: user.is_admin(),
            language: user.get_language().to_string(),
        }
    }
}

/// Errors raised while writing session state.
#[derive(Debug)]
pub enum SessionError {
    InsertError(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::InsertError(detail) => {
                write!(f, "failed to write session state: {}", detail)
            }
        }
    }
}

impl std::error::Error for SessionError {}

// ============================================================================
// Binder
// ============================================================================

/// Reads and writes the bridge's session entries.
#[derive(Debug, Clone, Default)]
pub struct SessionBinder {
    keys: SessionKeys,
}

impl SessionBinder {
    pub fn new(keys: SessionKeys) -> Self {
        SessionBinder { keys }
    }

    /// Returns the key names this binder reads and writes.
    pub fn get_keys(&self) -> &SessionKeys {
        &self.keys
    }

    /// Stores the validated principal, its imported attributes and,
    /// when present, the ticket that vouched for it.
    pub fn set_principal(
        &self,
        session: &Session,
        principal: &str,
        attributes: &HashMap<String, String>,
        ticket: Option<&str>,
    ) -> Result<(), SessionError> {
        session
            .insert(self.keys.principal_key.as_str(), principal)
            .map_err(|e| SessionError::InsertError(e.to_string()))?;
        session
            .insert(self.keys.attributes_key.as_str(), attributes)
            .map_err(|e| SessionError::InsertError(e.to_string()))?;
        if let Some(ticket) = ticket {
            session
                .insert(self.keys.ticket_key.as_str(), ticket)
                .map_err(|e| SessionError::InsertError(e.to_string()))?;
        }
        Ok(())
    }

    /// Returns the validated principal, if a ticket validated on this
    /// session.
    pub fn principal(&self, session: &Session) -> Option<String> {
        session.get(self.keys.principal_key.as_str()).ok().flatten()
    }

    /// Returns the attributes imported at validation time.
    pub fn extra_attributes(&self, session: &Session) -> HashMap<String, String> {
        session
            .get(self.keys.attributes_key.as_str())
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    /// Returns the service ticket this session was established against.
    pub fn bound_ticket(&self, session: &Session) -> Option<String> {
        session.get(self.keys.ticket_key.as_str()).ok().flatten()
    }

    /// Signs `user` in on this session.
    pub fn bind(
        &self,
        session: &Session,
        user: &CasUser,
        mode: BindMode,
    ) -> Result<(), SessionError> {
        if mode == BindMode::Rotate {
            session.renew();
            session.remove(self.keys.ticket_key.as_str());
        }
        session
            .insert(self.keys.actor_key.as_str(), SessionActor::from_user(user))
            .map_err(|e| SessionError::InsertError(e.to_string()))
    }

    /// Returns the signed-in actor, if any.
    pub fn current_user(&self, session: &Session) -> Option<SessionActor> {
        session.get(self.keys.actor_key.as_str()).ok().flatten()
    }

    /// Ends the local session entirely.
    pub fn logout(&self, session: &Session) {
        session.remove(self.keys.actor_key.as_str());
        session.remove(self.keys.principal_key.as_str());
        session.remove(self.keys.ticket_key.as_str());
        session.remove(self.keys.attributes_key.as_str());
        session.purge();
    }
}

// ============================================================================
// Extractor
// ============================================================================

/// Extracts the signed-in [`SessionActor`], rejecting the request with
/// 401 when nobody is signed in.
///
/// Session entries are read under [`SessionKeys`] installed as app data;
/// without them the default key names apply. An application that renames
/// keys via `CasAuthService::session_keys` must install the same keys as
/// app data or the extractor will look in the wrong place.
///
/// When a [`SingleSignOutRegistry`] is installed as app data, a session
/// whose bound ticket has been terminated by the CAS server is purged
/// and rejected here, which is what actually enforces single-sign-out
/// on cookie-backed sessions.
///
/// ```ignore
/// async fn account(actor: CasActor) -> impl Responder {
///     HttpResponse::Ok().body(format!("signed in as {}", actor.login))
/// }
/// ```
pub struct CasActor(SessionActor);

impl CasActor {
    pub fn into_inner(self) -> SessionActor {
        self.0
    }
}

impl Deref for CasActor {
    type Target = SessionActor;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for CasActor {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let session = req.get_session();
        let keys = req
            .app_data::<web::Data<SessionKeys>>()
            .map(|keys| keys.get_ref().clone())
            .unwrap_or_default();
        let binder = SessionBinder::new(keys);

        let actor = binder.current_user(&session);
        let result = match actor {
            Some(actor) => {
                let terminated = binder.bound_ticket(&session).map_or(false, |ticket| {
                    req.app_data::<web::Data<SingleSignOutRegistry>>()
                        .map_or(false, |registry| registry.is_terminated(&ticket))
                });
                if terminated {
                    // remote SSO session is gone; drop the local one too
                    binder.logout(&session);
                    Err(error::ErrorUnauthorized("session terminated"))
                } else {
                    Ok(CasActor(actor))
                }
            }
            None => Err(error::ErrorUnauthorized("authentication required")),
        };
        ready(result)
    }
}
