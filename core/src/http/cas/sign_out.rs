//! Single-sign-out support.
//!
//! When the CAS server ends a user's SSO session it POSTs a SAML-shaped
//! `logoutRequest` to every service the user logged in to, carrying the
//! original service ticket as `SessionIndex`. The local session state
//! lives in a cookie and cannot be destroyed server-side, so this module
//! keeps a registry of tickets instead: sessions established in
//! `Preserve` mode register their ticket, a notification marks it
//! terminated, and the next authenticated check on a session still
//! carrying that ticket tears the session down.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::http::cas::audit::timestamp_secs;

/// Registry entries older than this are swept on registration.
const TICKET_RETENTION_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
struct TicketRecord {
    registered_at: u64,
    terminated: bool,
}

/// Tracks which service tickets back live sessions and which have been
/// terminated by the CAS server.
///
/// Cloning shares the table; the app installs one clone as app data for
/// the extractor and the auth service keeps another.
#[derive(Clone, Default)]
pub struct SingleSignOutRegistry {
    tickets: Arc<RwLock<HashMap<String, TicketRecord>>>,
}

impl SingleSignOutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a session was established against `ticket`.
    ///
    /// A termination already recorded for the ticket survives: when the
    /// notification races the login, the session being bound right now
    /// is exactly the one it meant to end. Also sweeps entries past the
    /// retention window; the external server never terminates a ticket
    /// that old.
    pub fn register(&self, ticket: &str) {
        let now = timestamp_secs();
        let mut tickets = self.tickets.write().unwrap();
        tickets.retain(|_, record| now.saturating_sub(record.registered_at) < TICKET_RETENTION_SECS);
        tickets
            .entry(ticket.to_string())
            .and_modify(|record| record.registered_at = now)
            .or_insert(TicketRecord {
                registered_at: now,
                terminated: false,
            });
    }

    /// Marks `ticket` terminated. Returns whether a live registration
    /// was known for it.
    ///
    /// Unknown tickets are recorded as terminated anyway: a notification
    /// can race the login that registers the ticket, and a late bind
    /// must still see the termination.
    pub fn terminate(&self, ticket: &str) -> bool {
        let mut tickets = self.tickets.write().unwrap();
        match tickets.get_mut(ticket) {
            Some(record) => {
                let was_live = !record.terminated;
                record.terminated = true;
                was_live
            }
            None => {
                tickets.insert(
                    ticket.to_string(),
                    TicketRecord {
                        registered_at: timestamp_secs(),
                        terminated: true,
                    },
                );
                false
            }
        }
    }

    /// Returns whether `ticket` has been terminated.
    pub fn is_terminated(&self, ticket: &str) -> bool {
        let tickets = self.tickets.read().unwrap();
        tickets
            .get(ticket)
            .map(|record| record.terminated)
            .unwrap_or(false)
    }

    /// Number of tracked tickets, terminated ones included.
    pub fn tracked(&self) -> usize {
        self.tickets.read().unwrap().len()
    }
}

/// Extracts the service ticket from a CAS `logoutRequest` document.
///
/// Returns `None` when the document carries no non-empty `SessionIndex`.
pub fn parse_logout_request(body: &str) -> Option<String> {
    extract_element_text(body, "SessionIndex").filter(|ticket| !ticket.is_empty())
}

// Lightweight scan over the two shapes CAS servers emit: a
// namespace-prefixed element (<samlp:SessionIndex>) or a bare one.
// A full XML parser buys nothing for a single text node.
fn extract_element_text(xml: &str, element: &str) -> Option<String> {
    let markers = [format!(":{}>", element), format!("<{}>", element)];
    for marker in markers.iter() {
        if let Some(pos) = xml.find(marker.as_str()) {
            let content_start = pos + marker.len();
            if let Some(len) = xml[content_start..].find('<') {
                return Some(xml[content_start..content_start + len].trim().to_string());
            }
        }
    }
    None
}
