//! Persistence boundary for local user records.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::http::cas::user::CasUser;

/// Errors a [`UserStore`] can produce.
#[derive(Debug, PartialEq, Eq)]
pub enum StoreError {
    /// A record with this login already exists.
    AlreadyExists,
    /// No record with this login.
    NotFound,
    /// Backend failure, with detail.
    Storage(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::AlreadyExists => write!(f, "a user with this login already exists"),
            StoreError::NotFound => write!(f, "user not found"),
            StoreError::Storage(detail) => write!(f, "storage error: {}", detail),
        }
    }
}

impl std::error::Error for StoreError {}

/// Lookup and lifecycle operations over local user records.
///
/// Logins are unique; [`UserStore::create`] must refuse a duplicate with
/// [`StoreError::AlreadyExists`] even under concurrent registration of
/// the same principal.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Looks a user up by login.
    async fn find_by_login(&self, login: &str) -> Result<Option<CasUser>, StoreError>;

    /// Inserts a new record; the login must not be taken.
    async fn create(&self, user: &CasUser) -> Result<(), StoreError>;

    /// Replaces an existing record.
    async fn update(&self, user: &CasUser) -> Result<(), StoreError>;

    /// Stamps the last successful login (seconds since epoch).
    async fn record_login(&self, login: &str, timestamp: u64) -> Result<(), StoreError>;

    /// Returns whether a record with this login exists.
    async fn user_exists(&self, login: &str) -> Result<bool, StoreError> {
        Ok(self.find_by_login(login).await?.is_some())
    }
}

/// In-memory [`UserStore`] keyed by login.
///
/// Cloning shares the underlying map, so a clone handed to the app and
/// one kept by a test observe the same records.
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<String, CasUser>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a record, replacing any existing one with the same login.
    pub async fn add_user(&self, user: CasUser) {
        let mut users = self.users.write().await;
        users.insert(user.get_login().to_string(), user);
    }

    /// Returns the number of stored records.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_login(&self, login: &str) -> Result<Option<CasUser>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(login).cloned())
    }

    async fn create(&self, user: &CasUser) -> Result<(), StoreError> {
        // Uniqueness check and insert under one write lock.
        let mut users = self.users.write().await;
        if users.contains_key(user.get_login()) {
            return Err(StoreError::AlreadyExists);
        }
        users.insert(user.get_login().to_string(), user.clone());
        Ok(())
    }

    async fn update(&self, user: &CasUser) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if !users.contains_key(user.get_login()) {
            return Err(StoreError::NotFound);
        }
        users.insert(user.get_login().to_string(), user.clone());
        Ok(())
    }

    async fn record_login(&self, login: &str, timestamp: u64) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        match users.get_mut(login) {
            Some(user) => {
                user.touch_login(timestamp);
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }
}
