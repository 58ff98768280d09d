//! Credential store contract shared by every persistence backend

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A registered user as persisted by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Assigned at creation, never changes
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Normalized (trimmed, lowercased), unique across the store
    pub email: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub date_of_birth: NaiveDate,
    pub balance: f64,
    pub created_at: DateTime<Utc>,
}

/// Record handed to [`CredentialStore::insert`]; the store assigns id and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct NewIdentity {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub date_of_birth: NaiveDate,
    pub balance: f64,
}

impl NewIdentity {
    pub fn into_identity(self, id: Uuid, created_at: DateTime<Utc>) -> Identity {
        Identity {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: normalize_email(&self.email),
            password_hash: self.password_hash,
            date_of_birth: self.date_of_birth,
            balance: self.balance,
            created_at,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// Another identity already owns this email
    #[error("Email already registered: {0}")]
    Conflict(String),

    /// Backend failure (connectivity, query, serialization)
    #[error("Credential store error: {0}")]
    Backend(String),
}

/// Persistence for identity records.
///
/// Implementations must enforce email uniqueness atomically on insert: two
/// concurrent inserts for the same email yield exactly one success and one
/// [`StoreError::Conflict`]. Emails passed in are normalized by the store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, StoreError>;

    async fn insert(&self, record: NewIdentity) -> Result<Identity, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;
}

/// Canonical form of an email used for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
