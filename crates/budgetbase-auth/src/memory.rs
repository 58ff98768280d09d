//! In-process credential store.
//!
//! Useful for tests and throwaway runs; nothing survives a restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::store::{normalize_email, CredentialStore, Identity, NewIdentity, StoreError};

#[derive(Default)]
struct Inner {
    by_id: HashMap<Uuid, Identity>,
    /// Secondary unique index: normalized email -> id
    by_email: HashMap<String, Uuid>,
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: RwLock<Inner>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_email
            .get(&normalize_email(email))
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        Ok(self.inner.read().await.by_id.get(&id).cloned())
    }

    async fn insert(&self, record: NewIdentity) -> Result<Identity, StoreError> {
        let identity = record.into_identity(Uuid::new_v4(), Utc::now());

        // Check and write under one lock so concurrent inserts cannot both pass
        let mut inner = self.inner.write().await;
        if inner.by_email.contains_key(&identity.email) {
            return Err(StoreError::Conflict(identity.email));
        }

        inner.by_email.insert(identity.email.clone(), identity.id);
        inner.by_id.insert(identity.id, identity.clone());

        Ok(identity)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.inner.read().await.by_id.len() as u64)
    }
}
