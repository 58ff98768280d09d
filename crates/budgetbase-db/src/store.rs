//! SQL-backed credential store

use async_trait::async_trait;
use budgetbase_auth::{normalize_email, CredentialStore, Identity, NewIdentity, StoreError};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set, SqlErr,
};
use tracing::debug;
use uuid::Uuid;

use crate::entities::user;

/// [`CredentialStore`] over a SeaORM connection.
///
/// Uniqueness is pre-checked on insert, but the `idx_users_email` unique index
/// is what settles races: a violation reported by the database maps to
/// [`StoreError::Conflict`].
#[derive(Clone)]
pub struct SqlCredentialStore {
    db: DatabaseConnection,
}

impl SqlCredentialStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn backend(err: DbErr) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl CredentialStore for SqlCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let found = user::Entity::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .one(&self.db)
            .await
            .map_err(backend)?;

        Ok(found.map(Identity::from))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        let found = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(backend)?;

        Ok(found.map(Identity::from))
    }

    async fn insert(&self, record: NewIdentity) -> Result<Identity, StoreError> {
        let identity = record.into_identity(Uuid::new_v4(), Utc::now());

        if self.find_by_email(&identity.email).await?.is_some() {
            return Err(StoreError::Conflict(identity.email));
        }

        let model = user::ActiveModel {
            id: Set(identity.id),
            first_name: Set(identity.first_name),
            last_name: Set(identity.last_name),
            email: Set(identity.email.clone()),
            password_hash: Set(identity.password_hash),
            date_of_birth: Set(identity.date_of_birth),
            balance: Set(identity.balance),
            created_at: Set(identity.created_at),
        };

        match model.insert(&self.db).await {
            Ok(inserted) => {
                debug!(user_id = %inserted.id, "Inserted user record");
                Ok(inserted.into())
            }
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    Err(StoreError::Conflict(identity.email))
                }
                _ => Err(backend(err)),
            },
        }
    }

    async fn count(&self) -> Result<u64, StoreError> {
        user::Entity::find().count(&self.db).await.map_err(backend)
    }
}
