//! User entity holding identity records and their credentials

use budgetbase_auth::Identity;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// User UUID (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub first_name: String,

    pub last_name: String,

    /// User email (unique, stored lowercased)
    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    pub date_of_birth: ChronoDate,

    pub balance: f64,

    /// When the user account was created
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Identity {
    fn from(model: Model) -> Self {
        Identity {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            password_hash: model.password_hash,
            date_of_birth: model.date_of_birth,
            balance: model.balance,
            created_at: model.created_at,
        }
    }
}
