//! Bank account entity - A withdrawal destination registered by a user.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Bank account database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bank_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Owner of the account; withdrawals are only allowed to the owner's accounts
    pub user_id: Uuid,
    /// NUBAN account number, unique across all users
    #[sea_orm(unique)]
    pub account_number: String,
    /// Bank code used by the transfer gateway
    pub bank: String,
    pub account_name: String,
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `BankAccount` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each bank account belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
