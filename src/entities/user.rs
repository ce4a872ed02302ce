//! User entity - A registered user and the wallet balance they own.
//!
//! The `wallet_balance` column is stored in minor units (kobo) and is only ever
//! mutated through `core::ledger`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Access level attached to a user account
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular customer selling airtime
    #[sea_orm(string_value = "user")]
    User,
    /// Operator who confirms airtime transfers and credits wallets
    #[sea_orm(string_value = "admin")]
    Admin,
}

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Opaque unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[sea_orm(unique)]
    pub user_name: String,
    /// Login and crediting lookup key
    #[sea_orm(unique)]
    pub email: String,
    pub phone_number: String,
    /// bcrypt hash of the account password
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    /// Current wallet balance in minor units, never negative
    pub wallet_balance: i64,
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Display name used in notification emails.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user owns many bank accounts
    #[sea_orm(has_many = "super::bank_account::Entity")]
    BankAccounts,
    /// One user sells many airtime batches
    #[sea_orm(has_many = "super::sell_airtime::Entity")]
    SellAirtime,
    /// One user makes many withdrawals
    #[sea_orm(has_many = "super::withdrawal::Entity")]
    Withdrawals,
}

impl Related<super::bank_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BankAccounts.def()
    }
}

impl Related<super::sell_airtime::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SellAirtime.def()
    }
}

impl Related<super::withdrawal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Withdrawals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
