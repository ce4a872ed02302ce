//! Withdrawal entity - A wallet debit paid out to a bank account.
//!
//! A row is written in the same database transaction as the ledger debit.
//! Afterwards only `status`, `provider_reference` and `failure_reason` are
//! refined as the transfer gateway reports back.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Settlement state of the bank transfer behind a withdrawal
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    /// Wallet debited, transfer handed to (or awaiting) the gateway
    #[sea_orm(string_value = "initiated")]
    Initiated,
    /// Gateway confirmed the payout
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    /// Gateway rejected the payout; the amount was returned to the wallet
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl WithdrawalStatus {
    /// Lowercase name as stored in the database
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }

    /// Only `initiated -> confirmed` and `initiated -> failed` are allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Initiated, Self::Confirmed) | (Self::Initiated, Self::Failed)
        )
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Withdrawal database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "withdrawal_transactions")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Withdrawal id; doubles as the gateway transfer reference and the idempotency key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    /// Debited amount in minor units
    pub amount: i64,
    pub account_number: String,
    /// Destination bank code
    pub bank: String,
    pub status: WithdrawalStatus,
    /// Transfer id assigned by the gateway, once known
    pub provider_reference: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Withdrawal and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each withdrawal belongs to the user whose wallet was debited
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
