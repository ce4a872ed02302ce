//! Sell-airtime entity - A user's request to convert airtime into wallet cash.
//!
//! Records are append-only apart from `transaction_status` (and its `updated_at`),
//! which follows the closed transition table in [`AirtimeStatus::can_transition_to`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a sell-airtime transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum AirtimeStatus {
    /// Waiting for the admin to confirm the airtime transfer
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Airtime received, wallet credited
    #[sea_orm(string_value = "sent")]
    Sent,
    /// Rejected by the admin, no wallet effect
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl AirtimeStatus {
    /// Lowercase name as stored in the database
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether `self -> next` is in the transition table.
    ///
    /// Only `pending -> sent` and `pending -> cancelled` are allowed; `sent` and
    /// `cancelled` are terminal.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Sent) | (Self::Pending, Self::Cancelled)
        )
    }

    /// Whether no further transition can leave this status
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for AirtimeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sell-airtime transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sell_airtime_transactions")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Externally addressable identifier, also the crediting idempotency key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Seller who will be credited
    pub user_id: Uuid,
    /// Mobile network of the airtime (e.g. "MTN")
    pub network: String,
    pub phone_number: String,
    /// Airtime face value in minor units
    pub amount_to_sell: i64,
    /// Cash credited to the wallet once the transfer is confirmed, in minor units
    pub amount_to_receive: i64,
    pub transaction_status: AirtimeStatus,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `SellAirtime` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to its seller
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        assert!(AirtimeStatus::Pending.can_transition_to(AirtimeStatus::Sent));
        assert!(AirtimeStatus::Pending.can_transition_to(AirtimeStatus::Cancelled));
        assert!(!AirtimeStatus::Pending.can_transition_to(AirtimeStatus::Pending));
        assert!(!AirtimeStatus::Sent.can_transition_to(AirtimeStatus::Cancelled));
        assert!(!AirtimeStatus::Cancelled.can_transition_to(AirtimeStatus::Sent));
        assert!(!AirtimeStatus::Sent.can_transition_to(AirtimeStatus::Pending));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!AirtimeStatus::Pending.is_terminal());
        assert!(AirtimeStatus::Sent.is_terminal());
        assert!(AirtimeStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&AirtimeStatus::Cancelled).unwrap_or_default();
        assert_eq!(json, "\"cancelled\"");
        assert_eq!(AirtimeStatus::Sent.to_string(), "sent");
    }
}
