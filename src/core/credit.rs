//! Credit workflow - admin confirmation of a sell-airtime transaction.
//!
//! The status transition and the wallet credit share one database transaction,
//! so a transaction is never `sent` without the credit or credited while still
//! `pending`. Notifications go out only after commit and cannot undo it.

use crate::{
    config::settings::NotificationConfig,
    core::{airtime, directory, ledger, money::format_minor_units},
    entities::{AirtimeStatus, sell_airtime},
    errors::{Error, Result},
    services::notifier::{self, Notifier},
};
use sea_orm::{TransactionTrait, prelude::*};
use tracing::{info, instrument, warn};
use validator::Validate;

/// Admin request to settle a pending sell-airtime transaction
#[derive(Debug, Clone, Validate)]
pub struct CreditRequest {
    /// Customer to credit
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    /// Must equal the transaction's `amount_to_receive`, minor units
    #[validate(range(min = 1, message = "amountToSend must be positive"))]
    pub amount_to_send: i64,
    /// `sent` to credit, `cancelled` to reject
    pub status: AirtimeStatus,
    pub transaction_id: Uuid,
}

/// Result of a successful credit request
#[derive(Debug, Clone)]
pub enum CreditOutcome {
    /// Transaction marked `sent` and wallet credited
    Credited {
        transaction: sell_airtime::Model,
        customer_email: String,
        amount: i64,
        new_balance: i64,
        /// Confirmation emails that could not be delivered
        notifications_failed: usize,
    },
    /// Transaction marked `cancelled`; no wallet effect
    Cancelled { transaction: sell_airtime::Model },
}

impl CreditOutcome {
    /// Human-readable summary for the admin
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Credited {
                customer_email,
                amount,
                ..
            } => format!(
                "You have successfully credited {customer_email} with the sum of N{}",
                format_minor_units(*amount)
            ),
            Self::Cancelled { .. } => "Transaction cancelled".to_string(),
        }
    }

    /// Whether the money moved but some notification did not go out
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Credited { notifications_failed, .. } if *notifications_failed > 0)
    }
}

fn validate_request(request: &CreditRequest) -> Result<()> {
    request.validate()?;
    if request.status == AirtimeStatus::Pending {
        return Err(Error::validation("status must be sent or cancelled"));
    }
    Ok(())
}

/// Settles a pending sell-airtime transaction.
///
/// # Errors
/// * `Validation` for a malformed request, before any read
/// * `NotFound` if the customer or transaction does not exist
/// * `Conflict` if the transaction is no longer pending (including replays)
/// * `Validation` if the amount or the customer does not match the transaction
#[instrument(skip(db, notifier, links, request), fields(transaction_id = %request.transaction_id, status = %request.status))]
pub async fn credit_customer(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    links: &NotificationConfig,
    request: CreditRequest,
) -> Result<CreditOutcome> {
    validate_request(&request)?;

    let customer = directory::find_user_by_email(db, &request.email)
        .await?
        .ok_or_else(|| Error::not_found("customer", request.email.trim()))?;

    let txn = db.begin().await?;
    let transaction = airtime::settle_pending(
        &txn,
        request.transaction_id,
        request.status,
        customer.id,
        request.amount_to_send,
    )
    .await?;

    if request.status != AirtimeStatus::Sent {
        txn.commit().await?;
        info!("Sell-airtime transaction cancelled");
        return Ok(CreditOutcome::Cancelled { transaction });
    }

    let amount = transaction.amount_to_receive;
    let new_balance = ledger::credit(&txn, customer.id, amount).await?;
    txn.commit().await?;
    info!(customer = %customer.id, amount, new_balance, "Customer wallet credited");

    let mut notifications_failed = 0;
    for message in [
        notifier::admin_credit_confirmation(links, &customer, amount),
        notifier::customer_wallet_credited(links, &customer, amount),
    ] {
        if let Err(e) = notifier.send(&message).await {
            warn!(error = %e, "Credit notification failed; credit stays committed");
            notifications_failed += 1;
        }
    }

    Ok(CreditOutcome::Credited {
        transaction,
        customer_email: customer.email,
        amount,
        new_balance,
        notifications_failed,
    })
}
