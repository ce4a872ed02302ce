//! Withdrawal workflow - moves wallet funds to a user's own bank account.
//!
//! Every check runs before the first write. The debit and the `initiated`
//! record are committed together, and only then is the bank transfer handed to
//! the gateway. The gateway result comes back later through
//! [`settle_transfer`], which either confirms the record or fails it and
//! refunds the wallet in one database transaction.

use crate::{
    config::settings::TransferConfig,
    core::{
        directory, ledger,
        money::ensure_positive,
        withdrawal::{self, NewWithdrawal},
    },
    entities::{WithdrawalStatus, withdrawal as withdrawal_entity},
    errors::{Error, Result},
    services::gateway::{TransferGateway, TransferRequest, TransferStatus},
};
use sea_orm::{TransactionTrait, prelude::*};
use tracing::{error, info, instrument, warn};
use validator::Validate;

/// User request to withdraw to a registered bank account
#[derive(Clone, Validate)]
pub struct WithdrawalRequest {
    /// Client-chosen idempotency key; generated when absent
    pub withdrawal_id: Option<Uuid>,
    /// Minor units
    pub amount: i64,
    #[validate(length(equal = 10, message = "accountNumber must be 10 digits"))]
    pub account_number: String,
    #[validate(length(min = 1, message = "bank is required"))]
    pub bank: String,
    #[validate(length(min = 1, message = "accountName is required"))]
    pub account_name: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

impl std::fmt::Debug for WithdrawalRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WithdrawalRequest")
            .field("withdrawal_id", &self.withdrawal_id)
            .field("amount", &self.amount)
            .field("account_number", &self.account_number)
            .field("bank", &self.bank)
            .field("account_name", &self.account_name)
            .finish_non_exhaustive()
    }
}

/// A committed withdrawal whose bank transfer has not been handed off yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransfer {
    pub withdrawal_id: Uuid,
    pub request: TransferRequest,
}

/// Result of a successful withdrawal request
#[derive(Debug, Clone)]
pub struct WithdrawalOutcome {
    pub transaction: withdrawal_entity::Model,
    /// Balance after the debit, in minor units
    pub new_balance: i64,
    /// True when the request repeated an earlier withdrawal id
    pub replayed: bool,
    /// Transfer to dispatch; `None` for replays
    pub transfer: Option<PendingTransfer>,
}

fn validate_request(request: &WithdrawalRequest) -> Result<()> {
    request.validate()?;
    if !request.account_number.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::validation("accountNumber must be 10 digits"));
    }
    Ok(())
}

fn verify_password(password: &str, hash: &str) -> Result<()> {
    match bcrypt::verify(password, hash) {
        Ok(true) => Ok(()),
        Ok(false) => Err(Error::Unauthorized {
            message: "incorrect password".to_string(),
        }),
        Err(e) => {
            warn!(error = %e, "Stored password hash could not be checked");
            Err(Error::Unauthorized {
                message: "incorrect password".to_string(),
            })
        }
    }
}

/// Debits the wallet and records an `initiated` withdrawal.
///
/// # Errors
/// * `Validation` for a malformed request or a bank code that differs from the registered one
/// * `NotFound` if the user does not exist
/// * `Unauthorized` if the password does not match
/// * `Forbidden` if the account is not registered by this user, for any amount
/// * `InvalidAmount` if the amount is not positive
/// * `Conflict` if the withdrawal id was already used for a different withdrawal
/// * `InsufficientFunds` if the balance is lower than the amount
#[instrument(skip(db, transfers, request), fields(%user_id, amount = request.amount))]
pub async fn withdraw(
    db: &DatabaseConnection,
    transfers: &TransferConfig,
    user_id: Uuid,
    request: WithdrawalRequest,
) -> Result<WithdrawalOutcome> {
    validate_request(&request)?;

    let user = directory::find_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| Error::not_found("user", user_id))?;
    verify_password(&request.password, &user.password_hash)?;

    let account = directory::find_bank_account(db, &request.account_number)
        .await?
        .filter(|account| account.user_id == user.id)
        .ok_or_else(|| Error::Forbidden {
            message: "account not registered by you".to_string(),
        })?;
    if account.bank != request.bank.trim() {
        return Err(Error::validation(format!(
            "bank {} does not match the registered bank for this account",
            request.bank
        )));
    }

    ensure_positive(request.amount)?;

    if let Some(id) = request.withdrawal_id {
        if let Some(existing) = withdrawal::get_withdrawal(db, id).await? {
            if existing.user_id == user.id
                && existing.amount == request.amount
                && existing.account_number == account.account_number
            {
                info!(withdrawal_id = %id, "Withdrawal replayed");
                return Ok(WithdrawalOutcome {
                    new_balance: ledger::balance(db, user.id).await?,
                    transaction: existing,
                    replayed: true,
                    transfer: None,
                });
            }
            return Err(Error::Conflict {
                entity: "withdrawal",
                key: id.to_string(),
                status: existing.status.to_string(),
            });
        }
    }

    let current = ledger::balance(db, user.id).await?;
    if current < request.amount {
        return Err(Error::InsufficientFunds {
            current,
            required: request.amount,
        });
    }

    let id = request.withdrawal_id.unwrap_or_else(Uuid::new_v4);
    let txn = db.begin().await?;
    let new_balance = ledger::debit(&txn, user.id, request.amount).await?;
    let record = match withdrawal::record_withdrawal(
        &txn,
        NewWithdrawal {
            id,
            user_id: user.id,
            amount: request.amount,
            account_number: account.account_number.clone(),
            bank: account.bank.clone(),
        },
    )
    .await
    {
        Ok(record) => record,
        Err(Error::Database(e)) => {
            // A concurrent request with the same id committed first
            if let Some(existing) = withdrawal::get_withdrawal(&txn, id).await? {
                return Err(Error::Conflict {
                    entity: "withdrawal",
                    key: id.to_string(),
                    status: existing.status.to_string(),
                });
            }
            return Err(e.into());
        }
        Err(e) => return Err(e),
    };
    txn.commit().await?;

    info!(withdrawal_id = %id, new_balance, "Wallet debited for withdrawal");

    let transfer = PendingTransfer {
        withdrawal_id: id,
        request: TransferRequest {
            source_bank: transfers.source_bank.clone(),
            destination_bank: account.bank,
            destination_account: account.account_number,
            amount: request.amount,
            currency: transfers.currency.clone(),
            narration: transfers.narration.clone(),
            reference: id.to_string(),
            callback_url: transfers.callback_url.clone(),
        },
    };

    Ok(WithdrawalOutcome {
        transaction: record,
        new_balance,
        replayed: false,
        transfer: Some(transfer),
    })
}

impl PendingTransfer {
    /// Hands the transfer to the gateway once and records the provider reference.
    ///
    /// A gateway error leaves the withdrawal `initiated`; it is never re-sent
    /// from here because the provider may have accepted it anyway.
    ///
    /// # Errors
    /// * `GatewayUnavailable` if the gateway call failed
    #[instrument(skip(self, db, gateway), fields(withdrawal_id = %self.withdrawal_id))]
    pub async fn dispatch(
        self,
        db: &DatabaseConnection,
        gateway: &dyn TransferGateway,
    ) -> Result<withdrawal_entity::Model> {
        let receipt = match gateway.initiate_transfer(&self.request).await {
            Ok(receipt) => receipt,
            Err(e) => {
                error!(error = %e, "Transfer dispatch failed; left for reconciliation");
                return Err(e.into());
            }
        };

        withdrawal::set_provider_reference(db, self.withdrawal_id, &receipt.provider_reference)
            .await
            .inspect_err(|e| {
                error!(
                    provider_reference = %receipt.provider_reference,
                    error = %e,
                    "Transfer accepted but its provider reference was not stored"
                );
            })?;
        info!(provider_reference = %receipt.provider_reference, "Transfer accepted by gateway");

        settle_transfer(db, self.withdrawal_id, receipt.status).await
    }
}

/// Applies a gateway result to an `initiated` withdrawal.
///
/// `Pending` changes nothing. `Completed` confirms the record. `Failed`
/// marks it failed and refunds the amount in the same database transaction.
///
/// # Errors
/// * `NotFound` if no withdrawal has this id
/// * `Conflict` if the withdrawal was already settled
#[instrument(skip(db, status), fields(%withdrawal_id))]
pub async fn settle_transfer(
    db: &DatabaseConnection,
    withdrawal_id: Uuid,
    status: TransferStatus,
) -> Result<withdrawal_entity::Model> {
    match status {
        TransferStatus::Pending => withdrawal::get_withdrawal(db, withdrawal_id)
            .await?
            .ok_or_else(|| Error::not_found("withdrawal", withdrawal_id)),
        TransferStatus::Completed => {
            let record = withdrawal::transition_withdrawal(
                db,
                withdrawal_id,
                WithdrawalStatus::Initiated,
                WithdrawalStatus::Confirmed,
                None,
            )
            .await?;
            info!("Withdrawal confirmed");
            Ok(record)
        }
        TransferStatus::Failed { reason } => {
            let txn = db.begin().await?;
            let record = withdrawal::transition_withdrawal(
                &txn,
                withdrawal_id,
                WithdrawalStatus::Initiated,
                WithdrawalStatus::Failed,
                Some(reason),
            )
            .await?;
            let refunded = ledger::credit(&txn, record.user_id, record.amount).await?;
            txn.commit().await?;
            warn!(
                amount = record.amount,
                new_balance = refunded,
                reason = record.failure_reason.as_deref().unwrap_or_default(),
                "Withdrawal failed; wallet refunded"
            );
            Ok(record)
        }
    }
}
