//! Withdrawal transaction store.
//!
//! Rows are inserted by the withdrawal workflow inside the same database
//! transaction as the ledger debit. After that the status only moves forward
//! from `initiated`, through a conditional update like the sell-airtime store.

use crate::{
    entities::{Withdrawal, WithdrawalStatus, withdrawal},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};

/// Fields of a withdrawal known at debit time
#[derive(Debug, Clone)]
pub struct NewWithdrawal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub account_number: String,
    pub bank: String,
}

/// Inserts a withdrawal in the `initiated` state.
pub async fn record_withdrawal<C>(db: &C, new: NewWithdrawal) -> Result<withdrawal::Model>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let record = withdrawal::ActiveModel {
        id: Set(new.id),
        user_id: Set(new.user_id),
        amount: Set(new.amount),
        account_number: Set(new.account_number),
        bank: Set(new.bank),
        status: Set(WithdrawalStatus::Initiated),
        provider_reference: Set(None),
        failure_reason: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    record.insert(db).await.map_err(Into::into)
}

/// Retrieves a withdrawal by id.
pub async fn get_withdrawal<C>(db: &C, id: Uuid) -> Result<Option<withdrawal::Model>>
where
    C: ConnectionTrait,
{
    Withdrawal::find_by_id(id).one(db).await.map_err(Into::into)
}

/// Lists a user's withdrawals, newest first.
pub async fn list_withdrawals_for_user(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Vec<withdrawal::Model>> {
    Withdrawal::find()
        .filter(withdrawal::Column::UserId.eq(user_id))
        .order_by_desc(withdrawal::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists `initiated` withdrawals created before `created_before`, oldest first.
pub async fn list_unsettled(
    db: &DatabaseConnection,
    created_before: DateTime<Utc>,
) -> Result<Vec<withdrawal::Model>> {
    Withdrawal::find()
        .filter(withdrawal::Column::Status.eq(WithdrawalStatus::Initiated))
        .filter(withdrawal::Column::CreatedAt.lt(created_before))
        .order_by_asc(withdrawal::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Stores the gateway's transfer id on a withdrawal that does not have one yet.
pub async fn set_provider_reference<C>(db: &C, id: Uuid, provider_reference: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    Withdrawal::update_many()
        .col_expr(
            withdrawal::Column::ProviderReference,
            Expr::value(provider_reference.to_string()),
        )
        .col_expr(withdrawal::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(withdrawal::Column::Id.eq(id))
        .filter(withdrawal::Column::ProviderReference.is_null())
        .exec(db)
        .await?;
    Ok(())
}

/// Moves a withdrawal from `expected` to `next`, recording an optional failure reason.
///
/// # Errors
/// * `InvalidTransition` if the pair is not in the transition table
/// * `Conflict` if the stored status is no longer `expected`
/// * `NotFound` if no withdrawal has this id
pub async fn transition_withdrawal<C>(
    db: &C,
    id: Uuid,
    expected: WithdrawalStatus,
    next: WithdrawalStatus,
    failure_reason: Option<String>,
) -> Result<withdrawal::Model>
where
    C: ConnectionTrait,
{
    if !expected.can_transition_to(next) {
        return Err(Error::InvalidTransition {
            from: expected.to_string(),
            to: next.to_string(),
        });
    }

    let result = Withdrawal::update_many()
        .col_expr(withdrawal::Column::Status, Expr::value(next))
        .col_expr(withdrawal::Column::FailureReason, Expr::value(failure_reason))
        .col_expr(withdrawal::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(withdrawal::Column::Id.eq(id))
        .filter(withdrawal::Column::Status.eq(expected))
        .exec(db)
        .await?;

    let current = get_withdrawal(db, id)
        .await?
        .ok_or_else(|| Error::not_found("withdrawal", id))?;

    if result.rows_affected == 0 {
        return Err(Error::Conflict {
            entity: "withdrawal",
            key: id.to_string(),
            status: current.status.to_string(),
        });
    }
    Ok(current)
}
