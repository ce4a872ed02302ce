//! Wallet ledger - the only code path that mutates `users.wallet_balance`.
//!
//! Each mutation is one guarded SQL statement,
//! `UPDATE users SET wallet_balance = wallet_balance ± amount WHERE id = ? AND <guard>`,
//! run inside its own transaction (a savepoint when the caller already holds
//! one) and followed by a read-back of the new balance. Two concurrent debits can
//! therefore never both pass a stale balance check: the guard is evaluated by the
//! database at write time.

use crate::{
    core::money::ensure_positive,
    entities::{User, user},
    errors::{Error, Result},
};
use sea_orm::{TransactionTrait, prelude::*, sea_query::Expr};
use tracing::debug;

async fn read_balance<C>(db: &C, user_id: Uuid) -> Result<i64>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id)
        .one(db)
        .await?
        .map(|user| user.wallet_balance)
        .ok_or_else(|| Error::not_found("user", user_id))
}

/// Returns the current wallet balance of a user.
pub async fn balance<C>(db: &C, user_id: Uuid) -> Result<i64>
where
    C: ConnectionTrait,
{
    read_balance(db, user_id).await
}

/// Adds `amount` to a wallet and returns the new balance.
///
/// # Errors
/// * `InvalidAmount` if `amount` is not positive or the balance would overflow
/// * `NotFound` if the user does not exist
pub async fn credit<C>(db: &C, user_id: Uuid, amount: i64) -> Result<i64>
where
    C: TransactionTrait,
{
    ensure_positive(amount)?;

    let txn = db.begin().await?;
    let result = User::update_many()
        .col_expr(
            user::Column::WalletBalance,
            Expr::col(user::Column::WalletBalance).add(amount),
        )
        .filter(user::Column::Id.eq(user_id))
        .filter(user::Column::WalletBalance.lte(i64::MAX - amount))
        .exec(&txn)
        .await?;

    if result.rows_affected == 0 {
        // Either the user is missing or the credit would overflow
        read_balance(&txn, user_id).await?;
        return Err(Error::InvalidAmount {
            amount: amount.to_string(),
        });
    }

    let new_balance = read_balance(&txn, user_id).await?;
    txn.commit().await?;

    debug!(%user_id, amount, new_balance, "Wallet credited");
    Ok(new_balance)
}

/// Subtracts `amount` from a wallet and returns the new balance.
///
/// The balance never goes below zero: the debit only applies while
/// `wallet_balance >= amount` holds at write time.
///
/// # Errors
/// * `InvalidAmount` if `amount` is not positive
/// * `InsufficientFunds` if the balance is lower than `amount`
/// * `NotFound` if the user does not exist
pub async fn debit<C>(db: &C, user_id: Uuid, amount: i64) -> Result<i64>
where
    C: TransactionTrait,
{
    ensure_positive(amount)?;

    let txn = db.begin().await?;
    let result = User::update_many()
        .col_expr(
            user::Column::WalletBalance,
            Expr::col(user::Column::WalletBalance).sub(amount),
        )
        .filter(user::Column::Id.eq(user_id))
        .filter(user::Column::WalletBalance.gte(amount))
        .exec(&txn)
        .await?;

    if result.rows_affected == 0 {
        let current = read_balance(&txn, user_id).await?;
        return Err(Error::InsufficientFunds {
            current,
            required: amount,
        });
    }

    let new_balance = read_balance(&txn, user_id).await?;
    txn.commit().await?;

    debug!(%user_id, amount, new_balance, "Wallet debited");
    Ok(new_balance)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use tokio::task::JoinSet;

    #[tokio::test]
    async fn test_invalid_amount_rejected_before_any_query() -> Result<()> {
        // A disconnected handle fails any query it receives
        let db = DatabaseConnection::Disconnected;
        let user_id = Uuid::new_v4();

        assert!(matches!(
            credit(&db, user_id, 0).await,
            Err(Error::InvalidAmount { .. })
        ));
        assert!(matches!(
            credit(&db, user_id, -10).await,
            Err(Error::InvalidAmount { .. })
        ));
        assert!(matches!(
            debit(&db, user_id, 0).await,
            Err(Error::InvalidAmount { .. })
        ));
        assert!(matches!(
            debit(&db, user_id, -1).await,
            Err(Error::InvalidAmount { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_credit_and_debit() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "ada@example.com", 1000).await?;

        assert_eq!(credit(&db, user.id, 500).await?, 1500);
        assert_eq!(debit(&db, user.id, 1200).await?, 300);
        assert_eq!(balance(&db, user.id).await?, 300);
        Ok(())
    }

    #[tokio::test]
    async fn test_debit_exact_balance_reaches_zero() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "ada@example.com", 700).await?;

        assert_eq!(debit(&db, user.id, 700).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_balance() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "ada@example.com", 200).await?;

        let result = debit(&db, user.id, 500).await;
        assert!(matches!(
            result,
            Err(Error::InsufficientFunds {
                current: 200,
                required: 500
            })
        ));
        assert_eq!(balance(&db, user.id).await?, 200);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_user() -> Result<()> {
        let db = setup_test_db().await?;
        let ghost = Uuid::new_v4();

        assert!(matches!(
            credit(&db, ghost, 10).await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            debit(&db, ghost, 10).await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            balance(&db, ghost).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_credit_overflow_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "ada@example.com", i64::MAX - 10).await?;

        assert!(matches!(
            credit(&db, user.id, 100).await,
            Err(Error::InvalidAmount { .. })
        ));
        assert_eq!(balance(&db, user.id).await?, i64::MAX - 10);
        Ok(())
    }

    #[tokio::test]
    async fn test_ledger_inside_outer_transaction_rolls_back_with_it() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "ada@example.com", 100).await?;

        let txn = db.begin().await?;
        assert_eq!(credit(&txn, user.id, 50).await?, 150);
        txn.rollback().await?;

        assert_eq!(balance(&db, user.id).await?, 100);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mutations_conserve_balance() -> Result<()> {
        let (db, _dir) = setup_pooled_test_db(8).await?;
        let user = create_test_user(&db, "ada@example.com", 1000).await?;

        let mut tasks = JoinSet::new();
        for i in 0..25 {
            let db = db.clone();
            let user_id = user.id;
            tasks.spawn(async move {
                if i % 5 == 0 {
                    credit(&db, user_id, 50).await.map(|_| 50_i64)
                } else {
                    debit(&db, user_id, 100).await.map(|_| -100_i64)
                }
            });
        }

        let mut committed = 0_i64;
        let mut rejected = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined.unwrap() {
                Ok(delta) => committed += delta,
                Err(Error::InsufficientFunds { .. }) => rejected += 1,
                Err(other) => return Err(other),
            }
        }

        let final_balance = balance(&db, user.id).await?;
        assert_eq!(final_balance, 1000 + committed);
        assert!(final_balance >= 0);
        // 20 debits of 100 exceed 1000 + 5 * 50, so some had to be refused
        assert!(rejected > 0);
        Ok(())
    }
}
