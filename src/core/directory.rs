//! Account directory - exact-match lookups of users and bank accounts.
//!
//! No business rules live here; ownership checks belong to the workflows.

use crate::{
    entities::{BankAccount, User, bank_account, user},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Finds a user by id.
pub async fn find_user_by_id<C>(db: &C, user_id: Uuid) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Finds a user by email. Emails are compared exactly after trimming.
pub async fn find_user_by_email<C>(db: &C, email: &str) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::Email.eq(email.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a registered bank account by its account number.
pub async fn find_bank_account<C>(
    db: &C,
    account_number: &str,
) -> Result<Option<bank_account::Model>>
where
    C: ConnectionTrait,
{
    BankAccount::find()
        .filter(bank_account::Column::AccountNumber.eq(account_number.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists the bank accounts a user registered, oldest first.
pub async fn list_bank_accounts_for_user(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Vec<bank_account::Model>> {
    BankAccount::find()
        .filter(bank_account::Column::UserId.eq(user_id))
        .order_by_asc(bank_account::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Registers a withdrawal destination for a user.
///
/// Account numbers are unique across all users; registering one that already
/// exists fails with `Conflict`.
pub async fn add_bank_account(
    db: &DatabaseConnection,
    user_id: Uuid,
    account_number: &str,
    bank: &str,
    account_name: &str,
) -> Result<bank_account::Model> {
    let account_number = account_number.trim();
    if account_number.len() != 10 || !account_number.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::validation("accountNumber must be 10 digits"));
    }
    if bank.trim().is_empty() || account_name.trim().is_empty() {
        return Err(Error::validation("bank and accountName are required"));
    }

    find_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| Error::not_found("user", user_id))?;

    if find_bank_account(db, account_number).await?.is_some() {
        return Err(Error::Conflict {
            entity: "bank_account",
            key: account_number.to_string(),
            status: "registered".to_string(),
        });
    }

    let account = bank_account::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        account_number: Set(account_number.to_string()),
        bank: Set(bank.trim().to_string()),
        account_name: Set(account_name.trim().to_string()),
        created_at: Set(chrono::Utc::now()),
    };

    account.insert(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_lookups_by_id_and_email() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "ada@example.com", 1000).await?;

        let by_id = find_user_by_id(&db, user.id).await?.unwrap();
        assert_eq!(by_id, user);

        let by_email = find_user_by_email(&db, " ada@example.com ").await?.unwrap();
        assert_eq!(by_email.id, user.id);

        assert!(find_user_by_email(&db, "nobody@example.com").await?.is_none());
        assert!(find_user_by_id(&db, Uuid::new_v4()).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_add_and_find_bank_account() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "ada@example.com", 0).await?;

        let account = add_bank_account(&db, user.id, "0123456789", "058", "Ada Obi").await?;
        assert_eq!(account.user_id, user.id);
        assert_eq!(account.bank, "058");

        let found = find_bank_account(&db, "0123456789").await?.unwrap();
        assert_eq!(found, account);

        let listed = list_bank_accounts_for_user(&db, user.id).await?;
        assert_eq!(listed, vec![account]);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_account_number_conflicts() -> Result<()> {
        let db = setup_test_db().await?;
        let ada = create_test_user(&db, "ada@example.com", 0).await?;
        let bola = create_test_user(&db, "bola@example.com", 0).await?;

        add_bank_account(&db, ada.id, "0123456789", "058", "Ada Obi").await?;
        let result = add_bank_account(&db, bola.id, "0123456789", "058", "Bola").await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_bank_account_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "ada@example.com", 0).await?;

        let short = add_bank_account(&db, user.id, "12345", "058", "Ada").await;
        assert!(matches!(short, Err(Error::Validation { .. })));

        let letters = add_bank_account(&db, user.id, "01234abcde", "058", "Ada").await;
        assert!(matches!(letters, Err(Error::Validation { .. })));

        let unknown = add_bank_account(&db, Uuid::new_v4(), "0123456789", "058", "Ada").await;
        assert!(matches!(unknown, Err(Error::NotFound { .. })));
        Ok(())
    }
}
