//! Shared test utilities for the wallet service.
//!
//! This module provides an in-memory database, fixtures with sensible defaults,
//! and fakes for the notifier and transfer gateway collaborators.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use crate::{
    core::{
        airtime::{self, NewSellAirtime},
        directory,
    },
    entities::{UserModel, UserRole, bank_account, sell_airtime, user},
    errors::{Error, Result},
    services::{
        auth::Claims,
        gateway::{GatewayError, TransferGateway, TransferReceipt, TransferRequest, TransferStatus},
        notifier::{EmailMessage, Notifier, NotifyError},
    },
};
use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ConnectOptions, DatabaseConnection, Set};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Password of every fixture user
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Secret used to sign fixture tokens
pub const TEST_JWT_SECRET: &str = "test-jwt-secret";

/// Creates an in-memory `SQLite` database with all tables initialized.
///
/// The pool holds a single connection so that every task in a test sees the
/// same in-memory database.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = sea_orm::Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a file-backed `SQLite` database behind a pool of `max_connections`.
///
/// Unlike [`setup_test_db`], concurrent tasks really hold separate connections
/// and transactions at the same time. Keep the returned directory alive for
/// the duration of the test.
pub async fn setup_pooled_test_db(
    max_connections: u32,
) -> Result<(DatabaseConnection, tempfile::TempDir)> {
    let dir = tempfile::tempdir().map_err(|e| Error::Config {
        message: format!("Failed to create temp dir: {e}"),
    })?;
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("wallet.sqlite").display()
    );
    let mut options = ConnectOptions::new(url);
    options.max_connections(max_connections).sqlx_logging(false);
    let db = sea_orm::Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok((db, dir))
}

/// Signs a token for `user_id` with [`TEST_JWT_SECRET`], valid for a year.
pub fn issue_test_token(user_id: Uuid) -> String {
    let exp = chrono::Utc::now() + chrono::Duration::days(365);
    let claims = Claims {
        id: user_id.to_string(),
        exp: usize::try_from(exp.timestamp()).unwrap(),
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("test token encodes")
}

async fn insert_user(
    db: &DatabaseConnection,
    email: &str,
    role: UserRole,
    wallet_balance: i64,
) -> Result<UserModel> {
    // Minimum bcrypt cost keeps the fixtures fast
    let password_hash =
        bcrypt::hash(TEST_PASSWORD, 4).map_err(|e| Error::validation(e.to_string()))?;
    let user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        first_name: Set("Ada".to_string()),
        last_name: Set("Obi".to_string()),
        user_name: Set(email.to_string()),
        email: Set(email.to_string()),
        phone_number: Set("08012345678".to_string()),
        password_hash: Set(password_hash),
        role: Set(role),
        wallet_balance: Set(wallet_balance),
        created_at: Set(chrono::Utc::now()),
    };
    user.insert(db).await.map_err(Into::into)
}

/// Creates a regular user with the given wallet balance (minor units).
///
/// # Defaults
/// * name: Ada Obi
/// * password: [`TEST_PASSWORD`]
pub async fn create_test_user(
    db: &DatabaseConnection,
    email: &str,
    wallet_balance: i64,
) -> Result<UserModel> {
    insert_user(db, email, UserRole::User, wallet_balance).await
}

/// Creates an admin with an empty wallet.
pub async fn create_admin(db: &DatabaseConnection, email: &str) -> Result<UserModel> {
    insert_user(db, email, UserRole::Admin, 0).await
}

/// Registers a bank account at bank code "058" for `user_id`.
pub async fn create_test_bank_account(
    db: &DatabaseConnection,
    user_id: Uuid,
    account_number: &str,
) -> Result<bank_account::Model> {
    directory::add_bank_account(db, user_id, account_number, "058", "Ada Obi").await
}

/// Creates a pending MTN sell-airtime transaction.
///
/// `amount_to_sell` is set 20% above `amount_to_receive`.
pub async fn create_test_sell_airtime(
    db: &DatabaseConnection,
    seller_id: Uuid,
    amount_to_receive: i64,
) -> Result<sell_airtime::Model> {
    airtime::create_sell_airtime(
        db,
        seller_id,
        NewSellAirtime {
            network: "MTN".to_string(),
            phone_number: "08012345678".to_string(),
            amount_to_sell: amount_to_receive + amount_to_receive / 5,
            amount_to_receive,
        },
    )
    .await
}

/// Notifier that keeps every message it was asked to send
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn recipients(&self) -> Vec<String> {
        self.messages().into_iter().map(|m| m.to).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &EmailMessage) -> std::result::Result<(), NotifyError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Notifier whose transport is always down
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, message: &EmailMessage) -> std::result::Result<(), NotifyError> {
        Err(NotifyError {
            to: message.to.clone(),
            reason: "smtp connection refused".to_string(),
        })
    }
}

/// Gateway fake with a fixed answer to `initiate_transfer` and per-reference statuses
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    /// Provider reference returned on initiation; `None` makes initiation fail
    accept_with: Option<String>,
    statuses: HashMap<String, TransferStatus>,
    requests: Mutex<Vec<TransferRequest>>,
}

impl ScriptedGateway {
    /// Accepts every transfer as pending under `provider_reference`.
    pub fn accepting(provider_reference: &str) -> Self {
        Self {
            accept_with: Some(provider_reference.to_string()),
            ..Self::default()
        }
    }

    /// Fails every call as if the provider timed out.
    pub fn unreachable() -> Self {
        Self::default()
    }

    /// Answers status lookups for `provider_reference` with `status`.
    pub fn with_status(mut self, provider_reference: &str, status: TransferStatus) -> Self {
        self.statuses.insert(provider_reference.to_string(), status);
        self
    }

    /// Transfers handed to the gateway so far.
    pub fn requests(&self) -> Vec<TransferRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransferGateway for ScriptedGateway {
    async fn initiate_transfer(
        &self,
        request: &TransferRequest,
    ) -> std::result::Result<TransferReceipt, GatewayError> {
        self.requests.lock().unwrap().push(request.clone());
        self.accept_with
            .clone()
            .map(|provider_reference| TransferReceipt {
                provider_reference,
                status: TransferStatus::Pending,
            })
            .ok_or_else(|| GatewayError::Request("operation timed out".to_string()))
    }

    async fn fetch_transfer_status(
        &self,
        provider_reference: &str,
    ) -> std::result::Result<TransferStatus, GatewayError> {
        self.statuses
            .get(provider_reference)
            .cloned()
            .ok_or_else(|| GatewayError::Rejected(format!("transfer {provider_reference} not found")))
    }
}
