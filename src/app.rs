//! Application façade.
//!
//! Each method takes the caller's bearer credential and a request payload as it
//! arrives on the wire (camelCase JSON, amounts in naira), authenticates it,
//! converts amounts to minor units and drives the matching workflow. Transfer
//! dispatch runs on a tracked background task so a withdrawal response never
//! waits on the gateway.

use crate::{
    config::settings::AppConfig,
    core::{
        airtime::{self, NewSellAirtime},
        credit::{self, CreditOutcome, CreditRequest},
        directory,
        money::to_minor_units,
        pagination::{Page, PageRequest},
        withdraw::{self, WithdrawalOutcome, WithdrawalRequest},
        withdrawal,
    },
    entities::{AirtimeStatus, bank_account, sell_airtime, withdrawal as withdrawal_entity},
    errors::{Error, Result},
    services::{
        auth::AuthGate,
        gateway::{TransferGateway, parse_provider_status},
        notifier::{self, Notifier},
    },
};
use sea_orm::{DatabaseConnection, prelude::Uuid};
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::{error, info, instrument, warn};

/// Body of a sell-airtime request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellAirtimePayload {
    pub network: String,
    pub phone_number: String,
    pub amount_to_sell: f64,
    pub amount_to_receive: f64,
}

/// Body of an admin credit request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditPayload {
    pub email: String,
    pub amount_to_send: f64,
    pub status: AirtimeStatus,
    pub transaction_id: Uuid,
}

/// Body of a withdrawal request
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawPayload {
    #[serde(default)]
    pub withdrawal_id: Option<Uuid>,
    pub amount: f64,
    pub account_number: String,
    pub bank: String,
    pub account_name: String,
    pub password: String,
}

/// Body of a bank account registration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccountPayload {
    pub account_number: String,
    pub bank: String,
    pub account_name: String,
}

/// Transfer webhook posted by the gateway
#[derive(Debug, Clone, Deserialize)]
pub struct TransferCallback {
    pub event: String,
    pub data: TransferCallbackData,
}

/// Transfer fields of a webhook
#[derive(Debug, Clone, Deserialize)]
pub struct TransferCallbackData {
    /// Provider transfer id
    pub id: i64,
    /// Our withdrawal id
    pub reference: String,
    pub status: String,
    pub complete_message: Option<String>,
}

/// Entry point shared by every request handler
#[derive(Clone)]
pub struct App {
    db: DatabaseConnection,
    auth: Arc<dyn AuthGate>,
    notifier: Arc<dyn Notifier>,
    gateway: Arc<dyn TransferGateway>,
    config: Arc<AppConfig>,
    webhook_hash: String,
    dispatches: TaskTracker,
}

impl App {
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        auth: Arc<dyn AuthGate>,
        notifier: Arc<dyn Notifier>,
        gateway: Arc<dyn TransferGateway>,
        config: Arc<AppConfig>,
        webhook_hash: String,
    ) -> Self {
        Self {
            db,
            auth,
            notifier,
            gateway,
            config,
            webhook_hash,
            dispatches: TaskTracker::new(),
        }
    }

    /// Creates a pending sell-airtime transaction and asks the admin to confirm it.
    #[instrument(skip_all)]
    pub async fn sell_airtime(
        &self,
        bearer: &str,
        payload: SellAirtimePayload,
    ) -> Result<sell_airtime::Model> {
        let identity = self.auth.authenticate(bearer).await?;
        let new = NewSellAirtime {
            network: payload.network,
            phone_number: payload.phone_number,
            amount_to_sell: to_minor_units(payload.amount_to_sell)?,
            amount_to_receive: to_minor_units(payload.amount_to_receive)?,
        };
        let transaction = airtime::create_sell_airtime(&self.db, identity.user_id, new).await?;

        let seller = directory::find_user_by_id(&self.db, identity.user_id)
            .await?
            .ok_or_else(|| Error::not_found("user", identity.user_id))?;
        let message = notifier::airtime_transfer_request(
            &self.config.notifications,
            &seller,
            &transaction.network,
            transaction.amount_to_sell,
        );
        if let Err(e) = self.notifier.send(&message).await {
            warn!(error = %e, "Admin was not notified of the airtime transfer");
        }
        Ok(transaction)
    }

    /// Settles a pending sell-airtime transaction. Admin only.
    #[instrument(skip_all)]
    pub async fn credit(&self, bearer: &str, payload: CreditPayload) -> Result<CreditOutcome> {
        let identity = self.auth.authenticate(bearer).await?;
        identity.require_admin()?;

        let request = CreditRequest {
            email: payload.email,
            amount_to_send: to_minor_units(payload.amount_to_send)?,
            status: payload.status,
            transaction_id: payload.transaction_id,
        };
        credit::credit_customer(
            &self.db,
            self.notifier.as_ref(),
            &self.config.notifications,
            request,
        )
        .await
    }

    /// Debits the caller's wallet and starts the bank transfer in the background.
    #[instrument(skip_all)]
    pub async fn withdraw(
        &self,
        bearer: &str,
        payload: WithdrawPayload,
    ) -> Result<WithdrawalOutcome> {
        let identity = self.auth.authenticate(bearer).await?;
        let request = WithdrawalRequest {
            withdrawal_id: payload.withdrawal_id,
            amount: to_minor_units(payload.amount)?,
            account_number: payload.account_number,
            bank: payload.bank,
            account_name: payload.account_name,
            password: payload.password,
        };

        let mut outcome =
            withdraw::withdraw(&self.db, &self.config.transfers, identity.user_id, request)
                .await?;

        if let Some(transfer) = outcome.transfer.take() {
            let db = self.db.clone();
            let gateway = Arc::clone(&self.gateway);
            let withdrawal_id = transfer.withdrawal_id;
            self.dispatches.spawn(async move {
                if let Err(e) = transfer.dispatch(&db, gateway.as_ref()).await {
                    error!(%withdrawal_id, error = %e, "Transfer dispatch did not complete");
                }
            });
        }
        Ok(outcome)
    }

    /// Lists sell-airtime transactions: every one for admins, the caller's own otherwise.
    pub async fn list_sell_airtime(
        &self,
        bearer: &str,
        page: Option<&str>,
        size: Option<&str>,
    ) -> Result<Page<sell_airtime::Model>> {
        let identity = self.auth.authenticate(bearer).await?;
        let request = PageRequest::from_query(page, size, self.config.pagination.max_page_size);
        if identity.is_admin() {
            airtime::list_sell_airtime(&self.db, request).await
        } else {
            airtime::list_sell_airtime_for_seller(&self.db, identity.user_id, request).await
        }
    }

    /// The caller's withdrawal history, newest first.
    pub async fn withdrawals(&self, bearer: &str) -> Result<Vec<withdrawal_entity::Model>> {
        let identity = self.auth.authenticate(bearer).await?;
        withdrawal::list_withdrawals_for_user(&self.db, identity.user_id).await
    }

    /// Registers a withdrawal destination for the caller.
    pub async fn add_bank_account(
        &self,
        bearer: &str,
        payload: BankAccountPayload,
    ) -> Result<bank_account::Model> {
        let identity = self.auth.authenticate(bearer).await?;
        directory::add_bank_account(
            &self.db,
            identity.user_id,
            &payload.account_number,
            &payload.bank,
            &payload.account_name,
        )
        .await
    }

    /// The caller's registered bank accounts.
    pub async fn bank_accounts(&self, bearer: &str) -> Result<Vec<bank_account::Model>> {
        let identity = self.auth.authenticate(bearer).await?;
        directory::list_bank_accounts_for_user(&self.db, identity.user_id).await
    }

    /// Applies a gateway webhook to the withdrawal it names.
    ///
    /// # Errors
    /// * `Unauthorized` if `signature` does not match the configured webhook hash
    /// * `Validation` if the reference is not a withdrawal id
    /// * `Conflict` if the withdrawal was already settled
    #[instrument(skip_all, fields(reference = %callback.data.reference))]
    pub async fn transfer_callback(
        &self,
        signature: &str,
        callback: TransferCallback,
    ) -> Result<withdrawal_entity::Model> {
        if signature.is_empty() || signature != self.webhook_hash {
            warn!("Transfer callback with invalid signature");
            return Err(Error::Unauthorized {
                message: "invalid webhook signature".to_string(),
            });
        }

        let withdrawal_id = Uuid::parse_str(callback.data.reference.trim())
            .map_err(|_| Error::validation("reference is not a withdrawal id"))?;
        withdrawal::set_provider_reference(&self.db, withdrawal_id, &callback.data.id.to_string())
            .await?;

        let status = parse_provider_status(
            &callback.data.status,
            callback.data.complete_message.as_deref(),
        );
        info!(event = %callback.event, ?status, "Transfer callback received");
        withdraw::settle_transfer(&self.db, withdrawal_id, status).await
    }

    /// Waits for every transfer dispatch spawned so far.
    pub async fn drain_dispatches(&self) {
        self.dispatches.close();
        self.dispatches.wait().await;
        self.dispatches.reopen();
    }
}
