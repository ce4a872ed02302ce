//! Bank transfer gateway.
//!
//! Payouts are asynchronous on the provider side: `initiate_transfer` only
//! reports that the transfer was accepted, and the final result arrives later
//! through the callback or through [`TransferGateway::fetch_transfer_status`].

use crate::config::settings::TransferConfig;
use crate::core::money::to_major_units;
use async_trait::async_trait;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{error, info, instrument};

/// Everything the gateway needs to move money to a bank account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Settlement bank the payout is funded from
    pub source_bank: String,
    /// Bank code of the destination account
    pub destination_bank: String,
    pub destination_account: String,
    /// Amount in minor units
    pub amount: i64,
    pub currency: String,
    pub narration: String,
    /// Our withdrawal id, unique per transfer
    pub reference: String,
    pub callback_url: String,
}

/// Provider-side state of a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    /// Accepted but not settled yet
    Pending,
    /// Money reached the destination account
    Completed,
    /// Provider gave up; no money left the settlement account
    Failed {
        /// Provider explanation
        reason: String,
    },
}

/// Acknowledgement of an accepted transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    /// Transfer id assigned by the provider
    pub provider_reference: String,
    pub status: TransferStatus,
}

/// Errors talking to the gateway
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Network failure or timeout
    #[error("transfer request failed: {0}")]
    Request(String),

    /// Provider answered with an error
    #[error("transfer rejected: {0}")]
    Rejected(String),

    /// Provider answered with something we could not read
    #[error("transfer response was invalid: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error.to_string())
    }
}

/// Moves money from the settlement account to user bank accounts.
#[async_trait]
pub trait TransferGateway: Send + Sync {
    /// Hands a transfer to the provider. Must not be retried on error by callers.
    async fn initiate_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferReceipt, GatewayError>;

    /// Looks up the current state of a transfer by provider reference.
    async fn fetch_transfer_status(
        &self,
        provider_reference: &str,
    ) -> Result<TransferStatus, GatewayError>;
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    status: String,
    message: String,
    data: Option<ProviderTransfer>,
}

#[derive(Debug, Deserialize)]
struct ProviderTransfer {
    id: i64,
    status: String,
    complete_message: Option<String>,
}

#[derive(Debug, Serialize)]
struct ProviderTransferBody<'a> {
    account_bank: &'a str,
    account_number: &'a str,
    amount: f64,
    currency: &'a str,
    debit_currency: &'a str,
    narration: &'a str,
    reference: &'a str,
    callback_url: &'a str,
    meta: serde_json::Value,
}

/// Maps a provider status string onto [`TransferStatus`].
#[must_use]
pub fn parse_provider_status(status: &str, message: Option<&str>) -> TransferStatus {
    match status.to_ascii_uppercase().as_str() {
        "SUCCESSFUL" => TransferStatus::Completed,
        "FAILED" => TransferStatus::Failed {
            reason: message.unwrap_or("transfer failed").to_string(),
        },
        _ => TransferStatus::Pending,
    }
}

/// Flutterwave transfers API client
#[derive(Clone)]
pub struct FlutterwaveGateway {
    client: Client,
    base_url: String,
    secret_key: String,
}

impl FlutterwaveGateway {
    /// Builds a client with the configured timeout.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &TransferConfig, secret_key: String) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key,
        })
    }

    async fn read_response(response: reqwest::Response) -> Result<ProviderTransfer, GatewayError> {
        let status = response.status();
        let body: ProviderResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        if !status.is_success() || body.status != "success" {
            error!(http_status = %status, message = %body.message, "Gateway returned an error");
            return Err(GatewayError::Rejected(body.message));
        }

        body.data
            .ok_or_else(|| GatewayError::InvalidResponse("missing transfer data".to_string()))
    }
}

#[async_trait]
impl TransferGateway for FlutterwaveGateway {
    #[instrument(skip(self, request), fields(reference = %request.reference))]
    async fn initiate_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferReceipt, GatewayError> {
        let body = ProviderTransferBody {
            account_bank: &request.destination_bank,
            account_number: &request.destination_account,
            amount: to_major_units(request.amount),
            currency: &request.currency,
            debit_currency: &request.currency,
            narration: &request.narration,
            reference: &request.reference,
            callback_url: &request.callback_url,
            meta: json!([{ "source_bank": request.source_bank }]),
        };

        let response = self
            .client
            .post(format!("{}/v3/transfers", self.base_url))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .json(&body)
            .send()
            .await?;

        let transfer = Self::read_response(response).await?;
        info!(provider_id = transfer.id, status = %transfer.status, "Transfer accepted");

        Ok(TransferReceipt {
            provider_reference: transfer.id.to_string(),
            status: parse_provider_status(&transfer.status, transfer.complete_message.as_deref()),
        })
    }

    #[instrument(skip(self))]
    async fn fetch_transfer_status(
        &self,
        provider_reference: &str,
    ) -> Result<TransferStatus, GatewayError> {
        let response = self
            .client
            .get(format!("{}/v3/transfers/{provider_reference}", self.base_url))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .send()
            .await?;

        let transfer = Self::read_response(response).await?;
        Ok(parse_provider_status(
            &transfer.status,
            transfer.complete_message.as_deref(),
        ))
    }
}
