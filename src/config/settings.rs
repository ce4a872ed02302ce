//! Application settings loading from config.toml
//!
//! Every section has serde defaults, so an empty or partial file is valid. The
//! file only carries non-secret values; see [`super::secrets`] for credentials.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Email addresses and links used in notifications
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Transfer gateway settings
    #[serde(default)]
    pub transfers: TransferConfig,
    /// Listing limits
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Background reconciliation settings
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
}

/// Addresses and links embedded in emails
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Operator mailbox receiving transfer requests and confirmations
    pub admin_email: String,
    /// Base URL of the web frontend, used to build dashboard links
    pub frontend_url: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            admin_email: "admin@airtime2cash.local".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
        }
    }
}

impl NotificationConfig {
    /// Link to the admin dashboard
    #[must_use]
    pub fn admin_dashboard_link(&self) -> String {
        format!("{}/dashboard/admin", self.frontend_url.trim_end_matches('/'))
    }

    /// Link to the customer login page
    #[must_use]
    pub fn login_link(&self) -> String {
        format!("{}/login", self.frontend_url.trim_end_matches('/'))
    }
}

/// Parameters of every outgoing bank transfer
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Gateway API base URL
    pub base_url: String,
    /// Settlement bank the payout is debited from
    pub source_bank: String,
    /// ISO currency code of all wallets
    pub currency: String,
    /// Narration shown on the recipient's statement
    pub narration: String,
    /// Where the gateway posts transfer results
    pub callback_url: String,
    /// HTTP timeout for gateway calls, in seconds
    pub timeout_secs: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.flutterwave.com".to_string(),
            source_bank: "044".to_string(),
            currency: "NGN".to_string(),
            narration: "Withdrawal from airtime2cash wallet".to_string(),
            callback_url: "http://localhost:8080/transfers/callback".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Listing limits for paginated endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Default page size, also the exclusive upper bound of an explicit size
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { max_page_size: 15 }
    }
}

/// Timing of the reconciliation sweep
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Seconds between sweeps
    pub poll_interval_secs: u64,
    /// Withdrawals younger than this are left to the callback
    pub min_age_secs: u64,
    /// Withdrawals without a provider reference older than this are flagged for review
    pub manual_review_after_secs: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            min_age_secs: 120,
            manual_review_after_secs: 3600,
        }
    }
}

impl ReconcilerConfig {
    /// Interval between sweeps
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Loads application configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read, the TOML syntax is invalid, or
/// a value is out of range.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    let config: AppConfig = toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads `CONFIG_PATH` (default `./config.toml`), falling back to defaults when
/// the file does not exist.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    if Path::new(&path).exists() {
        tracing::info!(path = %path, "Loading configuration file");
        load_config(&path)
    } else {
        tracing::warn!(path = %path, "Configuration file not found, using defaults");
        Ok(AppConfig::default())
    }
}

impl AppConfig {
    fn validate(&self) -> Result<()> {
        if self.pagination.max_page_size == 0 {
            return Err(Error::Config {
                message: "pagination.max_page_size must be positive".to_string(),
            });
        }
        if self.reconciler.poll_interval_secs == 0 {
            return Err(Error::Config {
                message: "reconciler.poll_interval_secs must be positive".to_string(),
            });
        }
        if self.transfers.currency.trim().is_empty() {
            return Err(Error::Config {
                message: "transfers.currency must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
