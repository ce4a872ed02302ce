//! # Withdrawal Reconciler
//!
//! Background task that settles withdrawals the transfer callback never
//! reported on. Every `poll_interval` it lists `initiated` withdrawals older
//! than `min_age` and:
//! 1. asks the gateway for the status of those with a provider reference and
//!    applies it through [`settle_transfer`];
//! 2. flags those without a reference past `manual_review_after`. Dispatch may
//!    or may not have reached the provider, so they are never re-sent.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use crate::{
    config::settings::ReconcilerConfig,
    core::{withdraw::settle_transfer, withdrawal},
    errors::{Error, Result},
    services::gateway::{TransferGateway, TransferStatus},
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Counts from one reconciliation sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub confirmed: usize,
    /// Failed and refunded
    pub failed: usize,
    /// Still pending at the provider
    pub pending: usize,
    /// No provider reference long after dispatch
    pub needs_review: usize,
    /// Gateway or database errors; retried next sweep
    pub errors: usize,
}

/// Periodic settlement of unsettled withdrawals
pub struct Reconciler {
    db: DatabaseConnection,
    gateway: Arc<dyn TransferGateway>,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(
        db: DatabaseConnection,
        gateway: Arc<dyn TransferGateway>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            db,
            gateway,
            config,
        }
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(reconciler.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.config.poll_interval_secs,
            "Withdrawal reconciler starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Withdrawal reconciler shutting down");
                return;
            }

            match self.poll_step().await {
                Ok(report) if report != ReconcileReport::default() => {
                    info!(?report, "Reconciliation sweep finished");
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "Reconciliation sweep failed"),
            }

            tokio::select! {
                () = tokio::time::sleep(self.config.poll_interval()) => {},
                () = shutdown.cancelled() => {
                    info!("Withdrawal reconciler shutting down");
                    return;
                }
            }
        }
    }

    /// Executes one sweep over `initiated` withdrawals.
    ///
    /// # Errors
    /// Returns an error only if the unsettled withdrawals cannot be listed;
    /// per-record failures are counted in the report.
    pub async fn poll_step(&self) -> Result<ReconcileReport> {
        let now = Utc::now();
        let min_age = chrono::Duration::seconds(to_seconds(self.config.min_age_secs));
        let review_after =
            chrono::Duration::seconds(to_seconds(self.config.manual_review_after_secs));

        let unsettled = withdrawal::list_unsettled(&self.db, now - min_age).await?;
        let mut report = ReconcileReport::default();

        for record in unsettled {
            let Some(reference) = record.provider_reference.as_deref() else {
                if record.created_at <= now - review_after {
                    warn!(
                        withdrawal_id = %record.id,
                        user_id = %record.user_id,
                        amount = record.amount,
                        "Withdrawal has no provider reference; needs manual review"
                    );
                    report.needs_review += 1;
                }
                continue;
            };

            let status = match self.gateway.fetch_transfer_status(reference).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(withdrawal_id = %record.id, error = %e, "Transfer status lookup failed");
                    report.errors += 1;
                    continue;
                }
            };

            let outcome = match &status {
                TransferStatus::Pending => &mut report.pending,
                TransferStatus::Completed => &mut report.confirmed,
                TransferStatus::Failed { .. } => &mut report.failed,
            };
            match settle_transfer(&self.db, record.id, status).await {
                Ok(_) => *outcome += 1,
                Err(Error::Conflict { status, .. }) => {
                    debug!(withdrawal_id = %record.id, %status, "Withdrawal settled by callback first");
                }
                Err(e) => {
                    warn!(withdrawal_id = %record.id, error = %e, "Withdrawal settlement failed");
                    report.errors += 1;
                }
            }
        }

        Ok(report)
    }
}

fn to_seconds(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX / 1000)
}
