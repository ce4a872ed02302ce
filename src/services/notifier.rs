//! Email notifications.
//!
//! Notifications are sent after the money movement they describe has been
//! committed. A failed send is logged by the caller and never undoes the commit.

use crate::config::settings::NotificationConfig;
use crate::core::money::format_minor_units;
use crate::entities::UserModel;
use async_trait::async_trait;
use tracing::info;

/// A rendered email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// Recipient address
    pub to: String,
    pub subject: String,
    /// HTML body
    pub html_body: String,
}

/// Error returned by a notifier backend
#[derive(Debug, thiserror::Error)]
#[error("notification to {to} failed: {reason}")]
pub struct NotifyError {
    /// Recipient of the failed message
    pub to: String,
    /// Backend failure description
    pub reason: String,
}

/// Delivers emails. Implementations must be cheap to share across tasks.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends one message.
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}

/// Notifier that only writes the message to the log.
///
/// Used when no mail transport is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        info!(to = %message.to, subject = %message.subject, "Email notification");
        Ok(())
    }
}

/// Escapes text for an HTML body or a quoted attribute value.
fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

// `lines` must already be escaped
fn layout(heading: &str, lines: &[String], link: &str) -> String {
    let link = escape_html(link);
    let paragraphs: String = lines.iter().map(|line| format!("<p>{line}</p>")).collect();
    format!(
        r##"<div style="max-width: 700px; text-align: center; margin: auto; border: 10px solid #ddd; padding: 50px 20px; font-size: 110%;">
<h2 style="color: teal;">{heading}</h2>
{paragraphs}
<a href="{link}" style="background: #277BC0; text-decoration: none; color: white; padding: 10px 20px; margin: 10px 0; display: inline-block;">Click here</a>
</div>"##
    )
}

/// Asks the admin to confirm that the airtime arrived.
#[must_use]
pub fn airtime_transfer_request(
    links: &NotificationConfig,
    seller: &UserModel,
    network: &str,
    amount_to_sell: i64,
) -> EmailMessage {
    EmailMessage {
        to: links.admin_email.clone(),
        subject: "Confirm Airtime Transfer".to_string(),
        html_body: layout(
            "Airtime to Cash",
            &[
                format!(
                    "{} wants to sell {} airtime worth N{}.",
                    escape_html(&seller.full_name()),
                    escape_html(network),
                    format_minor_units(amount_to_sell)
                ),
                "Please follow the link to confirm the airtime transfer.".to_string(),
            ],
            &links.admin_dashboard_link(),
        ),
    }
}

/// Tells the admin which wallet was credited.
#[must_use]
pub fn admin_credit_confirmation(
    links: &NotificationConfig,
    customer: &UserModel,
    amount: i64,
) -> EmailMessage {
    EmailMessage {
        to: links.admin_email.clone(),
        subject: "Payment Confirmed".to_string(),
        html_body: layout(
            "Confirm Transaction",
            &[
                format!(
                    "You successfully transferred N{} to {}",
                    format_minor_units(amount),
                    escape_html(&customer.full_name())
                ),
                format!("Email: {}", escape_html(&customer.email)),
                format!("Phone Number: {}", escape_html(&customer.phone_number)),
                "Login to get more details".to_string(),
            ],
            &links.admin_dashboard_link(),
        ),
    }
}

/// Tells the customer their wallet was credited.
#[must_use]
pub fn customer_wallet_credited(
    links: &NotificationConfig,
    customer: &UserModel,
    amount: i64,
) -> EmailMessage {
    EmailMessage {
        to: customer.email.clone(),
        subject: "Payment Confirmed".to_string(),
        html_body: layout(
            "Airtime2Cash Payment",
            &[
                format!(
                    "Your wallet has been credited successfully with N{}",
                    format_minor_units(amount)
                ),
                "Login to get more details".to_string(),
            ],
            &links.login_link(),
        ),
    }
}
