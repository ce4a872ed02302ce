//! Unified error type for the wallet service.
//!
//! Every workflow step reports a distinct variant so callers can tell a request
//! that is safe to retry (validation, lookups) from one that must not be blindly
//! replayed (insufficient funds, conflicts, pending gateway transfers).

use thiserror::Error;

/// All errors produced by the wallet core, its collaborators and configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input, reported before any read or write happens
    #[error("Validation error: {message}")]
    Validation {
        /// Field-level description of what was rejected
        message: String,
    },

    /// A monetary amount that is zero, negative, non-finite or out of range
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount as supplied
        amount: String,
    },

    /// A user, bank account or transaction could not be resolved
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Kind of record that was looked up
        entity: &'static str,
        /// Lookup key that produced no match
        key: String,
    },

    /// The record was already moved past the expected state by another request
    #[error("Conflict on {entity} {key}: already {status}")]
    Conflict {
        /// Kind of record in conflict
        entity: &'static str,
        /// Identifier of the record
        key: String,
        /// Current stored status
        status: String,
    },

    /// A status change that the transition table never allows
    #[error("Transition from {from} to {to} is not allowed")]
    InvalidTransition {
        /// Status the caller expected to leave
        from: String,
        /// Status the caller asked for
        to: String,
    },

    /// No usable credential was presented
    #[error("Authentication required: {message}")]
    Unauthenticated {
        /// Why the credential was rejected
        message: String,
    },

    /// A credential or password did not match
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Why access was refused
        message: String,
    },

    /// The caller is known but does not own the target resource
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Why access was refused
        message: String,
    },

    /// Wallet balance is lower than the requested debit
    #[error("Insufficient funds: balance {current}, required {required}")]
    InsufficientFunds {
        /// Balance at the time of the check, in minor units
        current: i64,
        /// Requested amount, in minor units
        required: i64,
    },

    /// The external transfer gateway failed or timed out
    #[error("Transfer gateway unavailable: {message}")]
    GatewayUnavailable {
        /// Gateway failure description
        message: String,
    },

    /// Configuration file or setting is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },

    /// Database layer failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Required environment variable is missing or not unicode
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict { .. } | Self::InvalidTransition { .. } => "CONFLICT",
            Self::Unauthenticated { .. } => "UNAUTHENTICATED",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::GatewayUnavailable { .. } => "GATEWAY_UNAVAILABLE",
            Self::Config { .. } | Self::Database(_) | Self::EnvVar(_) => "INTERNAL",
        }
    }

    /// HTTP-equivalent status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } | Self::InvalidAmount { .. } | Self::InsufficientFunds { .. } => {
                400
            }
            Self::Unauthenticated { .. } | Self::Unauthorized { .. } => 401,
            Self::Forbidden { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } | Self::InvalidTransition { .. } => 409,
            Self::GatewayUnavailable { .. } => 502,
            Self::Config { .. } | Self::Database(_) | Self::EnvVar(_) => 500,
        }
    }

    /// Whether a client may resend the same request without risking a duplicate effect.
    #[must_use]
    pub const fn is_retry_safe(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::NotFound { .. })
    }

    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation {
            message: errors.to_string(),
        }
    }
}

impl From<crate::services::gateway::GatewayError> for Error {
    fn from(error: crate::services::gateway::GatewayError) -> Self {
        Self::GatewayUnavailable {
            message: error.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct_per_failure_class() {
        let funds = Error::InsufficientFunds {
            current: 200,
            required: 500,
        };
        assert_eq!(funds.code(), "INSUFFICIENT_FUNDS");
        assert_eq!(funds.status_code(), 400);
        assert!(!funds.is_retry_safe());

        let missing = Error::not_found("user", "ghost@example.com");
        assert_eq!(missing.code(), "NOT_FOUND");
        assert_eq!(missing.status_code(), 404);
        assert!(missing.is_retry_safe());
        assert_eq!(missing.to_string(), "user not found: ghost@example.com");

        let conflict = Error::Conflict {
            entity: "sell_airtime",
            key: "abc".to_string(),
            status: "sent".to_string(),
        };
        assert_eq!(conflict.code(), "CONFLICT");
        assert_eq!(conflict.status_code(), 409);
        assert!(!conflict.is_retry_safe());
    }

    #[test]
    fn test_forbidden_and_unauthorized_differ() {
        let forbidden = Error::Forbidden {
            message: "account not registered by you".to_string(),
        };
        let unauthorized = Error::Unauthorized {
            message: "wrong password".to_string(),
        };
        assert_eq!(forbidden.status_code(), 403);
        assert_eq!(unauthorized.status_code(), 401);
        assert_ne!(forbidden.code(), unauthorized.code());
    }
}
