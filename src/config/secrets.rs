//! Secrets loaded from environment variables.
//!
//! Signing keys and gateway credentials never live in `config.toml`; they are read
//! from the environment (usually populated from `.env` by `dotenvy`) right before use.

use crate::errors::{Error, Result};

/// HMAC secret used to verify bearer tokens
pub const JWT_SECRET_VAR: &str = "JWT_SECRET";
/// Transfer gateway secret key
pub const GATEWAY_SECRET_VAR: &str = "FLW_SECRET_KEY";
/// Shared hash the gateway sends with every transfer callback
pub const WEBHOOK_HASH_VAR: &str = "TRANSFER_WEBHOOK_HASH";

/// All secrets the service needs at runtime
#[derive(Clone)]
pub struct Secrets {
    /// Token verification secret
    pub jwt_secret: String,
    /// Gateway API secret key
    pub gateway_secret_key: String,
    /// Expected value of the callback verification header
    pub webhook_hash: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets").finish_non_exhaustive()
    }
}

fn required(name: &str) -> Result<String> {
    let value = std::env::var(name).inspect_err(|e| {
        tracing::error!("{name} not found: {e}");
    })?;
    if value.trim().is_empty() {
        return Err(Error::Config {
            message: format!("{name} is set but empty"),
        });
    }
    Ok(value)
}

impl Secrets {
    /// Reads every secret from the environment.
    ///
    /// # Errors
    /// Returns an error if any variable is missing or blank.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            jwt_secret: required(JWT_SECRET_VAR)?,
            gateway_secret_key: required(GATEWAY_SECRET_VAR)?,
            webhook_hash: required(WEBHOOK_HASH_VAR)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_does_not_leak_secrets() {
        let secrets = Secrets {
            jwt_secret: "jwt-very-secret".to_string(),
            gateway_secret_key: "FLWSECK-very-secret".to_string(),
            webhook_hash: "hash-very-secret".to_string(),
        };
        let printed = format!("{secrets:?}");
        assert!(!printed.contains("very-secret"));
    }

    #[test]
    fn test_missing_variable_is_reported() {
        let result = required("AIRTIME2CASH_TEST_DEFINITELY_UNSET");
        assert!(matches!(result, Err(Error::EnvVar(_))));
    }
}
