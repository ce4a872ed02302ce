//! Bearer credential verification.
//!
//! Token issuance lives elsewhere; this module only turns a presented bearer
//! token into the acting [`Identity`].

use crate::core::directory;
use crate::entities::UserRole;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use sea_orm::DatabaseConnection;
use sea_orm::prelude::Uuid;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl Identity {
    /// Whether the caller may confirm transfers and credit wallets
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Fails with `Forbidden` unless the caller is an admin.
    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::Forbidden {
                message: "admin access required".to_string(),
            })
        }
    }
}

/// Token payload
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub id: String,
    /// Expiry as a unix timestamp
    pub exp: usize,
}

/// Resolves a bearer credential to an identity.
#[async_trait]
pub trait AuthGate: Send + Sync {
    /// Accepts either the raw token or an `Authorization` header value.
    async fn authenticate(&self, bearer: &str) -> Result<Identity>;
}

/// HS256 JWT verification backed by the user directory
pub struct JwtAuthGate {
    decoding_key: DecodingKey,
    db: DatabaseConnection,
}

impl JwtAuthGate {
    #[must_use]
    pub fn new(secret: &str, db: DatabaseConnection) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            db,
        }
    }
}

fn strip_bearer(credential: &str) -> &str {
    let trimmed = credential.trim();
    trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))
        .unwrap_or(trimmed)
        .trim()
}

#[async_trait]
impl AuthGate for JwtAuthGate {
    async fn authenticate(&self, bearer: &str) -> Result<Identity> {
        let token = strip_bearer(bearer);
        if token.is_empty() {
            return Err(Error::Unauthenticated {
                message: "Kindly sign in as a user".to_string(),
            });
        }

        let data = decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                debug!("Rejected bearer token: {e}");
                Error::Unauthenticated {
                    message: "invalid or expired token".to_string(),
                }
            })?;

        let user_id = Uuid::parse_str(&data.claims.id).map_err(|_| Error::Unauthenticated {
            message: "malformed subject".to_string(),
        })?;

        let user = directory::find_user_by_id(&self.db, user_id)
            .await?
            .ok_or_else(|| Error::Unauthorized {
                message: "user no longer exists".to_string(),
            })?;

        Ok(Identity {
            user_id: user.id,
            role: user.role,
        })
    }
}
