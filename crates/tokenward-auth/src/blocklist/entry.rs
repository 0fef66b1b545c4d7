//! Record kept for every revoked token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tokenward_core::TokenType;

use crate::jwt::ClaimSet;

/// A revoked token as stored by a blocklist adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevokedToken {
    /// JWT ID of the revoked token.
    pub jti: String,
    /// Access or refresh.
    pub token_type: TokenType,
    /// Encoded subject identity (`sub` claim).
    pub identity: Value,
    /// The token's `exp`; `None` for non-expiring tokens.
    pub expires_at: Option<i64>,
    /// When the revocation was recorded.
    pub revoked_at: i64,
}

impl RevokedToken {
    /// Record for the token described by `claims`, revoked at `now`.
    pub fn from_claims(claims: &ClaimSet, now: DateTime<Utc>) -> Self {
        Self {
            jti: claims.jti.clone(),
            token_type: claims.token_type,
            identity: claims.sub.clone(),
            expires_at: claims.exp,
            revoked_at: now.timestamp(),
        }
    }

    /// Returns `true` once the token would be rejected as expired anyway.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now.timestamp() >= exp)
    }
}
