//! JWT claim set carried by access and refresh tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use tokenward_core::TokenType;

/// Claim names owned by the lifecycle engine. Custom claims may not use them.
pub const RESERVED_CLAIMS: &[&str] = &["sub", "type", "iat", "nbf", "exp", "fresh", "jti", "iss", "aud"];

/// Freshness as stored in the `fresh` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FreshClaim {
    /// Fresh (or not) for the whole lifetime of the token.
    Flag(bool),
    /// Fresh until this timestamp (seconds since epoch).
    Until(i64),
}

/// Payload embedded in every token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSet {
    /// Subject: the encoded identity.
    pub sub: Value,
    /// Token type: access or refresh.
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Not-before timestamp, equal to `iat`.
    pub nbf: i64,
    /// Expiration timestamp; absent for non-expiring tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Freshness; only present on access tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fresh: Option<FreshClaim>,
    /// JWT ID for blocklist tracking.
    pub jti: String,
    /// Issuer, when configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Audience, when configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    /// Caller-supplied claims merged at issuance.
    #[serde(flatten)]
    pub custom: Map<String, Value>,
}

impl ClaimSet {
    /// Returns `true` for access tokens.
    pub fn is_access(&self) -> bool {
        self.token_type == TokenType::Access
    }

    /// Returns `true` for refresh tokens.
    pub fn is_refresh(&self) -> bool {
        self.token_type == TokenType::Refresh
    }

    /// Returns the issued-at time as a `DateTime<Utc>`.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    /// Returns the expiration as a `DateTime<Utc>`, or `None` if the token never expires.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    /// Checks whether this token has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp.is_some_and(|exp| now.timestamp() >= exp)
    }

    /// Returns the remaining lifetime in seconds (0 if expired, `None` if it never expires).
    pub fn remaining_ttl_seconds(&self, now: DateTime<Utc>) -> Option<u64> {
        self.exp.map(|exp| {
            let remaining = exp - now.timestamp();
            if remaining > 0 { remaining as u64 } else { 0 }
        })
    }

    /// Returns a custom claim by name.
    pub fn custom_claim(&self, name: &str) -> Option<&Value> {
        self.custom.get(name)
    }
}
