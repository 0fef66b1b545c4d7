//! Unified error types for tokenward.
//!
//! Every failure raised by the token lifecycle engine is an [`AuthError`]
//! tagged with an [`ErrorKind`]. Host applications map the kind to their own
//! user-visible response; nothing inside the engine recovers from an error.

use std::fmt;
use thiserror::Error;

/// Boxed error used to carry the cause of an [`AuthError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error kind categorization for every token operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The token is structurally malformed or carries invalid claims.
    Decode,
    /// The token signature does not match the configured key.
    Signature,
    /// The token is past its `exp` claim.
    Expired,
    /// The token declares an algorithm outside the allowed set.
    Algorithm,
    /// The token's `jti` has been revoked.
    Revoked,
    /// The revocation backend failed to answer.
    RevocationCheck,
    /// The token is of the wrong type for the operation.
    InvalidTokenType,
    /// The operation needs a fresh access token.
    FreshTokenRequired,
    /// A custom claim would shadow a reserved claim.
    ClaimCollision,
    /// Signing a claim set failed.
    Encode,
    /// The identity codec could not convert an identity.
    Identity,
    /// The signing or revocation configuration is invalid.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode => write!(f, "DECODE"),
            Self::Signature => write!(f, "SIGNATURE"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::Algorithm => write!(f, "ALGORITHM"),
            Self::Revoked => write!(f, "REVOKED"),
            Self::RevocationCheck => write!(f, "REVOCATION_CHECK"),
            Self::InvalidTokenType => write!(f, "INVALID_TOKEN_TYPE"),
            Self::FreshTokenRequired => write!(f, "FRESH_TOKEN_REQUIRED"),
            Self::ClaimCollision => write!(f, "CLAIM_COLLISION"),
            Self::Encode => write!(f, "ENCODE"),
            Self::Identity => write!(f, "IDENTITY"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
        }
    }
}

/// The error returned by every tokenward operation.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AuthError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<BoxError>,
}

impl AuthError {
    /// Create a new error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new error from an already boxed cause.
    pub fn with_boxed_source(kind: ErrorKind, message: impl Into<String>, source: BoxError) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, message)
    }

    /// Create a signature error.
    pub fn signature() -> Self {
        Self::new(ErrorKind::Signature, "Signature verification failed")
    }

    /// Create an expired-token error.
    pub fn expired() -> Self {
        Self::new(ErrorKind::Expired, "Token has expired")
    }

    /// Create an algorithm error for the given header algorithm.
    pub fn algorithm(algorithm: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::Algorithm,
            format!("Algorithm {algorithm} is not allowed"),
        )
    }

    /// Create a revoked-token error.
    pub fn revoked(jti: &str) -> Self {
        Self::new(ErrorKind::Revoked, format!("Token {jti} has been revoked"))
    }

    /// Create a revocation backend error.
    pub fn revocation_check(source: BoxError) -> Self {
        let message = format!("Revocation lookup failed: {source}");
        Self::with_boxed_source(ErrorKind::RevocationCheck, message, source)
    }

    /// Create a token type mismatch error.
    pub fn invalid_token_type(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidTokenType, message)
    }

    /// Create a fresh-token-required error.
    pub fn fresh_token_required() -> Self {
        Self::new(ErrorKind::FreshTokenRequired, "Fresh token required")
    }

    /// Create a claim collision error for a reserved claim name.
    pub fn claim_collision(claim: &str) -> Self {
        Self::new(
            ErrorKind::ClaimCollision,
            format!("Custom claim '{claim}' collides with a reserved claim"),
        )
    }

    /// Create an encode error.
    pub fn encode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Encode, message)
    }

    /// Create an identity codec error.
    pub fn identity(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Identity, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Returns `true` when the error was caused by malformed or untrusted input.
    pub fn is_untrusted_input(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Decode | ErrorKind::Signature | ErrorKind::Expired | ErrorKind::Algorithm
        )
    }

    /// Returns `true` when the token is valid but fails a usage policy.
    pub fn is_policy_violation(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::InvalidTokenType | ErrorKind::FreshTokenRequired
        )
    }
}

impl Clone for AuthError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AuthError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
