//! Revocation lookup capability for pluggable blocklist backends.

use std::fmt;

use serde_json::Value;

use crate::error::BoxError;
use crate::types::TokenType;

/// The facts about a verified token that a blocklist may key on.
#[derive(Debug, Clone, Copy)]
pub struct RevocationQuery<'a> {
    /// Unique token identifier (`jti` claim).
    pub jti: &'a str,
    /// Token type (`type` claim).
    pub token_type: TokenType,
    /// Encoded subject identity (`sub` claim).
    pub identity: &'a Value,
}

/// Trait for blocklist backends (in-memory set, Redis, SQL table, ...).
///
/// Implementations answer one question: should the token described by the
/// query be rejected despite a valid signature. Backend failures must be
/// returned as `Err` and never folded into a `true`/`false` verdict.
///
/// Lookups are synchronous. A network-backed store blocks inside this call;
/// callers that need a deadline apply it around the whole operation.
pub trait RevocationLookup: Send + Sync + fmt::Debug + 'static {
    /// Returns `true` if the token has been revoked.
    fn is_revoked(&self, query: &RevocationQuery<'_>) -> Result<bool, BoxError>;
}
