//! Fresh-token tracking for operations gated on primary credentials.

use chrono::{DateTime, Utc};

use tokenward_core::{AuthError, AuthResult};

use super::claims::{ClaimSet, FreshClaim};

/// Returns whether an access token is fresh at `now`.
///
/// A timestamp freshness claim stays fresh while `now` is strictly before it.
/// Refresh tokens have no freshness and are rejected with `InvalidTokenType`.
pub fn is_fresh(claims: &ClaimSet, now: DateTime<Utc>) -> AuthResult<bool> {
    if !claims.is_access() {
        return Err(AuthError::invalid_token_type(
            "Freshness only applies to access tokens",
        ));
    }

    Ok(match claims.fresh {
        Some(FreshClaim::Flag(fresh)) => fresh,
        Some(FreshClaim::Until(until)) => now.timestamp() < until,
        None => false,
    })
}

/// Fails with `FreshTokenRequired` unless the token is fresh at `now`.
pub fn require_fresh(claims: &ClaimSet, now: DateTime<Utc>) -> AuthResult<()> {
    if is_fresh(claims, now)? {
        Ok(())
    } else {
        Err(AuthError::fresh_token_required())
    }
}
