//! Blocklist verdicts for decoded tokens.

use std::sync::Arc;

use tracing::{debug, warn};

use tokenward_core::{AuthError, AuthResult, RevocationLookup, RevocationQuery, TokenType};

use crate::jwt::ClaimSet;

/// Decides whether a decoded token has been revoked.
///
/// Holds no storage of its own. Without a lookup every token is reported
/// as not revoked; lookup failures are returned as `RevocationCheck` errors.
#[derive(Debug, Clone)]
pub struct RevocationChecker {
    /// Injected blocklist backend.
    lookup: Option<Arc<dyn RevocationLookup>>,
    /// Token types that are looked up.
    checked_types: Vec<TokenType>,
}

impl Default for RevocationChecker {
    fn default() -> Self {
        Self::disabled()
    }
}

impl RevocationChecker {
    /// A checker that never reports a token as revoked.
    pub fn disabled() -> Self {
        Self {
            lookup: None,
            checked_types: TokenType::all().to_vec(),
        }
    }

    /// A checker backed by `lookup`, checking both token types.
    pub fn new(lookup: Arc<dyn RevocationLookup>) -> Self {
        Self {
            lookup: Some(lookup),
            checked_types: TokenType::all().to_vec(),
        }
    }

    /// Restricts lookups to the given token types.
    pub fn with_checked_types(mut self, types: impl IntoIterator<Item = TokenType>) -> Self {
        self.checked_types = types.into_iter().collect();
        self
    }

    /// Returns `true` if a lookup backend is configured.
    pub fn is_enabled(&self) -> bool {
        self.lookup.is_some()
    }

    /// Returns whether the token described by `claims` has been revoked.
    pub fn is_revoked(&self, claims: &ClaimSet) -> AuthResult<bool> {
        let Some(lookup) = &self.lookup else {
            return Ok(false);
        };

        if !self.checked_types.contains(&claims.token_type) {
            debug!(jti = %claims.jti, token_type = %claims.token_type, "Token type not subject to revocation checks");
            return Ok(false);
        }

        let query = RevocationQuery {
            jti: &claims.jti,
            token_type: claims.token_type,
            identity: &claims.sub,
        };

        lookup.is_revoked(&query).map_err(|e| {
            warn!(jti = %claims.jti, error = %e, "Revocation lookup failed");
            AuthError::revocation_check(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::{Map, json};
    use tokenward_core::{BoxError, ErrorKind};

    use crate::jwt::FreshClaim;

    #[derive(Debug, Default)]
    struct StaticLookup {
        revoked_jti: String,
        calls: AtomicUsize,
    }

    impl RevocationLookup for StaticLookup {
        fn is_revoked(&self, query: &RevocationQuery<'_>) -> Result<bool, BoxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(query.jti == self.revoked_jti)
        }
    }

    #[derive(Debug)]
    struct BrokenLookup;

    impl RevocationLookup for BrokenLookup {
        fn is_revoked(&self, _query: &RevocationQuery<'_>) -> Result<bool, BoxError> {
            Err("backend unavailable".into())
        }
    }

    fn claims(jti: &str, token_type: TokenType) -> ClaimSet {
        ClaimSet {
            sub: json!("user-1"),
            token_type,
            iat: 0,
            nbf: 0,
            exp: None,
            fresh: (token_type == TokenType::Access).then_some(FreshClaim::Flag(true)),
            jti: jti.to_string(),
            iss: None,
            aud: None,
            custom: Map::new(),
        }
    }

    #[test]
    fn test_disabled_never_revoked() {
        let checker = RevocationChecker::disabled();
        assert!(!checker.is_enabled());
        assert!(!checker.is_revoked(&claims("x", TokenType::Access)).expect("check"));
    }

    #[test]
    fn test_lookup_verdict() {
        let lookup = Arc::new(StaticLookup {
            revoked_jti: "x".to_string(),
            ..Default::default()
        });
        let checker = RevocationChecker::new(lookup);
        assert!(checker.is_revoked(&claims("x", TokenType::Access)).expect("check"));
        assert!(!checker.is_revoked(&claims("y", TokenType::Refresh)).expect("check"));
    }

    #[test]
    fn test_unchecked_type_skips_lookup() {
        let lookup = Arc::new(StaticLookup {
            revoked_jti: "x".to_string(),
            ..Default::default()
        });
        let checker =
            RevocationChecker::new(lookup.clone()).with_checked_types([TokenType::Refresh]);
        assert!(!checker.is_revoked(&claims("x", TokenType::Access)).expect("check"));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
        assert!(checker.is_revoked(&claims("x", TokenType::Refresh)).expect("check"));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backend_failure_propagates() {
        let checker = RevocationChecker::new(Arc::new(BrokenLookup));
        let err = checker
            .is_revoked(&claims("x", TokenType::Access))
            .expect_err("backend failure");
        assert_eq!(err.kind, ErrorKind::RevocationCheck);
        assert!(err.message.contains("backend unavailable"));
    }
}
