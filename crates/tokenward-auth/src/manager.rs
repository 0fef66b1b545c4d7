//! Token lifecycle management: issue, verify, refresh.
//!
//! [`TokenManager`] coordinates:
//! - Creation of access and refresh tokens through [`ClaimsBuilder`]
//! - Signing and verification through [`JwtCodec`]
//! - Revocation checks through [`RevocationChecker`]
//! - Exchange of refresh tokens for non-fresh access tokens
//!
//! A token moves through `issued → active → (expired | revoked)`. A refresh
//! token that has been exchanged is not modified; blocklisting it is up to
//! the caller. A token without `exp` issued while revocation is disabled
//! stays valid until the signing key is rotated.
//!
//! The manager holds only immutable configuration and shared handles, so it
//! can be used concurrently without locking.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use tokenward_core::config::JwtConfig;
use tokenward_core::{AuthError, AuthResult, RevocationLookup, TokenType};

use crate::jwt::{ClaimSet, ClaimsBuilder, CustomClaimsFn, Fresh, IdentityCodec, JwtCodec, freshness};
use crate::revocation::RevocationChecker;

/// Lifetime requested for a new token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ttl {
    /// The configured lifetime for the token type.
    #[default]
    Default,
    /// No `exp` claim.
    Never,
    /// Expire this long after issuance.
    After(Duration),
}

/// Options for [`TokenManager::issue_access_token`].
#[derive(Debug, Clone, Default)]
pub struct AccessTokenOptions {
    /// Freshness of the token; fresh by default.
    pub fresh: Fresh,
    /// Lifetime of the token.
    pub ttl: Ttl,
    /// Claims for this token only. `None` uses the configured callback.
    pub custom_claims: Option<Map<String, Value>>,
}

impl AccessTokenOptions {
    /// Options with the given freshness and defaults otherwise.
    pub fn fresh(fresh: impl Into<Fresh>) -> Self {
        Self {
            fresh: fresh.into(),
            ..Self::default()
        }
    }

    /// Sets the lifetime.
    pub fn with_ttl(mut self, ttl: Ttl) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets per-token custom claims.
    pub fn with_custom_claims(mut self, claims: Map<String, Value>) -> Self {
        self.custom_claims = Some(claims);
        self
    }
}

/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Compact JWT string handed to the client.
    pub encoded: String,
    /// Claims embedded in the token.
    pub claims: ClaimSet,
}

impl IssuedToken {
    /// The compact JWT string.
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// The token's `jti`.
    pub fn jti(&self) -> &str {
        &self.claims.jti
    }

    /// Expiration, or `None` for non-expiring tokens.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims.expires_at()
    }
}

/// Result of a successful token pair generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Fresh access token.
    pub access_token: String,
    /// Refresh token for later exchanges.
    pub refresh_token: String,
    /// Access token expiration timestamp.
    pub access_expires_at: Option<DateTime<Utc>>,
    /// Refresh token expiration timestamp.
    pub refresh_expires_at: Option<DateTime<Utc>>,
}

/// Issues, verifies, and refreshes tokens for identities of type `I`.
pub struct TokenManager<I = String> {
    /// Signs and verifies tokens.
    codec: JwtCodec,
    /// Assembles claim sets.
    claims: ClaimsBuilder<I>,
    /// Blocklist verdicts.
    revocation: RevocationChecker,
    /// Default access token lifetime.
    access_ttl: Option<Duration>,
    /// Default refresh token lifetime.
    refresh_ttl: Option<Duration>,
    /// Custom claims for directly issued access tokens.
    custom_claims: Option<CustomClaimsFn<I>>,
    /// Custom claims for access tokens minted by a refresh exchange.
    refresh_claims: Option<CustomClaimsFn<I>>,
}

impl<I> Clone for TokenManager<I> {
    fn clone(&self) -> Self {
        Self {
            codec: self.codec.clone(),
            claims: self.claims.clone(),
            revocation: self.revocation.clone(),
            access_ttl: self.access_ttl,
            refresh_ttl: self.refresh_ttl,
            custom_claims: self.custom_claims.clone(),
            refresh_claims: self.refresh_claims.clone(),
        }
    }
}

impl<I> std::fmt::Debug for TokenManager<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("codec", &self.codec)
            .field("revocation", &self.revocation)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("custom_claims", &self.custom_claims.is_some())
            .field("refresh_claims", &self.refresh_claims.is_some())
            .finish()
    }
}

impl<I> TokenManager<I>
where
    I: Serialize + DeserializeOwned + 'static,
{
    /// Starts building a manager that stores identities as serde JSON.
    pub fn builder(config: &JwtConfig) -> TokenManagerBuilder<I> {
        TokenManagerBuilder::new(config, IdentityCodec::serde())
    }
}

impl<I> TokenManager<I> {
    /// Starts building a manager with an explicit identity codec.
    pub fn builder_with_codec(config: &JwtConfig, identity: IdentityCodec<I>) -> TokenManagerBuilder<I> {
        TokenManagerBuilder::new(config, identity)
    }

    /// The codec used to sign and verify tokens.
    pub fn codec(&self) -> &JwtCodec {
        &self.codec
    }

    /// The revocation checker consulted by [`TokenManager::verify`].
    pub fn revocation(&self) -> &RevocationChecker {
        &self.revocation
    }

    /// Issues an access token for `identity`.
    pub fn issue_access_token(&self, identity: &I, options: AccessTokenOptions) -> AuthResult<IssuedToken> {
        let ttl = self.resolve_ttl(options.ttl, self.access_ttl);
        match options.custom_claims {
            Some(claims) => {
                let per_token = move |_: &I| claims.clone();
                self.issue(identity, TokenType::Access, ttl, options.fresh, Some(&per_token))
            }
            None => self.issue(
                identity,
                TokenType::Access,
                ttl,
                options.fresh,
                self.custom_claims.as_deref(),
            ),
        }
    }

    /// Issues a refresh token for `identity`. Refresh tokens carry no freshness.
    pub fn issue_refresh_token(&self, identity: &I, ttl: Ttl) -> AuthResult<IssuedToken> {
        let ttl = self.resolve_ttl(ttl, self.refresh_ttl);
        self.issue(identity, TokenType::Refresh, ttl, Fresh::No, None)
    }

    /// Issues a fresh access token and a refresh token, as done at login.
    pub fn issue_token_pair(&self, identity: &I) -> AuthResult<TokenPair> {
        let access = self.issue_access_token(identity, AccessTokenOptions::default())?;
        let refresh = self.issue_refresh_token(identity, Ttl::Default)?;

        Ok(TokenPair {
            access_expires_at: access.expires_at(),
            refresh_expires_at: refresh.expires_at(),
            access_token: access.encoded,
            refresh_token: refresh.encoded,
        })
    }

    /// Verifies a token and returns its claims.
    ///
    /// Checks, in order:
    /// 1. Header algorithm, signature, expiry, and claim structure
    /// 2. Revocation
    /// 3. Token type, if `expected_type` is given
    ///
    /// Nothing about the token (not even its type) is reported before the
    /// signature and expiry are confirmed, and an expired token is reported
    /// as expired even if it is also revoked.
    pub fn verify(&self, token: &str, expected_type: Option<TokenType>) -> AuthResult<ClaimSet> {
        self.verify_at(token, expected_type, Utc::now())
    }

    /// Same as [`TokenManager::verify`], evaluated at `now`.
    pub fn verify_at(
        &self,
        token: &str,
        expected_type: Option<TokenType>,
        now: DateTime<Utc>,
    ) -> AuthResult<ClaimSet> {
        let claims = self.codec.decode_at(token, now).inspect_err(|e| {
            debug!(kind = %e.kind, "Token rejected by codec");
        })?;

        if self.revocation.is_revoked(&claims)? {
            warn!(jti = %claims.jti, token_type = %claims.token_type, "Rejected revoked token");
            return Err(AuthError::revoked(&claims.jti));
        }

        if let Some(expected) = expected_type {
            if claims.token_type != expected {
                return Err(AuthError::invalid_token_type(format!(
                    "Only {expected} tokens are allowed, got a {} token",
                    claims.token_type
                )));
            }
        }

        debug!(jti = %claims.jti, token_type = %claims.token_type, "Token verified");
        Ok(claims)
    }

    /// Checks signature, expiry, and structure without consulting the
    /// blocklist. For inspecting tokens that may already be revoked; never
    /// use it to authorize a request.
    pub fn decode(&self, token: &str) -> AuthResult<ClaimSet> {
        self.codec.decode(token)
    }

    /// Exchanges a refresh token for a new, non-fresh access token.
    ///
    /// Custom claims come only from the refresh-claims callback configured on
    /// the builder; without one the new token carries none.
    pub fn refresh_access_token(&self, refresh_token: &str) -> AuthResult<IssuedToken> {
        self.exchange(refresh_token, self.refresh_claims.as_deref())
    }

    /// Exchanges a refresh token, taking custom claims from `claims_fn`.
    pub fn refresh_access_token_with<F>(&self, refresh_token: &str, claims_fn: F) -> AuthResult<IssuedToken>
    where
        F: Fn(&I) -> Map<String, Value> + Send + Sync,
    {
        self.exchange(refresh_token, Some(&claims_fn))
    }

    /// Returns whether an access token is fresh at `now`.
    pub fn is_fresh(&self, claims: &ClaimSet, now: DateTime<Utc>) -> AuthResult<bool> {
        freshness::is_fresh(claims, now)
    }

    /// Fails with `FreshTokenRequired` unless the access token is fresh at `now`.
    pub fn require_fresh(&self, claims: &ClaimSet, now: DateTime<Utc>) -> AuthResult<()> {
        freshness::require_fresh(claims, now)
    }

    /// Decodes the identity carried in a verified claim set.
    pub fn identity(&self, claims: &ClaimSet) -> AuthResult<I> {
        self.claims.identity_codec().from_claim(&claims.sub)
    }

    /// Custom claims carried in a verified claim set.
    pub fn custom_claims<'a>(&self, claims: &'a ClaimSet) -> &'a Map<String, Value> {
        &claims.custom
    }

    /// Returns the `jti` of a token after full verification.
    pub fn peek_jti(&self, token: &str) -> AuthResult<String> {
        self.verify(token, None).map(|claims| claims.jti)
    }

    fn exchange(
        &self,
        refresh_token: &str,
        claims_fn: Option<&(dyn Fn(&I) -> Map<String, Value> + Send + Sync)>,
    ) -> AuthResult<IssuedToken> {
        let refresh = self.verify(refresh_token, Some(TokenType::Refresh))?;
        let identity = self.identity(&refresh)?;

        let issued = self.issue(&identity, TokenType::Access, self.access_ttl, Fresh::No, claims_fn)?;
        debug!(
            refresh_jti = %refresh.jti,
            access_jti = %issued.claims.jti,
            "Refresh token exchanged"
        );
        Ok(issued)
    }

    fn issue(
        &self,
        identity: &I,
        token_type: TokenType,
        ttl: Option<Duration>,
        fresh: Fresh,
        claims_fn: Option<&(dyn Fn(&I) -> Map<String, Value> + Send + Sync)>,
    ) -> AuthResult<IssuedToken> {
        let claims = self
            .claims
            .build(identity, token_type, ttl, fresh, claims_fn, Utc::now())?;
        let encoded = self.codec.encode(&claims)?;
        debug!(jti = %claims.jti, token_type = %token_type, exp = ?claims.exp, "Token issued");
        Ok(IssuedToken { encoded, claims })
    }

    fn resolve_ttl(&self, ttl: Ttl, default: Option<Duration>) -> Option<Duration> {
        match ttl {
            Ttl::Default => default,
            Ttl::Never => None,
            Ttl::After(duration) => Some(duration),
        }
    }
}

/// Builder for [`TokenManager`].
///
/// Callbacks and the revocation backend are fixed at build time; the
/// resulting manager cannot be reconfigured.
pub struct TokenManagerBuilder<I> {
    config: JwtConfig,
    identity: IdentityCodec<I>,
    custom_claims: Option<CustomClaimsFn<I>>,
    refresh_claims: Option<CustomClaimsFn<I>>,
    lookup: Option<Arc<dyn RevocationLookup>>,
    checked_types: Vec<TokenType>,
}

impl<I> TokenManagerBuilder<I> {
    fn new(config: &JwtConfig, identity: IdentityCodec<I>) -> Self {
        Self {
            config: config.clone(),
            identity,
            custom_claims: None,
            refresh_claims: None,
            lookup: None,
            checked_types: TokenType::all().to_vec(),
        }
    }

    /// Callback adding custom claims to directly issued access tokens.
    pub fn custom_claims<F>(mut self, callback: F) -> Self
    where
        F: Fn(&I) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.custom_claims = Some(Arc::new(callback));
        self
    }

    /// Callback adding custom claims to access tokens minted by a refresh exchange.
    pub fn refresh_claims<F>(mut self, callback: F) -> Self
    where
        F: Fn(&I) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.refresh_claims = Some(Arc::new(callback));
        self
    }

    /// Enables revocation checks against `lookup`.
    pub fn revocation_lookup(mut self, lookup: Arc<dyn RevocationLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Token types checked against the blocklist (both by default).
    pub fn revocation_checks(mut self, types: impl IntoIterator<Item = TokenType>) -> Self {
        self.checked_types = types.into_iter().collect();
        self
    }

    /// Builds the manager, validating the signing configuration.
    pub fn build(self) -> AuthResult<TokenManager<I>> {
        let codec = JwtCodec::new(&self.config)?;
        let claims = ClaimsBuilder::new(self.identity)
            .with_issuer_and_audience(self.config.issuer.clone(), self.config.audience.clone());

        let revocation = match self.lookup {
            Some(lookup) => RevocationChecker::new(lookup).with_checked_types(self.checked_types),
            None => RevocationChecker::disabled(),
        };

        Ok(TokenManager {
            codec,
            claims,
            revocation,
            access_ttl: self.config.access_ttl_seconds.map(seconds),
            refresh_ttl: self.config.refresh_ttl_seconds.map(seconds),
            custom_claims: self.custom_claims,
            refresh_claims: self.refresh_claims,
        })
    }
}

fn seconds(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokenward_core::ErrorKind;

    use crate::blocklist::MemoryBlocklist;

    fn config() -> JwtConfig {
        JwtConfig::with_secret("manager-test-secret")
    }

    fn manager() -> TokenManager<String> {
        TokenManager::builder(&config()).build().expect("manager")
    }

    fn user() -> String {
        "user-1".to_string()
    }

    #[test]
    fn test_issue_and_verify_access() {
        let manager = manager();
        let issued = manager
            .issue_access_token(&user(), AccessTokenOptions::default())
            .expect("issue");
        let claims = manager
            .verify(issued.as_str(), Some(TokenType::Access))
            .expect("verify");
        assert_eq!(claims, issued.claims);
        assert_eq!(manager.identity(&claims).expect("identity"), "user-1");
        assert_eq!(claims.exp, Some(claims.iat + 900));
    }

    #[test]
    fn test_type_mismatch() {
        let manager = manager();
        let refresh = manager.issue_refresh_token(&user(), Ttl::Default).expect("issue");
        let err = manager
            .verify(refresh.as_str(), Some(TokenType::Access))
            .expect_err("type");
        assert_eq!(err.kind, ErrorKind::InvalidTokenType);
    }

    #[test]
    fn test_expired_reported_before_revoked() {
        let blocklist = MemoryBlocklist::new();
        let manager = TokenManager::<String>::builder(&config())
            .revocation_lookup(Arc::new(blocklist.clone()))
            .build()
            .expect("manager");
        let issued = manager
            .issue_access_token(&user(), AccessTokenOptions::default())
            .expect("issue");
        blocklist.revoke(&issued.claims);

        let after_expiry = Utc::now() + Duration::hours(1);
        let err = manager
            .verify_at(issued.as_str(), None, after_expiry)
            .expect_err("expired");
        assert_eq!(err.kind, ErrorKind::Expired);

        let err = manager.verify(issued.as_str(), None).expect_err("revoked");
        assert_eq!(err.kind, ErrorKind::Revoked);
    }

    #[test]
    fn test_revoked_reported_before_type_mismatch() {
        let blocklist = MemoryBlocklist::new();
        let manager = TokenManager::<String>::builder(&config())
            .revocation_lookup(Arc::new(blocklist.clone()))
            .build()
            .expect("manager");
        let issued = manager
            .issue_access_token(&user(), AccessTokenOptions::default())
            .expect("issue");
        blocklist.revoke(&issued.claims);
        let err = manager
            .verify(issued.as_str(), Some(TokenType::Refresh))
            .expect_err("revoked");
        assert_eq!(err.kind, ErrorKind::Revoked);
    }

    #[test]
    fn test_per_token_claims_override_callback() {
        let manager = TokenManager::<String>::builder(&config())
            .custom_claims(|_| {
                let mut claims = Map::new();
                claims.insert("role".to_string(), json!("viewer"));
                claims
            })
            .build()
            .expect("manager");

        let default = manager
            .issue_access_token(&user(), AccessTokenOptions::default())
            .expect("issue");
        assert_eq!(default.claims.custom_claim("role"), Some(&json!("viewer")));

        let mut per_token = Map::new();
        per_token.insert("scope".to_string(), json!("read"));
        let issued = manager
            .issue_access_token(&user(), AccessTokenOptions::default().with_custom_claims(per_token))
            .expect("issue");
        assert_eq!(issued.claims.custom_claim("scope"), Some(&json!("read")));
        assert!(issued.claims.custom_claim("role").is_none());
    }

    #[test]
    fn test_refresh_drops_custom_claims_without_callback() {
        let manager = TokenManager::<String>::builder(&config())
            .custom_claims(|_| {
                let mut claims = Map::new();
                claims.insert("role".to_string(), json!("admin"));
                claims
            })
            .build()
            .expect("manager");
        let refresh = manager.issue_refresh_token(&user(), Ttl::Default).expect("issue");
        let access = manager.refresh_access_token(refresh.as_str()).expect("refresh");
        assert!(access.claims.custom.is_empty());
    }

    #[test]
    fn test_refresh_claims_callback() {
        let manager = TokenManager::<String>::builder(&config())
            .refresh_claims(|identity| {
                let mut claims = Map::new();
                claims.insert("via".to_string(), json!(format!("refresh:{identity}")));
                claims
            })
            .build()
            .expect("manager");
        let refresh = manager.issue_refresh_token(&user(), Ttl::Default).expect("issue");
        let access = manager.refresh_access_token(refresh.as_str()).expect("refresh");
        assert_eq!(access.claims.custom_claim("via"), Some(&json!("refresh:user-1")));

        let access = manager
            .refresh_access_token_with(refresh.as_str(), |_| {
                let mut claims = Map::new();
                claims.insert("per_call".to_string(), json!(true));
                claims
            })
            .expect("refresh");
        assert_eq!(access.claims.custom_claim("per_call"), Some(&json!(true)));
        assert!(access.claims.custom_claim("via").is_none());
    }

    #[test]
    fn test_refresh_rejects_access_token() {
        let manager = manager();
        let access = manager
            .issue_access_token(&user(), AccessTokenOptions::default())
            .expect("issue");
        let err = manager
            .refresh_access_token(access.as_str())
            .expect_err("access token");
        assert_eq!(err.kind, ErrorKind::InvalidTokenType);
    }

    #[test]
    fn test_never_expiring_ttl() {
        let manager = manager();
        let issued = manager
            .issue_access_token(&user(), AccessTokenOptions::default().with_ttl(Ttl::Never))
            .expect("issue");
        assert_eq!(issued.claims.exp, None);
        assert!(issued.expires_at().is_none());
        let far_future = Utc::now() + Duration::days(365 * 20);
        assert!(manager.verify_at(issued.as_str(), None, far_future).is_ok());
    }

    #[test]
    fn test_token_pair() {
        let manager = manager();
        let pair = manager.issue_token_pair(&user()).expect("pair");
        let access = manager
            .verify(&pair.access_token, Some(TokenType::Access))
            .expect("access");
        let refresh = manager
            .verify(&pair.refresh_token, Some(TokenType::Refresh))
            .expect("refresh");
        assert!(manager.is_fresh(&access, Utc::now()).expect("fresh"));
        assert!(refresh.exp > access.exp);
        assert_eq!(pair.access_expires_at, access.expires_at());
    }

    #[test]
    fn test_peek_jti() {
        let manager = manager();
        let issued = manager.issue_refresh_token(&user(), Ttl::Default).expect("issue");
        assert_eq!(manager.peek_jti(issued.as_str()).expect("jti"), issued.jti());
    }

    #[test]
    fn test_decode_skips_revocation() {
        let blocklist = MemoryBlocklist::new();
        let manager = TokenManager::<String>::builder(&config())
            .revocation_lookup(Arc::new(blocklist.clone()))
            .build()
            .expect("manager");
        let issued = manager.issue_refresh_token(&user(), Ttl::Default).expect("issue");
        blocklist.revoke(&issued.claims);

        assert_eq!(manager.verify(issued.as_str(), None).expect_err("revoked").kind, ErrorKind::Revoked);
        assert_eq!(manager.decode(issued.as_str()).expect("decode").jti, issued.jti());
    }

    #[test]
    fn test_invalid_config_fails_build() {
        let err = TokenManager::<String>::builder(&JwtConfig::with_secret(""))
            .build()
            .expect_err("empty secret");
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}
