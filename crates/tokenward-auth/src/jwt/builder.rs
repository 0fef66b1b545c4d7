//! Claim set assembly for new tokens.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use tokenward_core::{AuthError, AuthResult, TokenType};

use super::claims::{ClaimSet, FreshClaim, RESERVED_CLAIMS};
use super::identity::IdentityCodec;

/// Callback producing custom claims for an identity at issuance.
pub type CustomClaimsFn<I> = Arc<dyn Fn(&I) -> Map<String, Value> + Send + Sync>;

/// Requested freshness of a new access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fresh {
    /// Obtained from primary credentials.
    #[default]
    Yes,
    /// Obtained through a refresh exchange.
    No,
    /// Fresh for this long after issuance, then non-fresh.
    For(Duration),
}

impl From<bool> for Fresh {
    fn from(fresh: bool) -> Self {
        if fresh { Self::Yes } else { Self::No }
    }
}

impl From<Duration> for Fresh {
    fn from(duration: Duration) -> Self {
        Self::For(duration)
    }
}

/// Assembles the standard and custom claims of a token.
pub struct ClaimsBuilder<I> {
    /// Converts identities into the `sub` claim.
    identity: IdentityCodec<I>,
    /// `iss` claim for new tokens.
    issuer: Option<String>,
    /// `aud` claim for new tokens.
    audience: Option<String>,
}

impl<I> Clone for ClaimsBuilder<I> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            issuer: self.issuer.clone(),
            audience: self.audience.clone(),
        }
    }
}

impl<I> std::fmt::Debug for ClaimsBuilder<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimsBuilder")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

impl<I> ClaimsBuilder<I> {
    /// Creates a builder using the given identity codec.
    pub fn new(identity: IdentityCodec<I>) -> Self {
        Self {
            identity,
            issuer: None,
            audience: None,
        }
    }

    /// Stamps `iss` and `aud` on every claim set.
    pub fn with_issuer_and_audience(mut self, issuer: Option<String>, audience: Option<String>) -> Self {
        self.issuer = issuer;
        self.audience = audience;
        self
    }

    /// The identity codec used for the `sub` claim.
    pub fn identity_codec(&self) -> &IdentityCodec<I> {
        &self.identity
    }

    /// Builds a claim set with a fresh random `jti`.
    ///
    /// `ttl = None` produces a token without `exp`. `fresh` is ignored for
    /// refresh tokens. The custom-claims callback is invoked once and fails
    /// the build with `ClaimCollision` if it returns a reserved claim name.
    pub fn build(
        &self,
        identity: &I,
        token_type: TokenType,
        ttl: Option<Duration>,
        fresh: Fresh,
        custom_claims: Option<&(dyn Fn(&I) -> Map<String, Value> + Send + Sync)>,
        now: DateTime<Utc>,
    ) -> AuthResult<ClaimSet> {
        let iat = now.timestamp();

        let exp = match ttl {
            Some(ttl) if ttl < Duration::zero() => {
                return Err(AuthError::configuration(format!(
                    "Token TTL must not be negative, got {}s",
                    ttl.num_seconds()
                )));
            }
            Some(ttl) => Some(iat.saturating_add(ttl.num_seconds())),
            None => None,
        };

        let fresh = match token_type {
            TokenType::Refresh => None,
            TokenType::Access => Some(match fresh {
                Fresh::Yes => FreshClaim::Flag(true),
                Fresh::No => FreshClaim::Flag(false),
                Fresh::For(duration) => FreshClaim::Until(iat.saturating_add(duration.num_seconds())),
            }),
        };

        let custom = match custom_claims {
            Some(callback) => {
                let claims = callback(identity);
                if let Some(key) = claims.keys().find(|k| RESERVED_CLAIMS.contains(&k.as_str())) {
                    return Err(AuthError::claim_collision(key));
                }
                claims
            }
            None => Map::new(),
        };

        Ok(ClaimSet {
            sub: self.identity.to_claim(identity)?,
            token_type,
            iat,
            nbf: iat,
            exp,
            fresh,
            jti: Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            custom,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokenward_core::ErrorKind;

    fn builder() -> ClaimsBuilder<String> {
        ClaimsBuilder::new(IdentityCodec::serde())
    }

    fn user() -> String {
        "user-1".to_string()
    }

    #[test]
    fn test_access_claims() {
        let now = Utc::now();
        let claims = builder()
            .build(&user(), TokenType::Access, Some(Duration::seconds(3600)), Fresh::Yes, None, now)
            .expect("build");
        assert_eq!(claims.sub, json!("user-1"));
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.nbf, claims.iat);
        assert_eq!(claims.exp, Some(now.timestamp() + 3600));
        assert_eq!(claims.fresh, Some(FreshClaim::Flag(true)));
        assert!(claims.custom.is_empty());
    }

    #[test]
    fn test_refresh_never_fresh() {
        let claims = builder()
            .build(&user(), TokenType::Refresh, None, Fresh::Yes, None, Utc::now())
            .expect("build");
        assert_eq!(claims.fresh, None);
        assert_eq!(claims.exp, None);
    }

    #[test]
    fn test_fresh_for_duration() {
        let now = Utc::now();
        let claims = builder()
            .build(
                &user(),
                TokenType::Access,
                None,
                Fresh::from(Duration::minutes(5)),
                None,
                now,
            )
            .expect("build");
        assert_eq!(claims.fresh, Some(FreshClaim::Until(now.timestamp() + 300)));
    }

    #[test]
    fn test_unique_jti() {
        let b = builder();
        let now = Utc::now();
        let first = b.build(&user(), TokenType::Access, None, Fresh::No, None, now).expect("build");
        let second = b.build(&user(), TokenType::Access, None, Fresh::No, None, now).expect("build");
        assert_ne!(first.jti, second.jti);
    }

    #[test]
    fn test_custom_claims_merged() {
        let callback = |identity: &String| {
            let mut claims = Map::new();
            claims.insert("owner".to_string(), json!(identity.clone()));
            claims
        };
        let claims = builder()
            .build(&user(), TokenType::Access, None, Fresh::Yes, Some(&callback), Utc::now())
            .expect("build");
        assert_eq!(claims.custom_claim("owner"), Some(&json!("user-1")));
    }

    #[test]
    fn test_custom_claims_collision() {
        let callback = |_: &String| {
            let mut claims = Map::new();
            claims.insert("jti".to_string(), json!("forged"));
            claims
        };
        let err = builder()
            .build(&user(), TokenType::Access, None, Fresh::Yes, Some(&callback), Utc::now())
            .expect_err("collision");
        assert_eq!(err.kind, ErrorKind::ClaimCollision);
        assert!(err.message.contains("jti"));
    }

    #[test]
    fn test_negative_ttl_rejected() {
        let err = builder()
            .build(
                &user(),
                TokenType::Access,
                Some(Duration::seconds(-1)),
                Fresh::Yes,
                None,
                Utc::now(),
            )
            .expect_err("negative ttl");
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[test]
    fn test_issuer_and_audience_stamped() {
        let claims = builder()
            .with_issuer_and_audience(Some("tokenward".to_string()), Some("api".to_string()))
            .build(&user(), TokenType::Refresh, None, Fresh::No, None, Utc::now())
            .expect("build");
        assert_eq!(claims.iss.as_deref(), Some("tokenward"));
        assert_eq!(claims.aud.as_deref(), Some("api"));
    }
}
