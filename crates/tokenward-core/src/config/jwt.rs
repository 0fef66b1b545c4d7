//! Signing configuration.

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Algorithm names accepted in `algorithm` and `allowed_algorithms`.
pub const SUPPORTED_ALGORITHMS: &[&str] = &[
    "HS256", "HS384", "HS512", "RS256", "RS384", "RS512", "PS256", "PS384", "PS512", "ES256",
    "ES384", "EdDSA",
];

/// Signing and token lifetime configuration.
///
/// Built once at process start and treated as read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for HMAC signing (`HS*` algorithms).
    #[serde(default)]
    pub secret_key: String,
    /// Algorithm used to sign new tokens.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Algorithms accepted when decoding. Empty means `[algorithm]`.
    #[serde(default)]
    pub allowed_algorithms: Vec<String>,
    /// Default access token TTL in seconds. `None` issues non-expiring tokens.
    #[serde(default = "default_access_ttl")]
    pub access_ttl_seconds: Option<u64>,
    /// Default refresh token TTL in seconds. `None` issues non-expiring tokens.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_seconds: Option<u64>,
    /// Clock skew tolerance applied to `exp` and `nbf`.
    #[serde(default)]
    pub leeway_seconds: u64,
    /// Value of the `iss` claim; validated on decode when set.
    #[serde(default)]
    pub issuer: Option<String>,
    /// Value of the `aud` claim; validated on decode when set.
    #[serde(default)]
    pub audience: Option<String>,
    /// PEM private key for asymmetric algorithms.
    #[serde(default)]
    pub private_key_pem: Option<String>,
    /// PEM public key for asymmetric algorithms.
    #[serde(default)]
    pub public_key_pem: Option<String>,
}

impl JwtConfig {
    /// HMAC configuration with the given secret and library defaults.
    pub fn with_secret(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            algorithm: default_algorithm(),
            allowed_algorithms: Vec::new(),
            access_ttl_seconds: default_access_ttl(),
            refresh_ttl_seconds: default_refresh_ttl(),
            leeway_seconds: 0,
            issuer: None,
            audience: None,
            private_key_pem: None,
            public_key_pem: None,
        }
    }

    /// The algorithms accepted when decoding.
    pub fn effective_allowed_algorithms(&self) -> Vec<String> {
        if self.allowed_algorithms.is_empty() {
            vec![self.algorithm.clone()]
        } else {
            self.allowed_algorithms.clone()
        }
    }

    /// Returns `true` if the signing algorithm is an HMAC algorithm.
    pub fn is_hmac(&self) -> bool {
        self.algorithm.starts_with("HS")
    }

    /// Checks the configuration for mistakes that would otherwise surface
    /// only when the first token is issued or decoded.
    pub fn validate(&self) -> Result<(), AuthError> {
        let allowed = self.effective_allowed_algorithms();

        for name in std::iter::once(&self.algorithm).chain(allowed.iter()) {
            if !SUPPORTED_ALGORITHMS.contains(&name.as_str()) {
                return Err(AuthError::configuration(format!(
                    "Unsupported algorithm '{name}'"
                )));
            }
        }

        if !allowed.contains(&self.algorithm) {
            return Err(AuthError::configuration(format!(
                "Signing algorithm {} is missing from allowed_algorithms",
                self.algorithm
            )));
        }

        if self.is_hmac() {
            if self.secret_key.is_empty() {
                return Err(AuthError::configuration(
                    "secret_key must be set for HMAC algorithms",
                ));
            }
        } else if self.private_key_pem.is_none() || self.public_key_pem.is_none() {
            return Err(AuthError::configuration(format!(
                "private_key_pem and public_key_pem must be set for {}",
                self.algorithm
            )));
        }

        Ok(())
    }
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_access_ttl() -> Option<u64> {
    Some(15 * 60)
}

fn default_refresh_ttl() -> Option<u64> {
    Some(30 * 24 * 60 * 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = JwtConfig::with_secret("s3cret");
        assert_eq!(config.algorithm, "HS256");
        assert_eq!(config.access_ttl_seconds, Some(900));
        assert_eq!(config.effective_allowed_algorithms(), vec!["HS256"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_secret_rejected() {
        let config = JwtConfig::with_secret("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_signing_algorithm_must_be_allowed() {
        let mut config = JwtConfig::with_secret("s3cret");
        config.allowed_algorithms = vec!["HS512".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let mut config = JwtConfig::with_secret("s3cret");
        config.algorithm = "none".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_asymmetric_requires_pem() {
        let mut config = JwtConfig::with_secret("");
        config.algorithm = "RS256".to_string();
        let err = config.validate().expect_err("missing pem");
        assert!(err.message.contains("RS256"));
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: JwtConfig =
            serde_json::from_str(r#"{"secret_key":"abc","leeway_seconds":5}"#).expect("parse");
        assert_eq!(config.refresh_ttl_seconds, Some(2_592_000));
        assert_eq!(config.leeway_seconds, 5);
        assert!(config.issuer.is_none());
    }
}
