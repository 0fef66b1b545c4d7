//! Configuration schemas.
//!
//! Configuration is deserialized from an optional TOML file merged with
//! `TOKENWARD__*` environment variables via the `config` crate.

pub mod jwt;
pub mod logging;
pub mod revocation;

use serde::{Deserialize, Serialize};

pub use self::jwt::JwtConfig;
pub use self::logging::LoggingConfig;
pub use self::revocation::{RevocationBackend, RevocationConfig};

use crate::error::AuthError;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Signing and token lifetime settings.
    pub jwt: JwtConfig,
    /// Blocklist settings.
    #[serde(default)]
    pub revocation: RevocationConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file and the environment.
    ///
    /// The file is optional; environment variables prefixed with `TOKENWARD`
    /// (e.g. `TOKENWARD__JWT__SECRET_KEY`) override it. The signing section
    /// is validated before returning.
    pub fn load(path: &str) -> Result<Self, AuthError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("TOKENWARD")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("jwt.allowed_algorithms")
                    .with_list_parse_key("revocation.token_checks")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AuthError::configuration(format!("Failed to build config: {e}")))?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| AuthError::configuration(format!("Failed to deserialize config: {e}")))?;

        loaded.jwt.validate()?;
        tracing::debug!(
            path = %path,
            algorithm = %loaded.jwt.algorithm,
            backend = ?loaded.revocation.backend,
            "Configuration loaded"
        );
        Ok(loaded)
    }
}
