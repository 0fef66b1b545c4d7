//! Revocation (blocklist) configuration.

use serde::{Deserialize, Serialize};

use crate::types::TokenType;

/// Which blocklist adapter the host wires into the token manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RevocationBackend {
    /// Revocation disabled; every verified token is accepted.
    #[default]
    None,
    /// Process-local blocklist.
    Memory,
    /// Redis-backed blocklist shared between processes.
    Redis,
}

/// Revocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationConfig {
    /// Blocklist backend.
    #[serde(default)]
    pub backend: RevocationBackend,
    /// Redis connection URL, used by the `redis` backend.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Token types looked up in the blocklist.
    #[serde(default = "default_token_checks")]
    pub token_checks: Vec<TokenType>,
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            backend: RevocationBackend::default(),
            redis_url: default_redis_url(),
            token_checks: default_token_checks(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_token_checks() -> Vec<TokenType> {
    TokenType::all().to_vec()
}
