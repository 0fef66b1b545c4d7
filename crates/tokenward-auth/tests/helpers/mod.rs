//! Shared fixtures for lifecycle integration tests.

use std::sync::Arc;

use tokenward_auth::{MemoryBlocklist, TokenManager};
use tokenward_core::config::JwtConfig;

pub const SECRET: &str = "integration-test-secret";

pub fn config() -> JwtConfig {
    JwtConfig::with_secret(SECRET)
}

/// Manager without revocation checks.
pub fn manager() -> TokenManager<String> {
    TokenManager::builder(&config())
        .build()
        .expect("failed to build test manager")
}

/// Manager backed by an in-memory blocklist, returned alongside it.
pub fn manager_with_blocklist() -> (TokenManager<String>, MemoryBlocklist) {
    let blocklist = MemoryBlocklist::new();
    let manager = TokenManager::builder(&config())
        .revocation_lookup(Arc::new(blocklist.clone()))
        .build()
        .expect("failed to build test manager");
    (manager, blocklist)
}

pub fn user() -> String {
    "user-1".to_string()
}
