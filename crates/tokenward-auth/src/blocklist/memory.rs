//! In-memory blocklist keyed by `jti`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, info};

use tokenward_core::{BoxError, RevocationLookup, RevocationQuery};

use super::entry::RevokedToken;
use crate::jwt::ClaimSet;

/// Process-local blocklist.
///
/// Entries remember the token's expiry so [`MemoryBlocklist::purge_expired`]
/// can drop them once the token would be rejected as expired anyway.
/// Suitable for single-node deployments only.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlocklist {
    /// Revoked tokens keyed by `jti`.
    entries: Arc<DashMap<String, RevokedToken>>,
}

impl MemoryBlocklist {
    /// Creates an empty blocklist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Revokes the token described by a verified claim set.
    pub fn revoke(&self, claims: &ClaimSet) {
        self.insert(RevokedToken::from_claims(claims, Utc::now()));
    }

    /// Stores a revocation record, replacing any record for the same `jti`.
    pub fn insert(&self, entry: RevokedToken) {
        info!(jti = %entry.jti, token_type = %entry.token_type, "Token revoked");
        self.entries.insert(entry.jti.clone(), entry);
    }

    /// Lifts a revocation. Returns `false` if the `jti` was not revoked.
    pub fn unrevoke(&self, jti: &str) -> bool {
        let removed = self.entries.remove(jti).is_some();
        if removed {
            info!(jti = %jti, "Token revocation lifted");
        }
        removed
    }

    /// Returns `true` if the `jti` is revoked.
    pub fn contains(&self, jti: &str) -> bool {
        self.entries.contains_key(jti)
    }

    /// The revocation record for a `jti`, if any.
    pub fn get(&self, jti: &str) -> Option<RevokedToken> {
        self.entries.get(jti).map(|entry| entry.value().clone())
    }

    /// Revoked tokens of one identity, oldest revocation first.
    pub fn entries_for(&self, identity: &Value) -> Vec<RevokedToken> {
        let mut found: Vec<RevokedToken> = self
            .entries
            .iter()
            .filter(|entry| &entry.identity == identity)
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| a.revoked_at.cmp(&b.revoked_at).then_with(|| a.jti.cmp(&b.jti)));
        found
    }

    /// Every revoked token, oldest revocation first.
    pub fn entries(&self) -> Vec<RevokedToken> {
        let mut all: Vec<RevokedToken> = self.entries.iter().map(|entry| entry.value().clone()).collect();
        all.sort_by(|a, b| a.revoked_at.cmp(&b.revoked_at).then_with(|| a.jti.cmp(&b.jti)));
        all
    }

    /// Drops entries whose token has expired at `now`. Returns the number removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed = removed, "Purged expired blocklist entries");
        }
        removed
    }

    /// Number of revoked tokens tracked.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is revoked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl RevocationLookup for MemoryBlocklist {
    fn is_revoked(&self, query: &RevocationQuery<'_>) -> Result<bool, BoxError> {
        Ok(self.contains(query.jti))
    }
}
