//! Blocklist adapters implementing [`tokenward_core::RevocationLookup`].
//!
//! - `memory`: process-local blocklist for single-node deployments and tests
//! - `redis`: shared blocklist with TTLs matching token lifetimes
//!
//! Both keep a [`RevokedToken`] per `jti`, so revoked tokens can be listed
//! per identity as well as looked up.

pub mod entry;
pub mod memory;
pub mod redis;

pub use entry::RevokedToken;
pub use memory::MemoryBlocklist;
#[cfg(feature = "redis-blocklist")]
pub use self::redis::RedisBlocklist;
