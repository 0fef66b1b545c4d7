//! # tokenward-auth
//!
//! Token lifecycle engine for tokenward: issues, verifies, refreshes, and
//! checks revocation of JSON Web Tokens.
//!
//! ## Modules
//!
//! - `jwt`: claim sets, signing/verification, claim assembly, freshness
//! - `revocation`: blocklist verdicts through a pluggable lookup
//! - `blocklist`: in-memory and Redis lookup adapters
//! - `manager`: the public issue / verify / refresh operations

pub mod blocklist;
pub mod jwt;
pub mod manager;
pub mod revocation;

pub use blocklist::{MemoryBlocklist, RevokedToken};
#[cfg(feature = "redis-blocklist")]
pub use blocklist::RedisBlocklist;
pub use jwt::{ClaimSet, ClaimsBuilder, Fresh, FreshClaim, IdentityCodec, JwtCodec};
pub use manager::{AccessTokenOptions, IssuedToken, TokenManager, TokenManagerBuilder, TokenPair, Ttl};
pub use revocation::RevocationChecker;
