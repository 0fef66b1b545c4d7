//! Revocation checking against a pluggable blocklist.

pub mod checker;

pub use checker::RevocationChecker;
