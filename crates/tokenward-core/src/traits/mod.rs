//! Capability traits defined in `tokenward-core` and implemented by other crates.

pub mod revocation;

pub use revocation::{RevocationLookup, RevocationQuery};
