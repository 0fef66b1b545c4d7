//! # tokenward-core
//!
//! Core crate for tokenward. Contains the error taxonomy shared by every
//! token operation, configuration schemas, the token type enum, and the
//! revocation lookup capability implemented by blocklist adapters.
//!
//! This crate has **no** internal dependencies on other tokenward crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AuthError, BoxError, ErrorKind};
pub use result::AuthResult;
pub use traits::{RevocationLookup, RevocationQuery};
pub use types::TokenType;
