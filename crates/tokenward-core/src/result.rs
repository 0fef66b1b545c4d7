//! Convenience result type alias for tokenward.

use crate::error::AuthError;

/// A specialized `Result` type for token operations.
///
/// Every public operation of the lifecycle engine returns this type so
/// callers can match on [`crate::ErrorKind`] in one place.
pub type AuthResult<T> = Result<T, AuthError>;
