//! JWT encoding, decoding, claim assembly, and freshness tracking.

pub mod builder;
pub mod claims;
pub mod codec;
pub mod freshness;
pub mod identity;

pub use builder::{ClaimsBuilder, CustomClaimsFn, Fresh};
pub use claims::{ClaimSet, FreshClaim, RESERVED_CLAIMS};
pub use codec::{JwtCodec, decode_with, encode_with};
pub use freshness::{is_fresh, require_fresh};
pub use identity::IdentityCodec;
