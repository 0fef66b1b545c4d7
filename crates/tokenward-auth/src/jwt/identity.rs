//! Conversion between application identities and the `sub` claim.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use tokenward_core::{AuthError, AuthResult};

type ToClaimFn<I> = dyn Fn(&I) -> AuthResult<Value> + Send + Sync;
type FromClaimFn<I> = dyn Fn(&Value) -> AuthResult<I> + Send + Sync;

/// A serializer/deserializer pair for the subject identity.
///
/// Encoding an identity and decoding it back must yield an equivalent value.
pub struct IdentityCodec<I> {
    to_claim: Arc<ToClaimFn<I>>,
    from_claim: Arc<FromClaimFn<I>>,
}

impl<I> Clone for IdentityCodec<I> {
    fn clone(&self) -> Self {
        Self {
            to_claim: Arc::clone(&self.to_claim),
            from_claim: Arc::clone(&self.from_claim),
        }
    }
}

impl<I> std::fmt::Debug for IdentityCodec<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityCodec").finish_non_exhaustive()
    }
}

impl<I> IdentityCodec<I> {
    /// Creates a codec from an explicit function pair.
    pub fn new<T, F>(to_claim: T, from_claim: F) -> Self
    where
        T: Fn(&I) -> AuthResult<Value> + Send + Sync + 'static,
        F: Fn(&Value) -> AuthResult<I> + Send + Sync + 'static,
    {
        Self {
            to_claim: Arc::new(to_claim),
            from_claim: Arc::new(from_claim),
        }
    }

    /// Encodes an identity for the `sub` claim.
    pub fn to_claim(&self, identity: &I) -> AuthResult<Value> {
        (self.to_claim)(identity)
    }

    /// Decodes the `sub` claim back into an identity.
    pub fn from_claim(&self, value: &Value) -> AuthResult<I> {
        (self.from_claim)(value)
    }
}

impl<I> IdentityCodec<I>
where
    I: Serialize + DeserializeOwned + 'static,
{
    /// Codec that stores the identity as its serde JSON representation.
    ///
    /// For primitive identities (strings, integers) this is the identity function.
    pub fn serde() -> Self {
        Self::new(
            |identity: &I| {
                serde_json::to_value(identity).map_err(|e| {
                    AuthError::identity(format!("Failed to serialize identity: {e}"))
                })
            },
            |value: &Value| {
                serde_json::from_value(value.clone()).map_err(|e| {
                    AuthError::identity(format!("Failed to deserialize identity: {e}"))
                })
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use tokenward_core::ErrorKind;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        id: u64,
        name: String,
    }

    #[test]
    fn test_string_identity_is_unchanged() {
        let codec = IdentityCodec::<String>::serde();
        let value = codec.to_claim(&"user-1".to_string()).expect("encode");
        assert_eq!(value, json!("user-1"));
        assert_eq!(codec.from_claim(&value).expect("decode"), "user-1");
    }

    #[test]
    fn test_struct_identity_round_trips() {
        let codec = IdentityCodec::<User>::serde();
        let user = User {
            id: 7,
            name: "ada".to_string(),
        };
        let value = codec.to_claim(&user).expect("encode");
        assert_eq!(codec.from_claim(&value).expect("decode"), user);
    }

    #[test]
    fn test_custom_pair() {
        let codec = IdentityCodec::<User>::new(
            |user| Ok(json!(user.id)),
            |value| {
                let id = value
                    .as_u64()
                    .ok_or_else(|| AuthError::identity("expected numeric id"))?;
                Ok(User {
                    id,
                    name: format!("user-{id}"),
                })
            },
        );
        let value = codec
            .to_claim(&User {
                id: 42,
                name: "ignored".to_string(),
            })
            .expect("encode");
        assert_eq!(value, json!(42));
        assert_eq!(codec.from_claim(&value).expect("decode").name, "user-42");
    }

    #[test]
    fn test_mismatched_claim_is_identity_error() {
        let codec = IdentityCodec::<u64>::serde();
        let err = codec.from_claim(&json!("not-a-number")).expect_err("mismatch");
        assert_eq!(err.kind, ErrorKind::Identity);
    }
}
