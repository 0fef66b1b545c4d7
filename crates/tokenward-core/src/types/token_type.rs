//! The two kinds of token the lifecycle engine issues.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Distinguishes access tokens from refresh tokens.
///
/// Serialized as `"access"` / `"refresh"` in the `type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived token presented to protected endpoints.
    Access,
    /// Long-lived token exchanged for new access tokens.
    Refresh,
}

impl TokenType {
    /// Returns the claim value for this token type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }

    /// Both token types, in issuance order.
    pub fn all() -> [TokenType; 2] {
        [Self::Access, Self::Refresh]
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenType {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(Self::Access),
            "refresh" => Ok(Self::Refresh),
            other => Err(AuthError::decode(format!("Unknown token type '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_uses_claim_names() {
        let json = serde_json::to_string(&TokenType::Refresh).expect("serialize");
        assert_eq!(json, "\"refresh\"");
        let parsed: TokenType = serde_json::from_str("\"access\"").expect("deserialize");
        assert_eq!(parsed, TokenType::Access);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("refresh".parse::<TokenType>().expect("parse"), TokenType::Refresh);
        assert!("id".parse::<TokenType>().is_err());
    }
}
