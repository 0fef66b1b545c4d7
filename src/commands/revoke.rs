//! Blocklist command.

use clap::Args;
use serde_json::json;

use tokenward_core::error::AuthError;

use super::CommandContext;
use crate::output;

/// Arguments for the revoke command
#[derive(Debug, Args)]
pub struct RevokeArgs {
    /// Encoded token to revoke
    pub token: String,

    /// Lift an existing revocation instead
    #[arg(long)]
    pub undo: bool,
}

/// Execute the revoke command
///
/// Only the Redis backend outlives the process, so the other backends are
/// rejected rather than silently forgetting the entry.
pub fn execute(args: &RevokeArgs, context: &CommandContext) -> Result<(), AuthError> {
    let blocklist = context.redis.as_ref().ok_or_else(|| {
        AuthError::configuration("The revoke command requires revocation.backend = \"redis\"")
    })?;

    if args.undo {
        let claims = context.manager.decode(&args.token)?;
        let lifted = blocklist.unrevoke(&claims.jti)?;
        return output::print_json(&json!({
            "jti": claims.jti,
            "revoked": false,
            "lifted": lifted,
        }));
    }

    let claims = context.manager.verify(&args.token, None)?;
    blocklist.revoke(&claims)?;
    output::print_json(&json!({
        "jti": claims.jti,
        "revoked": true,
        "expires_at": claims.expires_at(),
    }))
}
