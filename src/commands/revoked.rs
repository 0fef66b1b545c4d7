//! Blocklist inspection command.

use clap::Args;
use serde_json::Value;

use tokenward_core::error::AuthError;

use super::CommandContext;
use crate::output;

/// Arguments for the revoked command
#[derive(Debug, Args)]
pub struct RevokedArgs {
    /// Only list tokens of this identity
    #[arg(short, long, conflicts_with = "token")]
    pub identity: Option<String>,

    /// Show the stored entry for this encoded token
    #[arg(short, long)]
    pub token: Option<String>,
}

/// Execute the revoked command
pub fn execute(args: &RevokedArgs, context: &CommandContext) -> Result<(), AuthError> {
    let blocklist = context.redis.as_ref().ok_or_else(|| {
        AuthError::configuration("The revoked command requires revocation.backend = \"redis\"")
    })?;

    if let Some(token) = &args.token {
        let claims = context.manager.decode(token)?;
        let entry = blocklist.get(&claims.jti)?;
        return output::print_json(&entry);
    }

    let entries = match &args.identity {
        Some(identity) => blocklist.entries_for(&Value::String(identity.clone()))?,
        None => blocklist.entries()?,
    };
    output::print_json(&entries)
}
