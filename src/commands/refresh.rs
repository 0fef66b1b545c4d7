//! Refresh exchange command.

use clap::Args;
use serde_json::json;

use tokenward_core::error::AuthError;

use super::CommandContext;
use crate::output;

/// Arguments for the refresh command
#[derive(Debug, Args)]
pub struct RefreshArgs {
    /// Encoded refresh token
    pub token: String,
}

/// Execute the refresh command
pub fn execute(args: &RefreshArgs, context: &CommandContext) -> Result<(), AuthError> {
    let issued = context.manager.refresh_access_token(&args.token)?;
    output::print_json(&json!({
        "access_token": issued.encoded,
        "access_expires_at": issued.expires_at(),
        "claims": issued.claims,
    }))
}
