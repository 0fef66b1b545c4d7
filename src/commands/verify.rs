//! Token verification command.

use chrono::Utc;
use clap::Args;
use serde_json::json;

use tokenward_core::error::AuthError;

use super::{CommandContext, TypeArg};
use crate::output;

/// Arguments for the verify command
#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Encoded token
    pub token: String,

    /// Required token type
    #[arg(short = 't', long = "type", value_enum)]
    pub token_type: Option<TypeArg>,

    /// Also require a fresh access token
    #[arg(long)]
    pub fresh: bool,
}

/// Execute the verify command
pub fn execute(args: &VerifyArgs, context: &CommandContext) -> Result<(), AuthError> {
    let manager = &context.manager;
    let claims = manager.verify(&args.token, args.token_type.map(Into::into))?;

    let now = Utc::now();
    let fresh = if claims.is_access() {
        Some(manager.is_fresh(&claims, now)?)
    } else {
        None
    };
    if args.fresh {
        manager.require_fresh(&claims, now)?;
    }

    output::print_json(&json!({
        "valid": true,
        "fresh": fresh,
        "expires_in": claims.remaining_ttl_seconds(now),
        "claims": claims,
    }))
}
