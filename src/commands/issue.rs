//! Token issuance command.

use chrono::Duration;
use clap::{Args, ValueEnum};
use serde_json::{Map, Value};

use tokenward_auth::{AccessTokenOptions, Fresh, Ttl};
use tokenward_core::error::AuthError;

use super::CommandContext;
use crate::output;

/// Which tokens to issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IssueKind {
    /// Fresh access token and refresh token
    Pair,
    /// Access token only
    Access,
    /// Refresh token only
    Refresh,
}

/// Arguments for the issue command
#[derive(Debug, Args)]
pub struct IssueArgs {
    /// Identity placed in the `sub` claim
    pub identity: String,

    /// Tokens to issue
    #[arg(short, long, value_enum, default_value = "pair")]
    pub kind: IssueKind,

    /// Lifetime in seconds, overriding the configured default
    #[arg(long, conflicts_with = "no_expiry")]
    pub ttl: Option<i64>,

    /// Issue without an `exp` claim
    #[arg(long)]
    pub no_expiry: bool,

    /// Mark the access token as not fresh
    #[arg(long, conflicts_with = "fresh_for")]
    pub not_fresh: bool,

    /// Keep the access token fresh only for this many seconds
    #[arg(long)]
    pub fresh_for: Option<i64>,

    /// Custom claim as key=value; the value is parsed as JSON when possible
    #[arg(long = "claim", value_name = "KEY=VALUE")]
    pub claims: Vec<String>,
}

impl IssueArgs {
    fn ttl(&self) -> Ttl {
        if self.no_expiry {
            Ttl::Never
        } else if let Some(secs) = self.ttl {
            Ttl::After(Duration::seconds(secs))
        } else {
            Ttl::Default
        }
    }

    fn fresh(&self) -> Fresh {
        match (self.not_fresh, self.fresh_for) {
            (true, _) => Fresh::No,
            (false, Some(secs)) => Fresh::For(Duration::seconds(secs)),
            (false, None) => Fresh::Yes,
        }
    }

    fn custom_claims(&self) -> Result<Option<Map<String, Value>>, AuthError> {
        if self.claims.is_empty() {
            return Ok(None);
        }
        let mut map = Map::new();
        for raw in &self.claims {
            let (key, value) = raw.split_once('=').ok_or_else(|| {
                AuthError::configuration(format!("Claim '{raw}' is not in KEY=VALUE form"))
            })?;
            let value =
                serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
            map.insert(key.to_string(), value);
        }
        Ok(Some(map))
    }
}

/// Execute the issue command
pub fn execute(args: &IssueArgs, context: &CommandContext) -> Result<(), AuthError> {
    let manager = &context.manager;

    match args.kind {
        IssueKind::Pair => {
            let pair = manager.issue_token_pair(&args.identity)?;
            output::print_json(&pair)
        }
        IssueKind::Access => {
            let mut options = AccessTokenOptions::fresh(args.fresh()).with_ttl(args.ttl());
            if let Some(claims) = args.custom_claims()? {
                options = options.with_custom_claims(claims);
            }
            let issued = manager.issue_access_token(&args.identity, options)?;
            output::print_json(&serde_json::json!({
                "access_token": issued.encoded,
                "claims": issued.claims,
            }))
        }
        IssueKind::Refresh => {
            let issued = manager.issue_refresh_token(&args.identity, args.ttl())?;
            output::print_json(&serde_json::json!({
                "refresh_token": issued.encoded,
                "claims": issued.claims,
            }))
        }
    }
}
