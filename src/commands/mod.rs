//! CLI command definitions and dispatch.

pub mod issue;
pub mod refresh;
pub mod revoke;
pub mod revoked;
pub mod verify;

use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use tokenward_auth::{MemoryBlocklist, RedisBlocklist, TokenManager};
use tokenward_core::TokenType;
use tokenward_core::config::{AppConfig, RevocationBackend};
use tokenward_core::error::AuthError;

/// tokenward: JWT token lifecycle tool
#[derive(Debug, Parser)]
#[command(name = "tokenward", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (defaults to $TOKENWARD_CONFIG or config/default)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Issue tokens for an identity
    Issue(issue::IssueArgs),
    /// Verify a token and print its claims
    Verify(verify::VerifyArgs),
    /// Exchange a refresh token for a new access token
    Refresh(refresh::RefreshArgs),
    /// Add a token to the Redis blocklist
    Revoke(revoke::RevokeArgs),
    /// List revoked tokens stored in the Redis blocklist
    Revoked(revoked::RevokedArgs),
}

/// Token type accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TypeArg {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

impl From<TypeArg> for TokenType {
    fn from(arg: TypeArg) -> Self {
        match arg {
            TypeArg::Access => TokenType::Access,
            TypeArg::Refresh => TokenType::Refresh,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(&self, config: &AppConfig) -> Result<(), AuthError> {
        let context = CommandContext::new(config)?;
        match &self.command {
            Commands::Issue(args) => issue::execute(args, &context),
            Commands::Verify(args) => verify::execute(args, &context),
            Commands::Refresh(args) => refresh::execute(args, &context),
            Commands::Revoke(args) => revoke::execute(args, &context),
            Commands::Revoked(args) => revoked::execute(args, &context),
        }
    }
}

/// Token manager wired to the configured blocklist.
pub struct CommandContext {
    /// Manager for string identities
    pub manager: TokenManager<String>,
    /// Redis blocklist, when that backend is configured
    pub redis: Option<Arc<RedisBlocklist>>,
}

impl CommandContext {
    /// Build the manager and blocklist from configuration
    pub fn new(config: &AppConfig) -> Result<Self, AuthError> {
        let builder = TokenManager::<String>::builder(&config.jwt)
            .revocation_checks(config.revocation.token_checks.iter().copied());

        let (builder, redis) = match config.revocation.backend {
            RevocationBackend::None => {
                tracing::debug!("Revocation disabled");
                (builder, None)
            }
            RevocationBackend::Memory => {
                tracing::debug!("Using in-memory blocklist");
                (builder.revocation_lookup(Arc::new(MemoryBlocklist::new())), None)
            }
            RevocationBackend::Redis => {
                tracing::debug!(url = %config.revocation.redis_url, "Using Redis blocklist");
                let blocklist = Arc::new(RedisBlocklist::open(&config.revocation.redis_url)?);
                (builder.revocation_lookup(blocklist.clone()), Some(blocklist))
            }
        };

        Ok(Self {
            manager: builder.build()?,
            redis,
        })
    }
}
