//! CLI command definitions and dispatch.

pub mod migrate;
pub mod pool;
pub mod profile;
pub mod role;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use profilehub_core::config::AppConfig;
use profilehub_core::error::AppError;
use profilehub_core::types::UserId;
use profilehub_service::RequestContext;

/// ProfileHub: profile pools, session checkout and role administration
#[derive(Debug, Parser)]
#[command(name = "profilehub", version, about, long_about = None)]
pub struct Cli {
    /// Configuration overlay to load on top of config/default.toml
    #[arg(short, long, env = "PROFILEHUB_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// User the command acts as
    #[arg(long, env = "PROFILEHUB_USER", global = true)]
    pub as_user: Option<UserId>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Profile references and their default pools
    Profile(profile::ProfileArgs),
    /// Pool administration and session checkout
    Pool(pool::PoolArgs),
    /// Role administration
    Role(role::RoleArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &config).await,
            Commands::Profile(args) => {
                profile::execute(args, &config, self.actor()?, self.format).await
            }
            Commands::Pool(args) => pool::execute(args, &config, self.actor()?, self.format).await,
            Commands::Role(args) => role::execute(args, &config, self.as_user, self.format).await,
        }
    }

    fn actor(&self) -> Result<RequestContext, AppError> {
        require_actor(self.as_user)
    }
}

/// The acting user, required by every permission-checked command.
pub fn require_actor(as_user: Option<UserId>) -> Result<RequestContext, AppError> {
    as_user
        .map(RequestContext::new)
        .ok_or_else(|| AppError::validation("This command needs --as-user or PROFILEHUB_USER"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_pool_create() {
        let cli = Cli::try_parse_from([
            "profilehub",
            "--as-user",
            "6f1c2b9e-2f4d-4c8e-9a57-0d6f9b1e3a42",
            "pool",
            "create",
            "--name",
            "G1",
            "--max-sessions",
            "2",
            "--mode",
            "sequential",
        ])
        .unwrap();

        assert!(cli.as_user.is_some());
        match cli.command {
            Commands::Pool(args) => match args.command {
                pool::PoolCommand::Create {
                    name,
                    members,
                    max_sessions,
                    mode,
                } => {
                    assert_eq!(name, "G1");
                    assert!(members.is_empty());
                    assert_eq!(max_sessions, 2);
                    assert_eq!(mode, profilehub_entity::pool::SelectionMode::Sequential);
                }
                other => panic!("unexpected pool command {other:?}"),
            },
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_missing_actor_is_validation_error() {
        let err = require_actor(None).unwrap_err();
        assert_eq!(err.kind, profilehub_core::error::ErrorKind::Validation);
    }
}
