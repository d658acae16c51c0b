//! Database migration management commands.

use clap::{Args, Subcommand};

use crate::output;
use crate::runtime::Runtime;
use profilehub_core::config::AppConfig;
use profilehub_core::config::pool::StoreBackend;
use profilehub_core::error::AppError;
use profilehub_database::DatabasePool;

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Run all pending migrations
    Run,
    /// Zero the session counters of every pool
    ResetSessions {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

/// Execute migration commands
pub async fn execute(args: &MigrateArgs, config: &AppConfig) -> Result<(), AppError> {
    if config.store.backend != StoreBackend::Postgres {
        return Err(AppError::configuration(
            "Migrations need store.backend = \"postgres\"",
        ));
    }

    match &args.command {
        MigrateCommand::Run => {
            let db = DatabasePool::connect(&config.database).await?;
            println!("Running database migrations...");
            profilehub_database::migration::run_migrations(db.pool()).await?;
            output::print_success("All migrations applied successfully.");

            if config.pools.reset_sessions_on_startup {
                reset_sessions(config).await?;
            }
            db.close().await;
        }
        MigrateCommand::ResetSessions { force } => {
            if !force {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt("Sessions still checked out will be forgotten. Continue?")
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }
            reset_sessions(config).await?;
        }
    }

    Ok(())
}

async fn reset_sessions(config: &AppConfig) -> Result<(), AppError> {
    let runtime = Runtime::build(config).await?;
    let reset = runtime.reconciler.startup_recovery().await?;
    if reset > 0 {
        output::print_warning(&format!("Cleared session counters on {reset} pool(s)"));
    } else {
        output::print_success("No stale sessions.");
    }
    Ok(())
}
