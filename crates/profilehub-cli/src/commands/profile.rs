//! Profile reference commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use crate::runtime::Runtime;
use profilehub_auth::rbac::Permission;
use profilehub_core::config::AppConfig;
use profilehub_core::error::AppError;
use profilehub_core::types::ProfileId;
use profilehub_entity::profile::{Profile, ProfileStatus};
use profilehub_service::RequestContext;

/// Arguments for profile commands
#[derive(Debug, Args)]
pub struct ProfileArgs {
    /// Profile subcommand
    #[command(subcommand)]
    pub command: ProfileCommand,
}

/// Profile subcommands
#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Register a profile and create its default pool
    Create {
        /// Use this id instead of generating one
        #[arg(long)]
        id: Option<ProfileId>,
    },
    /// Make a profile selectable again
    Activate {
        /// Profile id
        profile: ProfileId,
    },
    /// Stop handing a profile out
    Deactivate {
        /// Profile id
        profile: ProfileId,
    },
    /// Detach a profile from every pool and remove it
    Delete {
        /// Profile id
        profile: ProfileId,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// List the pools a profile belongs to
    Pools {
        /// Profile id
        profile: ProfileId,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct PoolMembershipRow {
    pool_id: String,
    kind: String,
    name: String,
}

/// Execute profile commands
pub async fn execute(
    args: &ProfileArgs,
    config: &AppConfig,
    actor: RequestContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    let runtime = Runtime::build(config).await?;

    match &args.command {
        ProfileCommand::Create { id } => {
            let profile = Profile::active(id.unwrap_or_default());
            runtime.profiles.insert(profile).await?;
            let pool_id = runtime
                .groups
                .create_default_pool(&actor, profile.id)
                .await?;
            output::print_success(&format!("Profile {} created", profile.id));
            output::print_kv("Default pool", &pool_id.to_string());
        }
        ProfileCommand::Activate { profile } => {
            set_status(&runtime, &actor, *profile, ProfileStatus::Active).await?;
        }
        ProfileCommand::Deactivate { profile } => {
            set_status(&runtime, &actor, *profile, ProfileStatus::Inactive).await?;
        }
        ProfileCommand::Delete { profile, force } => {
            if !force {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!(
                        "Profile {profile} leaves all pools and its default pool is deleted. Continue?"
                    ))
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?;
                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            runtime.groups.remove_profile(&actor, *profile).await?;
            if runtime.profiles.delete(*profile).await? {
                output::print_success(&format!("Profile {profile} deleted"));
            } else {
                output::print_warning(&format!("Profile {profile} was not registered"));
            }
        }
        ProfileCommand::Pools { profile } => {
            let mut rows = Vec::new();
            for pool_id in runtime.directory.pools_for_profile(*profile).await? {
                let stats = runtime.groups.pool_stats(&actor, pool_id).await?;
                rows.push(PoolMembershipRow {
                    pool_id: pool_id.to_string(),
                    kind: stats.kind.to_string(),
                    name: stats.name,
                });
            }
            output::print_list(&rows, format);
        }
    }

    Ok(())
}

async fn set_status(
    runtime: &Runtime,
    actor: &RequestContext,
    profile: ProfileId,
    status: ProfileStatus,
) -> Result<(), AppError> {
    runtime
        .roles
        .require_permission(actor, Permission::EditProfiles)
        .await?;
    if !runtime.profiles.set_status(profile, status).await? {
        return Err(AppError::not_found(format!("Profile {profile} not found")));
    }
    let pools = runtime.groups.set_profile_status(actor, profile, status).await?;
    output::print_success(&format!(
        "Profile {profile} is now {status} ({pools} cached pool(s) updated)"
    ));
    Ok(())
}
