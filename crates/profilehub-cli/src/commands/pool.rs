//! Pool administration and session checkout commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use crate::runtime::Runtime;
use profilehub_core::config::AppConfig;
use profilehub_core::error::AppError;
use profilehub_core::types::{PoolId, ProfileId, UserId};
use profilehub_entity::pool::{PoolStatus, SelectionMode};
use profilehub_entity::profile::Profile;
use profilehub_pool::{NewCustomPool, PoolStats, PoolUpdate};
use profilehub_service::RequestContext;

/// Arguments for pool commands
#[derive(Debug, Args)]
pub struct PoolArgs {
    /// Pool subcommand
    #[command(subcommand)]
    pub command: PoolCommand,
}

/// Pool subcommands
#[derive(Debug, Subcommand)]
pub enum PoolCommand {
    /// Create a custom pool
    Create {
        /// Pool name, unique ignoring case
        #[arg(short, long)]
        name: String,
        /// Member profile ids
        #[arg(short, long = "member")]
        members: Vec<ProfileId>,
        /// Maximum concurrent sessions
        #[arg(long, default_value_t = 1)]
        max_sessions: u32,
        /// Selection mode: random, sequential or weighted
        #[arg(long, default_value = "random")]
        mode: SelectionMode,
    },
    /// Show usage statistics of a pool
    Show {
        /// Pool id
        pool: PoolId,
    },
    /// Add profiles to a custom pool
    Add {
        /// Pool id
        pool: PoolId,
        /// Profile ids
        #[arg(required = true)]
        profiles: Vec<ProfileId>,
    },
    /// Remove profiles from a custom pool
    Remove {
        /// Pool id
        pool: PoolId,
        /// Profile ids
        #[arg(required = true)]
        profiles: Vec<ProfileId>,
    },
    /// Change capacity, selection mode or status
    Update {
        /// Pool id
        pool: PoolId,
        /// New maximum concurrent sessions
        #[arg(long)]
        max_sessions: Option<u32>,
        /// New selection mode
        #[arg(long)]
        mode: Option<SelectionMode>,
        /// New status: active, inactive or suspended
        #[arg(long)]
        status: Option<PoolStatus>,
    },
    /// Delete a custom pool
    Delete {
        /// Pool id
        pool: PoolId,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// Let a user draw from pools
    Assign {
        /// User id
        user: UserId,
        /// Pool ids
        #[arg(required = true)]
        pools: Vec<PoolId>,
    },
    /// Revoke a user's access to pools
    Unassign {
        /// User id
        user: UserId,
        /// Pool ids
        #[arg(required = true)]
        pools: Vec<PoolId>,
    },
    /// List active pools with a free session slot
    Capacity,
    /// Check out the next profile of a pool
    Next {
        /// Pool id
        pool: PoolId,
    },
    /// Check out a named member of a pool
    Take {
        /// Pool id
        pool: PoolId,
        /// Profile id
        profile: ProfileId,
    },
    /// Open a session without selecting a profile
    Start {
        /// Pool id
        pool: PoolId,
        /// Member the session is for
        #[arg(long)]
        profile: Option<ProfileId>,
    },
    /// Release a session slot
    End {
        /// Pool id
        pool: PoolId,
        /// Profile the session was using
        #[arg(long)]
        profile: Option<ProfileId>,
    },
    /// List the members that could be handed out now
    Available {
        /// Pool id
        pool: PoolId,
    },
}

/// Pool display row for table output
#[derive(Debug, Serialize, Tabled)]
struct PoolRow {
    id: String,
    name: String,
    kind: String,
    status: String,
    mode: String,
    members: String,
    sessions: String,
    utilization: String,
    last_used: String,
}

impl From<PoolStats> for PoolRow {
    fn from(stats: PoolStats) -> Self {
        Self {
            id: stats.pool_id.to_string(),
            name: stats.name,
            kind: stats.kind.to_string(),
            status: stats.status.to_string(),
            mode: stats.selection_mode.to_string(),
            members: format!("{}/{}", stats.active_member_count, stats.member_count),
            sessions: format!(
                "{}/{}",
                stats.active_sessions, stats.max_concurrent_sessions
            ),
            utilization: format!("{:.0}%", stats.utilization_percent),
            last_used: stats
                .last_used
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Profile display row for table output
#[derive(Debug, Serialize, Tabled)]
struct ProfileRow {
    id: String,
    status: String,
}

impl From<Profile> for ProfileRow {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id.to_string(),
            status: profile.status.to_string(),
        }
    }
}

/// Execute pool commands
pub async fn execute(
    args: &PoolArgs,
    config: &AppConfig,
    actor: RequestContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    let runtime = Runtime::build(config).await?;
    let groups = &runtime.groups;
    let sessions = &runtime.sessions;

    match &args.command {
        PoolCommand::Create {
            name,
            members,
            max_sessions,
            mode,
        } => {
            let input = NewCustomPool {
                name: name.clone(),
                member_ids: members.clone(),
                max_concurrent_sessions: *max_sessions,
                selection_mode: *mode,
            };
            let pool_id = groups.create_custom_pool(&actor, input).await?;
            output::print_success(&format!("Pool '{name}' created"));
            output::print_kv("Pool id", &pool_id.to_string());
        }
        PoolCommand::Show { pool } => {
            let stats = groups.pool_stats(&actor, *pool).await?;
            output::print_item(&PoolRow::from(stats), format);
        }
        PoolCommand::Add { pool, profiles } => {
            let added = groups.add_members(&actor, *pool, profiles).await?;
            output::print_success(&format!("{added} profile(s) added"));
        }
        PoolCommand::Remove { pool, profiles } => {
            let removed = groups.remove_members(&actor, *pool, profiles).await?;
            if removed == 0 {
                output::print_warning("None of the given profiles were members");
            } else {
                output::print_success(&format!("{removed} profile(s) removed"));
            }
        }
        PoolCommand::Update {
            pool,
            max_sessions,
            mode,
            status,
        } => {
            let update = PoolUpdate {
                max_concurrent_sessions: *max_sessions,
                selection_mode: *mode,
                status: *status,
            };
            let stats = groups.update_pool(&actor, *pool, update).await?;
            output::print_item(&PoolRow::from(stats), format);
        }
        PoolCommand::Delete { pool, force } => {
            if !force {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!("Delete pool {pool}?"))
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?;
                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }
            groups.delete_pool(&actor, *pool).await?;
            output::print_success(&format!("Pool {pool} deleted"));
        }
        PoolCommand::Assign { user, pools } => {
            groups.assign_pools_to_user(&actor, *user, pools).await?;
            output::print_success(&format!("{} pool(s) assigned to {user}", pools.len()));
        }
        PoolCommand::Unassign { user, pools } => {
            let removed = groups.unassign_pools_from_user(&actor, *user, pools).await?;
            output::print_success(&format!("{removed} assignment(s) revoked from {user}"));
        }
        PoolCommand::Capacity => {
            let mut rows = Vec::new();
            for pool_id in groups.pools_with_available_capacity(&actor).await? {
                rows.push(PoolRow::from(groups.pool_stats(&actor, pool_id).await?));
            }
            output::print_list(&rows, format);
        }
        PoolCommand::Next { pool } => {
            let profile = sessions.request_next_profile(*pool, &actor).await?;
            output::print_item(&ProfileRow::from(profile), format);
        }
        PoolCommand::Take { pool, profile } => {
            let profile = sessions
                .request_specific_profile(*pool, *profile, &actor)
                .await?;
            output::print_item(&ProfileRow::from(profile), format);
        }
        PoolCommand::Start { pool, profile } => {
            match sessions.start_session(*pool, *profile, &actor).await? {
                Some(profile) => output::print_item(&ProfileRow::from(profile), format),
                None => output::print_success(&format!("Session started on pool {pool}")),
            }
        }
        PoolCommand::End { pool, profile } => {
            if sessions.end_session(*pool, *profile, &actor).await? {
                output::print_success(&format!("Session ended on pool {pool}"));
            } else {
                output::print_warning(&format!("Pool {pool} had no active session"));
            }
        }
        PoolCommand::Available { pool } => {
            let rows: Vec<ProfileRow> = sessions
                .available_profiles(*pool, &actor)
                .await?
                .into_iter()
                .map(ProfileRow::from)
                .collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}
