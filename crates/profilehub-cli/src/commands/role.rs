//! Role administration commands.

use std::collections::BTreeSet;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use crate::runtime::Runtime;
use profilehub_auth::rbac::Permission;
use profilehub_core::config::AppConfig;
use profilehub_core::error::AppError;
use profilehub_core::types::UserId;
use profilehub_entity::user::UserRole;

/// Arguments for role commands
#[derive(Debug, Args)]
pub struct RoleArgs {
    /// Role subcommand
    #[command(subcommand)]
    pub command: RoleCommand,
}

/// Role subcommands
#[derive(Debug, Subcommand)]
pub enum RoleCommand {
    /// Give a user without roles their first role (operator bootstrap)
    Seed {
        /// User id
        user: UserId,
        /// Role: user, admin or super_admin
        role: UserRole,
    },
    /// Replace a user's roles with exactly one role
    Change {
        /// User id
        user: UserId,
        /// New role
        role: UserRole,
    },
    /// Grant an additional role
    Add {
        /// User id
        user: UserId,
        /// Role to add
        role: UserRole,
    },
    /// Take a role away
    Remove {
        /// User id
        user: UserId,
        /// Role to remove
        role: UserRole,
    },
    /// Roles the acting user may assign
    Available,
    /// Effective permissions of a user, the acting user by default
    Permissions {
        /// User id
        user: Option<UserId>,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct RoleRow {
    role: String,
    name: String,
    level: u8,
}

impl From<UserRole> for RoleRow {
    fn from(role: UserRole) -> Self {
        Self {
            role: role.as_str().to_string(),
            name: role.display_name().to_string(),
            level: role.level(),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct PermissionRow {
    permission: String,
}

/// Execute role commands
pub async fn execute(
    args: &RoleArgs,
    config: &AppConfig,
    as_user: Option<UserId>,
    format: OutputFormat,
) -> Result<(), AppError> {
    let runtime = Runtime::build(config).await?;
    let roles = &runtime.roles;

    match &args.command {
        RoleCommand::Seed { user, role } => {
            roles.seed_role(*user, *role).await?;
            output::print_success(&format!("User {user} seeded with role {role}"));
        }
        RoleCommand::Change { user, role } => {
            let actor = super::require_actor(as_user)?;
            runtime.sessions.change_user_role(&actor, *user, *role).await?;
            output::print_success(&format!("User {user} now has role {role}"));
        }
        RoleCommand::Add { user, role } => {
            let actor = super::require_actor(as_user)?;
            roles.add_additional_role(&actor, *user, *role).await?;
            output::print_success(&format!("Role {role} added to {user}"));
        }
        RoleCommand::Remove { user, role } => {
            let actor = super::require_actor(as_user)?;
            roles.remove_additional_role(&actor, *user, *role).await?;
            output::print_success(&format!("Role {role} removed from {user}"));
        }
        RoleCommand::Available => {
            let actor = super::require_actor(as_user)?;
            let available = runtime.sessions.available_roles(&actor).await?;
            print_roles(available, format);
        }
        RoleCommand::Permissions { user } => {
            let target = match user.or(as_user) {
                Some(target) => target,
                None => return Err(AppError::validation("Name a user or pass --as-user")),
            };
            let rows: Vec<PermissionRow> = roles
                .user_permissions(target)
                .await?
                .into_iter()
                .map(|p: Permission| PermissionRow {
                    permission: p.to_string(),
                })
                .collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}

fn print_roles(roles: BTreeSet<UserRole>, format: OutputFormat) {
    let rows: Vec<RoleRow> = roles.into_iter().map(RoleRow::from).collect();
    output::print_list(&rows, format);
}
