//! Role-to-permission mapping definitions.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use profilehub_core::error::AppError;
use profilehub_entity::user::UserRole;

/// A system-level permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    // Everyday use
    /// See the pools assigned to oneself.
    ViewAssignedGroups,
    /// Check profiles out of assigned pools.
    UseProfiles,
    /// See one's own usage statistics.
    ViewOwnStats,

    // Profiles
    CreateProfiles,
    EditProfiles,
    DeleteProfiles,
    ViewAllProfiles,

    // Groups
    /// Create custom pools.
    CreateCustomGroups,
    /// Change membership, capacity, mode or status of a pool.
    EditGroups,
    /// Delete custom pools.
    DeleteGroups,
    /// Grant and revoke users' access to pools.
    AssignGroupsToUsers,

    // Users
    ViewTeamUsers,
    ViewAllStats,
    ManageUsers,
    ViewAllUsers,
    ActivateUsers,
    DeactivateUsers,
    ViewSystemStats,
    /// Assign roles to users.
    ManageRoles,

    // System
    DeleteUsers,
    /// Grant or revoke the super-admin role.
    ManageSuperAdmins,
    SystemConfiguration,
    ViewAuditLogs,
    CleanupData,
}

impl Permission {
    /// Return the permission's stable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewAssignedGroups => "VIEW_ASSIGNED_GROUPS",
            Self::UseProfiles => "USE_PROFILES",
            Self::ViewOwnStats => "VIEW_OWN_STATS",
            Self::CreateProfiles => "CREATE_PROFILES",
            Self::EditProfiles => "EDIT_PROFILES",
            Self::DeleteProfiles => "DELETE_PROFILES",
            Self::ViewAllProfiles => "VIEW_ALL_PROFILES",
            Self::CreateCustomGroups => "CREATE_CUSTOM_GROUPS",
            Self::EditGroups => "EDIT_GROUPS",
            Self::DeleteGroups => "DELETE_GROUPS",
            Self::AssignGroupsToUsers => "ASSIGN_GROUPS_TO_USERS",
            Self::ViewTeamUsers => "VIEW_TEAM_USERS",
            Self::ViewAllStats => "VIEW_ALL_STATS",
            Self::ManageUsers => "MANAGE_USERS",
            Self::ViewAllUsers => "VIEW_ALL_USERS",
            Self::ActivateUsers => "ACTIVATE_USERS",
            Self::DeactivateUsers => "DEACTIVATE_USERS",
            Self::ViewSystemStats => "VIEW_SYSTEM_STATS",
            Self::ManageRoles => "MANAGE_ROLES",
            Self::DeleteUsers => "DELETE_USERS",
            Self::ManageSuperAdmins => "MANAGE_SUPER_ADMINS",
            Self::SystemConfiguration => "SYSTEM_CONFIGURATION",
            Self::ViewAuditLogs => "VIEW_AUDIT_LOGS",
            Self::CleanupData => "CLEANUP_DATA",
        }
    }

    /// Every permission, in declaration order.
    pub const ALL: [Permission; 24] = [
        Self::ViewAssignedGroups,
        Self::UseProfiles,
        Self::ViewOwnStats,
        Self::CreateProfiles,
        Self::EditProfiles,
        Self::DeleteProfiles,
        Self::ViewAllProfiles,
        Self::CreateCustomGroups,
        Self::EditGroups,
        Self::DeleteGroups,
        Self::AssignGroupsToUsers,
        Self::ViewTeamUsers,
        Self::ViewAllStats,
        Self::ManageUsers,
        Self::ViewAllUsers,
        Self::ActivateUsers,
        Self::DeactivateUsers,
        Self::ViewSystemStats,
        Self::ManageRoles,
        Self::DeleteUsers,
        Self::ManageSuperAdmins,
        Self::SystemConfiguration,
        Self::ViewAuditLogs,
        Self::CleanupData,
    ];
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| AppError::validation(format!("Unknown permission: '{s}'")))
    }
}

/// What one role is worth: its level and the permissions it grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGrant {
    /// Privilege level; higher outranks lower.
    pub level: u8,
    /// Permissions granted by the role.
    pub permissions: BTreeSet<Permission>,
}

impl RoleGrant {
    /// Build a grant from a level and a permission list.
    pub fn new(level: u8, permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            level,
            permissions: permissions.into_iter().collect(),
        }
    }

    /// Whether the grant includes a permission.
    pub fn allows(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

/// The role table. Every [`UserRole`] has exactly one grant.
#[derive(Debug, Clone)]
pub struct RolePolicy {
    user: RoleGrant,
    admin: RoleGrant,
    super_admin: RoleGrant,
}

const USER_PERMISSIONS: &[Permission] = &[
    Permission::ViewAssignedGroups,
    Permission::UseProfiles,
    Permission::ViewOwnStats,
];

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::CreateProfiles,
    Permission::EditProfiles,
    Permission::DeleteProfiles,
    Permission::ViewAllProfiles,
    Permission::CreateCustomGroups,
    Permission::EditGroups,
    Permission::DeleteGroups,
    Permission::AssignGroupsToUsers,
    Permission::ViewTeamUsers,
    Permission::ViewAllStats,
    Permission::ManageUsers,
    Permission::ViewAllUsers,
    Permission::ActivateUsers,
    Permission::DeactivateUsers,
    Permission::ViewSystemStats,
    Permission::ManageRoles,
];

const SUPER_ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::DeleteUsers,
    Permission::ManageSuperAdmins,
    Permission::SystemConfiguration,
    Permission::ViewAuditLogs,
    Permission::CleanupData,
];

impl RolePolicy {
    /// Creates the default policy table.
    pub fn new() -> Self {
        let user = RoleGrant::new(UserRole::User.level(), USER_PERMISSIONS.iter().copied());
        let admin = RoleGrant::new(
            UserRole::Admin.level(),
            USER_PERMISSIONS
                .iter()
                .chain(ADMIN_PERMISSIONS)
                .copied(),
        );
        let super_admin = RoleGrant::new(
            UserRole::SuperAdmin.level(),
            USER_PERMISSIONS
                .iter()
                .chain(ADMIN_PERMISSIONS)
                .chain(SUPER_ADMIN_PERMISSIONS)
                .copied(),
        );

        Self {
            user,
            admin,
            super_admin,
        }
    }

    /// Replace one role's grant.
    pub fn with_grant(mut self, role: UserRole, grant: RoleGrant) -> Self {
        *self.grant_mut(role) = grant;
        self
    }

    /// Level and permissions of a role.
    pub fn grant(&self, role: UserRole) -> &RoleGrant {
        match role {
            UserRole::User => &self.user,
            UserRole::Admin => &self.admin,
            UserRole::SuperAdmin => &self.super_admin,
        }
    }

    fn grant_mut(&mut self, role: UserRole) -> &mut RoleGrant {
        match role {
            UserRole::User => &mut self.user,
            UserRole::Admin => &mut self.admin,
            UserRole::SuperAdmin => &mut self.super_admin,
        }
    }

    /// Every role, ordered by ascending level.
    pub fn roles(&self) -> Vec<UserRole> {
        let mut roles = UserRole::ALL.to_vec();
        roles.sort_by_key(|r| self.grant(*r).level);
        roles
    }
}

impl Default for RolePolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_match_roles() {
        let policy = RolePolicy::new();
        for role in UserRole::ALL {
            assert_eq!(policy.grant(role).level, role.level());
        }
    }

    #[test]
    fn test_permission_counts() {
        let policy = RolePolicy::new();
        assert_eq!(policy.grant(UserRole::User).permissions.len(), 3);
        assert_eq!(policy.grant(UserRole::Admin).permissions.len(), 19);
        assert_eq!(
            policy.grant(UserRole::SuperAdmin).permissions.len(),
            Permission::ALL.len()
        );
    }

    #[test]
    fn test_grants_are_nested() {
        let policy = RolePolicy::new();
        let user = &policy.grant(UserRole::User).permissions;
        let admin = &policy.grant(UserRole::Admin).permissions;
        let super_admin = &policy.grant(UserRole::SuperAdmin).permissions;
        assert!(user.is_subset(admin));
        assert!(admin.is_subset(super_admin));
        assert!(!admin.contains(&Permission::ManageSuperAdmins));
    }

    #[test]
    fn test_roles_ordered_by_level() {
        let policy = RolePolicy::new();
        assert_eq!(
            policy.roles(),
            vec![UserRole::User, UserRole::Admin, UserRole::SuperAdmin]
        );
    }

    #[test]
    fn test_permission_names() {
        assert_eq!(Permission::ManageRoles.as_str(), "MANAGE_ROLES");
        assert_eq!(
            "view-audit-logs".parse::<Permission>().unwrap(),
            Permission::ViewAuditLogs
        );
        assert!("FLY".parse::<Permission>().is_err());
        assert_eq!(
            serde_json::to_string(&Permission::AssignGroupsToUsers).unwrap(),
            "\"ASSIGN_GROUPS_TO_USERS\""
        );
    }

    #[test]
    fn test_with_grant_overrides() {
        let policy = RolePolicy::new().with_grant(
            UserRole::User,
            RoleGrant::new(1, [Permission::ViewOwnStats]),
        );
        assert!(!policy.grant(UserRole::User).allows(Permission::UseProfiles));
    }
}
