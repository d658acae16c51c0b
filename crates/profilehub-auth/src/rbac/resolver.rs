//! Permission resolution over a user's role set.
//!
//! A user may hold several roles. Their effective permissions are the union
//! of each role's grant and their effective level is the highest level held.
//! Nothing here fails: callers turn `false` or an empty set into an error.

use std::collections::BTreeSet;

use profilehub_entity::user::UserRole;

use super::policies::{Permission, RolePolicy};

/// Answers "may this role set do X" questions against a [`RolePolicy`].
#[derive(Debug, Clone, Default)]
pub struct PermissionResolver {
    policy: RolePolicy,
}

impl PermissionResolver {
    /// Creates a resolver over the default policy table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a resolver over a custom policy table.
    pub fn with_policy(policy: RolePolicy) -> Self {
        Self { policy }
    }

    /// The underlying policy table.
    pub fn policy(&self) -> &RolePolicy {
        &self.policy
    }

    /// True iff any held role grants the permission.
    pub fn has_permission(&self, roles: &BTreeSet<UserRole>, permission: Permission) -> bool {
        roles
            .iter()
            .any(|role| self.policy.grant(*role).allows(permission))
    }

    /// Union of the permissions of every held role.
    pub fn union_permissions(&self, roles: &BTreeSet<UserRole>) -> BTreeSet<Permission> {
        roles
            .iter()
            .flat_map(|role| self.policy.grant(*role).permissions.iter().copied())
            .collect()
    }

    /// Highest level among the held roles, or `None` for an empty set.
    pub fn effective_level(&self, roles: &BTreeSet<UserRole>) -> Option<u8> {
        roles.iter().map(|role| self.policy.grant(*role).level).max()
    }

    /// Whether an actor holding `actor_roles` may assign `new_role` to anyone.
    ///
    /// The actor needs `MANAGE_ROLES` and a level at least that of the new
    /// role. A role that itself carries `MANAGE_SUPER_ADMINS` can only be
    /// handed out by an actor who holds that permission. The target user's
    /// current roles are not considered.
    pub fn is_role_change_allowed(&self, actor_roles: &BTreeSet<UserRole>, new_role: UserRole) -> bool {
        if !self.has_permission(actor_roles, Permission::ManageRoles) {
            return false;
        }

        let target = self.policy.grant(new_role);
        let Some(actor_level) = self.effective_level(actor_roles) else {
            return false;
        };
        if actor_level < target.level {
            return false;
        }

        !target.allows(Permission::ManageSuperAdmins)
            || self.has_permission(actor_roles, Permission::ManageSuperAdmins)
    }

    /// Every role the actor may assign.
    pub fn available_roles_for(&self, actor_roles: &BTreeSet<UserRole>) -> BTreeSet<UserRole> {
        self.policy
            .roles()
            .into_iter()
            .filter(|role| self.is_role_change_allowed(actor_roles, *role))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::policies::RoleGrant;

    fn set(roles: &[UserRole]) -> BTreeSet<UserRole> {
        roles.iter().copied().collect()
    }

    #[test]
    fn test_admin_cannot_grant_super_admin() {
        let resolver = PermissionResolver::new();
        assert!(!resolver.is_role_change_allowed(&set(&[UserRole::Admin]), UserRole::SuperAdmin));
        assert!(resolver.is_role_change_allowed(&set(&[UserRole::Admin]), UserRole::Admin));
        assert!(resolver.is_role_change_allowed(&set(&[UserRole::Admin]), UserRole::User));
    }

    #[test]
    fn test_super_admin_can_grant_anything() {
        let resolver = PermissionResolver::new();
        for role in UserRole::ALL {
            assert!(resolver.is_role_change_allowed(&set(&[UserRole::SuperAdmin]), role));
        }
    }

    #[test]
    fn test_user_cannot_grant_anything() {
        let resolver = PermissionResolver::new();
        assert!(!resolver.is_role_change_allowed(&set(&[UserRole::User]), UserRole::Admin));
        assert!(!resolver.is_role_change_allowed(&set(&[UserRole::User]), UserRole::User));
        assert!(!resolver.is_role_change_allowed(&BTreeSet::new(), UserRole::User));
    }

    #[test]
    fn test_available_roles() {
        let resolver = PermissionResolver::new();
        assert_eq!(
            resolver.available_roles_for(&set(&[UserRole::Admin])),
            set(&[UserRole::User, UserRole::Admin])
        );
        assert_eq!(
            resolver.available_roles_for(&set(&[UserRole::SuperAdmin])),
            set(&UserRole::ALL)
        );
        assert!(resolver.available_roles_for(&set(&[UserRole::User])).is_empty());
    }

    #[test]
    fn test_union_and_level_across_roles() {
        let resolver = PermissionResolver::new();
        let roles = set(&[UserRole::User, UserRole::Admin]);
        assert_eq!(resolver.effective_level(&roles), Some(4));
        assert_eq!(resolver.union_permissions(&roles).len(), 19);
        assert!(resolver.has_permission(&roles, Permission::EditGroups));
        assert!(!resolver.has_permission(&roles, Permission::ViewAuditLogs));
        assert_eq!(resolver.effective_level(&BTreeSet::new()), None);
    }

    #[test]
    fn test_rule_is_driven_by_the_table() {
        // A user role that may manage roles can still only hand out its own level.
        let policy = RolePolicy::new().with_grant(
            UserRole::User,
            RoleGrant::new(1, [Permission::ManageRoles]),
        );
        let resolver = PermissionResolver::with_policy(policy);
        assert!(resolver.is_role_change_allowed(&set(&[UserRole::User]), UserRole::User));
        assert!(!resolver.is_role_change_allowed(&set(&[UserRole::User]), UserRole::Admin));
    }
}
