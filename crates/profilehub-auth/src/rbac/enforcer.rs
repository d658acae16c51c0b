//! RBAC enforcement: turns resolver denials into errors.

use std::collections::BTreeSet;

use tracing::debug;

use profilehub_core::error::AppError;
use profilehub_entity::user::UserRole;

use super::policies::{Permission, RolePolicy};
use super::resolver::PermissionResolver;

/// Enforces role-based access control for system-level operations.
#[derive(Debug, Clone, Default)]
pub struct RbacEnforcer {
    resolver: PermissionResolver,
}

impl RbacEnforcer {
    /// Creates a new enforcer with the default policy set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an enforcer with a custom policy table.
    pub fn with_policy(policy: RolePolicy) -> Self {
        Self {
            resolver: PermissionResolver::with_policy(policy),
        }
    }

    /// Checks whether the role set holds the required permission.
    ///
    /// Returns `Ok(())` if allowed, or an `Unauthorized` error if denied.
    pub fn require_permission(
        &self,
        roles: &BTreeSet<UserRole>,
        permission: Permission,
    ) -> Result<(), AppError> {
        if self.resolver.has_permission(roles, permission) {
            Ok(())
        } else {
            debug!(permission = %permission, ?roles, "Permission denied");
            Err(AppError::unauthorized(format!(
                "Missing permission '{permission}'"
            )))
        }
    }

    /// Checks whether the role set may assign `new_role`.
    pub fn require_role_change(
        &self,
        roles: &BTreeSet<UserRole>,
        new_role: UserRole,
    ) -> Result<(), AppError> {
        if self.resolver.is_role_change_allowed(roles, new_role) {
            Ok(())
        } else {
            debug!(new_role = %new_role, ?roles, "Role change denied");
            Err(AppError::unauthorized(format!(
                "Not allowed to assign role '{new_role}'"
            )))
        }
    }

    /// Checks whether the role set holds the permission (returns bool).
    pub fn has_permission(&self, roles: &BTreeSet<UserRole>, permission: Permission) -> bool {
        self.resolver.has_permission(roles, permission)
    }

    /// Returns a reference to the underlying resolver.
    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }
}
