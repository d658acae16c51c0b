//! Role-based access control (RBAC).

pub mod enforcer;
pub mod policies;
pub mod resolver;

pub use enforcer::RbacEnforcer;
pub use policies::{Permission, RoleGrant, RolePolicy};
pub use resolver::PermissionResolver;
