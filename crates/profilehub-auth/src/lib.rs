//! # profilehub-auth
//!
//! Authorization for ProfileHub.
//!
//! ## Modules
//!
//! - `rbac::policies` maps each role to its level and permission set
//! - `rbac::resolver` answers permission and role-change questions for a role set
//! - `rbac::enforcer` turns denials into `Unauthorized` errors

pub mod rbac;

pub use rbac::{Permission, PermissionResolver, RbacEnforcer, RoleGrant, RolePolicy};
