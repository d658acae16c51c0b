//! # profilehub-service
//!
//! Application services for ProfileHub. Each service checks who is acting,
//! then delegates to the group directory or the role store.
//!
//! Services follow constructor injection: all dependencies are provided at
//! construction time via `Arc` references.

pub mod context;
pub mod group;
pub mod role;
pub mod session;

pub use context::RequestContext;
pub use group::GroupService;
pub use role::RoleService;
pub use session::SessionCoordinator;
