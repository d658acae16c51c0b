//! PostgreSQL implementations of the store traits.

pub mod audit;
pub mod pool;
pub mod profile;
pub mod user_role;

pub use audit::PgAuditSink;
pub use pool::PgPoolStore;
pub use profile::PgProfileStore;
pub use user_role::PgUserRoleStore;
