//! # profilehub-pool
//!
//! Profile pools ("group profiles") and the directory that owns them.
//!
//! ## Modules
//!
//! - `pool` is the per-pool selection and session admission state machine
//! - `selection` implements the selection modes
//! - `directory` caches pools, validates administrative changes and persists them
//! - `reconciler` clears session counters left behind by a previous process

pub mod directory;
pub mod pool;
pub mod reconciler;
pub mod selection;

pub use directory::{GroupDirectory, NewCustomPool, PoolDefaults, PoolUpdate};
pub use pool::{CheckoutMark, PoolSettings, PoolStats, ProfilePool};
pub use reconciler::SessionReconciler;
