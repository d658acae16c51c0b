//! # profilehub-database
//!
//! Persistence seams for ProfileHub: the store traits consumed by the pool
//! and service layers, PostgreSQL implementations of those traits, and an
//! in-memory store for single-node deployments and tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use store::{AuditSink, PoolStore, ProfileStore, UserRoleStore};
