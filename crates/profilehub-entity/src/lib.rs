//! # profilehub-entity
//!
//! Domain entity models for ProfileHub. Every struct in this crate
//! represents a stored record or a domain value object. Enums that are
//! persisted map onto PostgreSQL enum types through `sqlx::Type`.

pub mod audit;
pub mod pool;
pub mod profile;
pub mod user;
