//! Core type definitions used across the ProfileHub workspace.

pub mod id;

pub use id::*;
