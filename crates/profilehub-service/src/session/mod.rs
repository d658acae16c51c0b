//! Profile checkout and session accounting.

pub mod coordinator;

pub use coordinator::SessionCoordinator;
