//! Fingerprint profile references.

pub mod model;
pub mod status;

pub use model::Profile;
pub use status::ProfileStatus;
