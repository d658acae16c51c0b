//! Profile pool ("group profile") entities.

pub mod kind;
pub mod mode;
pub mod record;
pub mod status;

pub use kind::GroupKind;
pub use mode::SelectionMode;
pub use record::PoolRecord;
pub use status::PoolStatus;
