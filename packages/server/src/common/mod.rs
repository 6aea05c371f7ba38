// Common types and utilities shared across the application

pub mod capability;
pub mod entity_ids;
pub mod id;

pub use capability::StaffCapability;
pub use entity_ids::*;
pub use id::{Id, V4, V7};
