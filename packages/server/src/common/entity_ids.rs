//! Typed ID definitions for domain entities.
//!
//! Session ids double as bearer tokens handed to callers, so they use V4
//! (random) UUIDs rather than the time-ordered V7 default.

// Re-export the core Id type and version markers
pub use super::id::{Id, V4, V7};

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for registration sessions.
pub struct RegistrationSessionEntity;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

/// Typed ID for registration sessions. Opaque, high-entropy (122 bits).
pub type SessionId = Id<RegistrationSessionEntity, V4>;
