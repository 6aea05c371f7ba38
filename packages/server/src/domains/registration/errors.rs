//! Error taxonomy for the registration orchestrator.
//!
//! Every caller-facing failure maps onto a stable `{code, message}` pair.
//! Validation and state-machine errors are returned synchronously and never
//! retried on the caller's behalf; `retryable()` tells callers which
//! failures are worth retrying after re-reading `status`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domains::registration::models::{EntityType, SessionState};
use crate::domains::registration::validation::Violation;
use crate::kernel::session_store::StoreError;

#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Session id absent or past its TTL; indistinguishable by design.
    #[error("Session not found")]
    SessionNotFound,

    #[error("Illegal transition from {from} to {requested}")]
    InvalidStateTransition {
        from: SessionState,
        requested: SessionState,
    },

    /// The cross-entity validator found one or more violations. Carries the
    /// complete set, never just the first.
    #[error("Staged data failed validation ({} violation(s))", .0.len())]
    ValidationFailed(Vec<Violation>),

    /// Lost an optimistic-write race; re-read `status` before retrying.
    #[error("Session was modified concurrently")]
    ConcurrentModification,

    /// A non-terminal session already exists for this natural key.
    #[error("A registration is already in progress for this applicant")]
    DuplicateInProgressSession,

    /// A required creation step failed; prior steps have been compensated.
    #[error("Creation of {entity} failed: {detail}")]
    EntityCreationFailed { entity: EntityType, detail: String },

    #[error("Verification code does not match")]
    InvalidVerificationCode,

    /// Session store or remote entity store unreachable. Retryable with
    /// backoff; no partial write is committed without a completed
    /// conditional check.
    #[error("External store unavailable")]
    ExternalStoreUnavailable(#[source] anyhow::Error),
}

impl RegistrationError {
    /// Stable wire code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            RegistrationError::SessionNotFound => "SESSION_NOT_FOUND",
            RegistrationError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            RegistrationError::ValidationFailed(_) => "VALIDATION_FAILED",
            RegistrationError::ConcurrentModification => "CONCURRENT_MODIFICATION",
            RegistrationError::DuplicateInProgressSession => "DUPLICATE_IN_PROGRESS_SESSION",
            RegistrationError::EntityCreationFailed { .. } => "ENTITY_CREATION_FAILED",
            RegistrationError::InvalidVerificationCode => "INVALID_VERIFICATION_CODE",
            RegistrationError::ExternalStoreUnavailable(_) => "EXTERNAL_STORE_UNAVAILABLE",
        }
    }

    /// Whether the same call can succeed on retry without caller-side
    /// changes.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            RegistrationError::ConcurrentModification
                | RegistrationError::ExternalStoreUnavailable(_)
        )
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

impl From<StoreError> for RegistrationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => RegistrationError::SessionNotFound,
            StoreError::VersionConflict { .. } => RegistrationError::ConcurrentModification,
            // A key collision on a fresh v4 session id means someone else
            // created our row between check and insert.
            StoreError::DuplicateKey => RegistrationError::ConcurrentModification,
            StoreError::Unavailable(source) => RegistrationError::ExternalStoreUnavailable(source),
        }
    }
}

/// Structured `{code, message}` pair, stored on the session as `last_error`
/// and returned to callers on every failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(RegistrationError::SessionNotFound.code(), "SESSION_NOT_FOUND");
        assert_eq!(
            RegistrationError::ConcurrentModification.code(),
            "CONCURRENT_MODIFICATION"
        );
    }

    #[test]
    fn only_infra_and_race_errors_are_retryable() {
        assert!(RegistrationError::ConcurrentModification.retryable());
        assert!(RegistrationError::ExternalStoreUnavailable(anyhow::anyhow!("down")).retryable());
        assert!(!RegistrationError::SessionNotFound.retryable());
        assert!(!RegistrationError::ValidationFailed(vec![]).retryable());
    }

    #[test]
    fn body_carries_code_and_message() {
        let body = RegistrationError::EntityCreationFailed {
            entity: EntityType::Address,
            detail: "timeout".into(),
        }
        .to_body();
        assert_eq!(body.code, "ENTITY_CREATION_FAILED");
        assert!(body.message.contains("address"));
    }
}
