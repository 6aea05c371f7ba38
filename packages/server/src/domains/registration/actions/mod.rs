//! Caller-facing registration operations.
//!
//! Each operation is a short-lived unit of work: load one session, mutate
//! it, write it back with a conditional set. The orchestrator holds no
//! session state between calls — the store is the only source of truth.

mod approve;
mod cancel;
mod confirm_email;
mod execute;
mod initiate;
mod payment;
mod status;
mod validate;

pub use approve::approve;
pub use cancel::cancel;
pub use confirm_email::confirm_email;
pub use execute::execute;
pub use initiate::initiate;
pub use payment::{begin_payment, confirm_payment};
pub use status::status;
pub use validate::{validate, ValidateOutcome};

use crate::common::SessionId;
use crate::domains::registration::errors::RegistrationError;
use crate::domains::registration::models::RegistrationSession;
use crate::kernel::ServerDeps;

/// Load a session, treating absent and expired identically.
pub(crate) async fn load_session(
    deps: &ServerDeps,
    session_id: SessionId,
) -> Result<RegistrationSession, RegistrationError> {
    match deps.session_store.get(session_id).await {
        Ok(Some(session)) => Ok(session),
        Ok(None) => Err(RegistrationError::SessionNotFound),
        Err(e) => Err(e.into()),
    }
}

/// Conditional write-back; a lost race surfaces as `ConcurrentModification`.
pub(crate) async fn persist(
    deps: &ServerDeps,
    session: &mut RegistrationSession,
) -> Result<(), RegistrationError> {
    deps.session_store.set(session).await.map_err(Into::into)
}
