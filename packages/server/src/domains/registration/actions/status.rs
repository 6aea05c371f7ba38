//! Status action - read-only session snapshot.

use super::load_session;
use crate::common::SessionId;
use crate::domains::registration::errors::RegistrationError;
use crate::domains::registration::models::SessionSnapshot;
use crate::kernel::ServerDeps;

/// Snapshot a session. Expired sessions answer `SessionNotFound`, exactly
/// like sessions that never existed.
pub async fn status(
    session_id: SessionId,
    deps: &ServerDeps,
) -> Result<SessionSnapshot, RegistrationError> {
    Ok(load_session(deps, session_id).await?.snapshot())
}
