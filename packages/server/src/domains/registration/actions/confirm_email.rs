//! Confirm-email action - the applicant proves control of their address
//! with the code the notification subscriber mailed them.

use tracing::info;

use super::{load_session, persist};
use crate::common::SessionId;
use crate::domains::registration::errors::RegistrationError;
use crate::domains::registration::events::{publish_lifecycle, LifecycleEvent};
use crate::domains::registration::machines;
use crate::domains::registration::models::SessionState;
use crate::kernel::ServerDeps;

/// Verify `code` and move the session through `EMAIL_VERIFIED` into
/// `PENDING_APPROVAL` (which grants the longer review window).
pub async fn confirm_email(
    session_id: SessionId,
    code: &str,
    deps: &ServerDeps,
) -> Result<SessionState, RegistrationError> {
    let mut session = load_session(deps, session_id).await?;

    // The transition check also rejects calls from the wrong state/flow.
    let verified = machines::transition(&mut session, SessionState::EmailVerified, &deps.ttl)?;

    match &session.email_verification_code {
        Some(expected) if expected == code => {}
        _ => return Err(RegistrationError::InvalidVerificationCode),
    }
    session.email_verification_code = None;

    let pending = machines::transition(&mut session, SessionState::PendingApproval, &deps.ttl)?;

    persist(deps, &mut session).await?;

    publish_lifecycle(
        &LifecycleEvent::for_transition(&session, &verified),
        deps.nats.as_ref(),
    )
    .await;
    publish_lifecycle(
        &LifecycleEvent::for_transition(&session, &pending),
        deps.nats.as_ref(),
    )
    .await;

    info!(
        session_id = %session_id,
        expires_at = %session.expires_at,
        "email verified, awaiting approval"
    );

    Ok(session.state)
}
