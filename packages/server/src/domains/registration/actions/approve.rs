//! Approve action - staff decision on a pending registration.

use tracing::info;

use super::{load_session, persist};
use crate::common::{SessionId, StaffCapability};
use crate::domains::registration::errors::RegistrationError;
use crate::domains::registration::events::{publish_lifecycle, LifecycleEvent};
use crate::domains::registration::machines;
use crate::domains::registration::models::{Decision, SessionState};
use crate::kernel::ServerDeps;

/// Apply a staff decision: `PENDING_APPROVAL -> APPROVED | REJECTED`.
///
/// `capability` has already been verified by the auth layer; it is carried
/// here as evidence for the audit trail, not re-checked. Two racing
/// decisions resolve at the store: the loser gets
/// `ConcurrentModification` (or `InvalidStateTransition` if it reads the
/// session after it already turned terminal).
pub async fn approve(
    session_id: SessionId,
    decision: Decision,
    capability: StaffCapability,
    deps: &ServerDeps,
) -> Result<SessionState, RegistrationError> {
    let mut session = load_session(deps, session_id).await?;

    let target = match decision {
        Decision::Approve => SessionState::Approved,
        Decision::Reject => SessionState::Rejected,
    };
    let applied = machines::transition(&mut session, target, &deps.ttl)?;

    persist(deps, &mut session).await?;

    info!(
        session_id = %session_id,
        decision = ?decision,
        capability = capability.as_str(),
        state = %session.state,
        "approval decision recorded"
    );

    publish_lifecycle(
        &LifecycleEvent::for_transition(&session, &applied),
        deps.nats.as_ref(),
    )
    .await;

    Ok(session.state)
}
