//! Cancel action - caller-initiated terminal transition.

use tracing::info;

use super::{load_session, persist};
use crate::common::SessionId;
use crate::domains::registration::errors::RegistrationError;
use crate::domains::registration::events::{publish_lifecycle, LifecycleEvent};
use crate::domains::registration::machines;
use crate::domains::registration::models::SessionState;
use crate::kernel::ServerDeps;

/// Cancel a session from any non-terminal state. Terminal sessions reject
/// the request like any other illegal transition.
pub async fn cancel(
    session_id: SessionId,
    deps: &ServerDeps,
) -> Result<SessionState, RegistrationError> {
    let mut session = load_session(deps, session_id).await?;

    let applied = machines::transition(&mut session, SessionState::Cancelled, &deps.ttl)?;
    persist(deps, &mut session).await?;

    info!(session_id = %session_id, from = %applied.from, "session cancelled");

    publish_lifecycle(
        &LifecycleEvent::for_transition(&session, &applied),
        deps.nats.as_ref(),
    )
    .await;

    Ok(session.state)
}
