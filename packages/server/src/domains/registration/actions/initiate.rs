//! Initiate action - open a registration session with shape-valid staged
//! data. Business validation happens later, at the `validate` gate.

use tracing::info;

use crate::common::SessionId;
use crate::domains::registration::errors::RegistrationError;
use crate::domains::registration::events::{publish_lifecycle, LifecycleEvent};
use crate::domains::registration::models::{RegistrationFlow, RegistrationSession, StagedBundle};
use crate::domains::registration::validation::Violation;
use crate::kernel::ServerDeps;

/// Open a session for `staged`. Fails with `DuplicateInProgressSession`
/// when a non-terminal session already exists for the applicant's email.
pub async fn initiate(
    flow: RegistrationFlow,
    staged: StagedBundle,
    deps: &ServerDeps,
) -> Result<SessionId, RegistrationError> {
    // Shape requirement: the natural key must exist before anything else.
    let natural_key = match staged.person.as_ref().map(|p| p.email.trim().to_lowercase()) {
        Some(email) if !email.is_empty() => email,
        _ => {
            return Err(RegistrationError::ValidationFailed(vec![
                Violation::required("person.email"),
            ]))
        }
    };

    match deps
        .session_store
        .find_active_by_natural_key(&natural_key)
        .await
    {
        Ok(Some(existing)) => {
            info!(
                session_id = %existing.session_id,
                state = %existing.state,
                "rejecting duplicate registration attempt"
            );
            return Err(RegistrationError::DuplicateInProgressSession);
        }
        Ok(None) => {}
        Err(e) => return Err(e.into()),
    }

    let session = RegistrationSession::new(flow, natural_key, staged, deps.ttl.initial(flow));
    deps.session_store.create(&session).await?;

    info!(
        session_id = %session.session_id,
        flow = %session.flow,
        state = %session.state,
        "registration session opened"
    );

    publish_lifecycle(&LifecycleEvent::initiated(&session), deps.nats.as_ref()).await;

    Ok(session.session_id)
}
