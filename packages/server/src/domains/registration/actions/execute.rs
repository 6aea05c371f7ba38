//! Execute action - materialize an authorized session in the remote store.

use tracing::info;

use super::{load_session, persist};
use crate::common::{SessionId, StaffCapability};
use crate::domains::registration::errors::RegistrationError;
use crate::domains::registration::events::{publish_lifecycle, LifecycleEvent};
use crate::domains::registration::machines;
use crate::domains::registration::models::{SessionState, StepOutcome};
use crate::domains::registration::sequencer::{self, ExecutionResult, CREATION_ORDER};
use crate::kernel::ServerDeps;

/// Run the creation saga. Idempotent to repeated calls: a session already
/// `PROCESSING` resumes where its progress left off, a `COMPLETED` session
/// returns its result again, and a `FAILED` one returns its recorded
/// failure.
pub async fn execute(
    session_id: SessionId,
    capability: StaffCapability,
    deps: &ServerDeps,
) -> Result<ExecutionResult, RegistrationError> {
    let mut session = load_session(deps, session_id).await?;

    match session.state {
        SessionState::Approved | SessionState::PaymentConfirmed => {
            let applied =
                machines::transition(&mut session, SessionState::Processing, &deps.ttl)?;
            // Losing a concurrent execute race stops this caller here,
            // before any creation call is made.
            persist(deps, &mut session).await?;
            publish_lifecycle(
                &LifecycleEvent::for_transition(&session, &applied),
                deps.nats.as_ref(),
            )
            .await;
            info!(
                session_id = %session_id,
                capability = capability.as_str(),
                "materialization started"
            );
        }
        SessionState::Processing => {
            info!(session_id = %session_id, "resuming interrupted materialization");
        }
        SessionState::Completed => {
            return Ok(ExecutionResult {
                session_id,
                final_state: session.state,
                progress: session.progress.clone(),
            });
        }
        SessionState::Failed => return Err(recorded_failure(&session)),
        from => {
            return Err(RegistrationError::InvalidStateTransition {
                from,
                requested: SessionState::Processing,
            })
        }
    }

    sequencer::run(&mut session, deps).await
}

/// Reconstruct the failure a finished-`FAILED` session recorded.
fn recorded_failure(
    session: &crate::domains::registration::models::RegistrationSession,
) -> RegistrationError {
    let failed_required = session.progress.iter().find(|r| {
        r.outcome == StepOutcome::Failure
            && CREATION_ORDER
                .iter()
                .any(|s| s.entity == r.entity && s.required)
    });
    match failed_required {
        Some(record) => RegistrationError::EntityCreationFailed {
            entity: record.entity,
            detail: record
                .error_detail
                .clone()
                .unwrap_or_else(|| "creation failed".to_string()),
        },
        None => RegistrationError::InvalidStateTransition {
            from: session.state,
            requested: SessionState::Processing,
        },
    }
}
