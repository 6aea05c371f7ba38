//! Entity creation sequencer.
//!
//! Materializes a session's staged bundle in the remote store: a fixed,
//! dependency-respecting creation order, progress persisted after every
//! step, idempotent resume, and reverse-order compensation when a required
//! step fails. The remote store has no multi-record transactions, so the
//! saga IS the transaction.
//!
//! Creation calls within one session are strictly sequential: later steps
//! need ids produced by earlier ones, and reverse-order compensation needs
//! a known completion order. Different sessions' sequencers share nothing.

use tracing::{info, warn};

use crate::domains::registration::errors::RegistrationError;
use crate::domains::registration::events::{publish_lifecycle, LifecycleEvent};
use crate::domains::registration::machines;
use crate::domains::registration::models::{
    EntityType, ParentKeys, RegistrationSession, SessionState, StepRecord,
};
use crate::kernel::ServerDeps;

use crate::common::SessionId;

/// One slot in the creation order.
#[derive(Debug, Clone, Copy)]
pub struct StepSpec {
    pub entity: EntityType,
    pub required: bool,
}

/// The dependency order: the root person record first, then the records
/// that bind to its id. Membership last, once everything it references
/// exists.
pub const CREATION_ORDER: [StepSpec; 6] = [
    StepSpec {
        entity: EntityType::Person,
        required: true,
    },
    StepSpec {
        entity: EntityType::Address,
        required: true,
    },
    StepSpec {
        entity: EntityType::ContactChannels,
        required: true,
    },
    StepSpec {
        entity: EntityType::Identity,
        required: false,
    },
    StepSpec {
        entity: EntityType::Education,
        required: false,
    },
    StepSpec {
        entity: EntityType::Membership,
        required: true,
    },
];

/// What `execute` hands back once the saga has run to a terminal decision.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub session_id: SessionId,
    pub final_state: SessionState,
    pub progress: Vec<StepRecord>,
}

/// Run the creation sequence for a session already in `Processing`.
///
/// Safe to call again after a crash or client retry: steps whose entity
/// already has a `SUCCESS` record are skipped, giving at-most-once creation
/// per entity type per session.
pub async fn run(
    session: &mut RegistrationSession,
    deps: &ServerDeps,
) -> Result<ExecutionResult, RegistrationError> {
    let mut parents = ParentKeys::default();
    // Seed foreign keys from steps a previous attempt already completed.
    for (entity, external_id) in session.succeeded_steps() {
        parents.insert(entity, external_id);
    }

    for step in CREATION_ORDER {
        if session.step_succeeded(step.entity) {
            info!(
                session_id = %session.session_id,
                entity = %step.entity,
                "step already succeeded, skipping"
            );
            continue;
        }

        let payload = session
            .staged
            .payload_for(step.entity)
            .map_err(|e| RegistrationError::EntityCreationFailed {
                entity: step.entity,
                detail: format!("staged payload unserializable: {e}"),
            })?;

        let Some(payload) = payload else {
            if step.required {
                // The validation gate guarantees required slots; reaching
                // this means the bundle was corrupted after freezing.
                return fail_and_compensate(
                    session,
                    deps,
                    step.entity,
                    "required payload missing from staged bundle".to_string(),
                )
                .await;
            }
            continue;
        };

        let client = deps.entity_clients.for_entity(step.entity);
        match client.create(&payload, &parents).await {
            Ok(external_id) => {
                session.record_success(step.entity, external_id);
                parents.insert(step.entity, external_id);
                persist(session, deps).await?;
                info!(
                    session_id = %session.session_id,
                    entity = %step.entity,
                    external_id = %external_id,
                    "entity created"
                );
            }
            Err(e) if step.required => {
                return fail_and_compensate(session, deps, step.entity, e.to_string()).await;
            }
            Err(e) => {
                warn!(
                    session_id = %session.session_id,
                    entity = %step.entity,
                    error = %e,
                    "optional step failed, continuing without it"
                );
                session.record_failure(step.entity, e.to_string());
                persist(session, deps).await?;
            }
        }
    }

    let applied = machines::transition(session, SessionState::Completed, &deps.ttl)?;
    persist(session, deps).await?;
    publish_lifecycle(
        &LifecycleEvent::for_transition(session, &applied),
        deps.nats.as_ref(),
    )
    .await;

    info!(session_id = %session.session_id, "registration materialized");

    Ok(ExecutionResult {
        session_id: session.session_id,
        final_state: session.state,
        progress: session.progress.clone(),
    })
}

/// Required step failed: record it, undo every succeeded step in strict
/// reverse order, finish the session in `Failed`.
async fn fail_and_compensate(
    session: &mut RegistrationSession,
    deps: &ServerDeps,
    failed_entity: EntityType,
    detail: String,
) -> Result<ExecutionResult, RegistrationError> {
    warn!(
        session_id = %session.session_id,
        entity = %failed_entity,
        error = %detail,
        "required step failed, compensating prior steps"
    );

    session.record_failure(failed_entity, detail.clone());
    persist(session, deps).await?;

    let succeeded = session.succeeded_steps();
    for (entity, external_id) in succeeded.into_iter().rev() {
        let client = deps.entity_clients.for_entity(entity);
        let compensation_error = match client.delete(external_id).await {
            Ok(()) => {
                info!(
                    session_id = %session.session_id,
                    entity = %entity,
                    external_id = %external_id,
                    "compensated"
                );
                None
            }
            Err(e) => {
                // Recorded but not fatal: there is no transaction to fall
                // back on, and the original failure must stay visible.
                warn!(
                    session_id = %session.session_id,
                    entity = %entity,
                    external_id = %external_id,
                    error = %e,
                    "compensation call failed"
                );
                Some(format!("compensation failed: {e}"))
            }
        };
        session.mark_compensated(entity, compensation_error);
        persist(session, deps).await?;
    }

    let error = RegistrationError::EntityCreationFailed {
        entity: failed_entity,
        detail,
    };
    let applied = machines::transition(session, SessionState::Failed, &deps.ttl)?;
    session.last_error = Some(error.to_body());
    persist(session, deps).await?;
    publish_lifecycle(
        &LifecycleEvent::for_transition(session, &applied),
        deps.nats.as_ref(),
    )
    .await;

    Err(error)
}

async fn persist(
    session: &mut RegistrationSession,
    deps: &ServerDeps,
) -> Result<(), RegistrationError> {
    deps.session_store.set(session).await.map_err(Into::into)
}
