//! Validate action - merge any partial bundle, run the cross-entity
//! validator, advance past the gate on a clean pass.

use tracing::info;
use uuid::Uuid;

use super::{load_session, persist};
use crate::common::SessionId;
use crate::domains::registration::errors::RegistrationError;
use crate::domains::registration::events::{publish_lifecycle, LifecycleEvent};
use crate::domains::registration::machines;
use crate::domains::registration::models::{
    RegistrationFlow, SessionState, StagedBundle,
};
use crate::domains::registration::validation::{validate_bundle, Violation};
use crate::kernel::ServerDeps;

/// Outcome of a `validate` call. Violations are data, not an error: the
/// session stays where it is and the caller gets the complete list.
#[derive(Debug)]
pub enum ValidateOutcome {
    /// Zero violations; the session advanced to this state.
    Advanced(SessionState),
    /// The complete violation set from this pass.
    Invalid(Vec<Violation>),
}

pub async fn validate(
    session_id: SessionId,
    partial: Option<StagedBundle>,
    deps: &ServerDeps,
) -> Result<ValidateOutcome, RegistrationError> {
    let mut session = load_session(deps, session_id).await?;

    let gate_target = match session.flow {
        RegistrationFlow::ApprovalGated => SessionState::EmailVerificationPending,
        RegistrationFlow::PaymentGated => SessionState::PricingCalculated,
    };
    let pre_validation = matches!(
        (session.flow, session.state),
        (RegistrationFlow::ApprovalGated, SessionState::Staged)
            | (
                RegistrationFlow::PaymentGated,
                SessionState::Initiated | SessionState::CollectingData
            )
    );
    if !pre_validation {
        // Staged data froze when the gate passed; no merging or re-running.
        return Err(RegistrationError::InvalidStateTransition {
            from: session.state,
            requested: gate_target,
        });
    }

    let mut merged = false;
    if let Some(partial) = partial {
        session.staged.merge(partial);
        merged = true;
    }

    // In the payment flow the first staged data moves the session out of
    // its opening state; collection may then iterate under COLLECTING_DATA.
    let mut applied_transitions = Vec::new();
    if merged && session.state == SessionState::Initiated {
        applied_transitions.push(machines::transition(
            &mut session,
            SessionState::CollectingData,
            &deps.ttl,
        )?);
    }

    let violations = validate_bundle(&session.staged);
    if !violations.is_empty() {
        if merged {
            persist(deps, &mut session).await?;
            for applied in &applied_transitions {
                publish_lifecycle(
                    &LifecycleEvent::for_transition(&session, applied),
                    deps.nats.as_ref(),
                )
                .await;
            }
        }
        info!(
            session_id = %session_id,
            count = violations.len(),
            "validation found violations"
        );
        return Ok(ValidateOutcome::Invalid(violations));
    }

    match session.flow {
        RegistrationFlow::ApprovalGated => {
            session.email_verification_code = Some(generate_verification_code());
            applied_transitions.push(machines::transition(
                &mut session,
                SessionState::EmailVerificationPending,
                &deps.ttl,
            )?);
        }
        RegistrationFlow::PaymentGated => {
            if session.state == SessionState::Initiated {
                applied_transitions.push(machines::transition(
                    &mut session,
                    SessionState::CollectingData,
                    &deps.ttl,
                )?);
            }
            let quote = deps
                .pricing
                .quote(&session.staged)
                .await
                .map_err(RegistrationError::ExternalStoreUnavailable)?;
            session.pricing = Some(quote);
            applied_transitions.push(machines::transition(
                &mut session,
                SessionState::PricingCalculated,
                &deps.ttl,
            )?);
        }
    }

    persist(deps, &mut session).await?;

    for applied in &applied_transitions {
        let mut event = LifecycleEvent::for_transition(&session, applied);
        // Subscribers need the code to send the verification mail; it never
        // appears in `status` snapshots.
        if applied.to == SessionState::EmailVerificationPending {
            if let Some(code) = &session.email_verification_code {
                event = event.with_extra("verification_code", serde_json::json!(code));
            }
        }
        publish_lifecycle(&event, deps.nats.as_ref()).await;
    }

    info!(
        session_id = %session_id,
        state = %session.state,
        "staged data validated"
    );

    Ok(ValidateOutcome::Advanced(session.state))
}

/// Short-lived, session-bound code; 8 hex chars is plenty.
fn generate_verification_code() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
