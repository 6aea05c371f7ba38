//! Payment actions for the payment-gated flow.
//!
//! Provider integration lives outside: `begin_payment` hands the quote to
//! the payment subscriber via the lifecycle event, and `confirm_payment`
//! records the reference of an externally verified payment.

use tracing::info;

use super::{load_session, persist};
use crate::common::SessionId;
use crate::domains::registration::errors::RegistrationError;
use crate::domains::registration::events::{publish_lifecycle, LifecycleEvent};
use crate::domains::registration::machines;
use crate::domains::registration::models::SessionState;
use crate::kernel::ServerDeps;

/// `PRICING_CALCULATED -> PAYMENT_PENDING`; the emitted event carries the
/// stored quote for the payment subscriber.
pub async fn begin_payment(
    session_id: SessionId,
    deps: &ServerDeps,
) -> Result<SessionState, RegistrationError> {
    let mut session = load_session(deps, session_id).await?;

    let applied = machines::transition(&mut session, SessionState::PaymentPending, &deps.ttl)?;
    persist(deps, &mut session).await?;

    let mut event = LifecycleEvent::for_transition(&session, &applied);
    if let Some(quote) = &session.pricing {
        event = event.with_extra(
            "quote",
            serde_json::to_value(quote).unwrap_or(serde_json::Value::Null),
        );
    }
    publish_lifecycle(&event, deps.nats.as_ref()).await;

    info!(session_id = %session_id, "payment requested");

    Ok(session.state)
}

/// `PAYMENT_PENDING -> PAYMENT_CONFIRMED`, recording the provider's
/// reference for the completed payment.
pub async fn confirm_payment(
    session_id: SessionId,
    payment_reference: &str,
    deps: &ServerDeps,
) -> Result<SessionState, RegistrationError> {
    let mut session = load_session(deps, session_id).await?;

    let applied = machines::transition(&mut session, SessionState::PaymentConfirmed, &deps.ttl)?;
    session.payment_reference = Some(payment_reference.to_string());
    persist(deps, &mut session).await?;

    publish_lifecycle(
        &LifecycleEvent::for_transition(&session, &applied)
            .with_extra("payment_reference", serde_json::json!(payment_reference)),
        deps.nats.as_ref(),
    )
    .await;

    info!(
        session_id = %session_id,
        payment_reference = %payment_reference,
        "payment confirmed"
    );

    Ok(session.state)
}
