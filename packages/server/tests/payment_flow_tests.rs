//! Integration tests for the payment-gated registration flow.

mod common;

use crate::common::{complete_bundle, TestHarness};
use server_core::common::StaffCapability;
use server_core::domains::registration::actions::{self, ValidateOutcome};
use server_core::domains::registration::errors::RegistrationError;
use server_core::domains::registration::events;
use server_core::domains::registration::models::{RegistrationFlow, SessionState, StagedBundle};

#[tokio::test]
async fn payment_flow_runs_end_to_end() {
    let harness = TestHarness::new();

    let session_id = actions::initiate(
        RegistrationFlow::PaymentGated,
        complete_bundle("bob@example.org"),
        &harness.deps,
    )
    .await
    .unwrap();

    let snapshot = actions::status(session_id, &harness.deps).await.unwrap();
    assert_eq!(snapshot.state, SessionState::Initiated);

    let outcome = actions::validate(session_id, None, &harness.deps).await.unwrap();
    assert!(matches!(
        outcome,
        ValidateOutcome::Advanced(SessionState::PricingCalculated)
    ));

    // The pricing port's quote is stored on the session.
    let snapshot = actions::status(session_id, &harness.deps).await.unwrap();
    let quote = snapshot.pricing.expect("quote stored");
    assert_eq!(quote.currency, "EUR");
    assert_eq!(quote.total_minor, 12_500);

    let state = actions::begin_payment(session_id, &harness.deps).await.unwrap();
    assert_eq!(state, SessionState::PaymentPending);

    let state = actions::confirm_payment(session_id, "pi_3NxT2d", &harness.deps)
        .await
        .unwrap();
    assert_eq!(state, SessionState::PaymentConfirmed);

    let result = actions::execute(
        session_id,
        StaffCapability::ExecuteRegistrations,
        &harness.deps,
    )
    .await
    .unwrap();
    assert_eq!(result.final_state, SessionState::Completed);

    // The payment-pending event carried the quote for the payment
    // subscriber; the confirmation carried the provider reference.
    let payloads = harness.nats.json_payloads_for(&events::subject(session_id));
    let pending = payloads
        .iter()
        .find(|p| p["name"] == "registration.payment_pending")
        .unwrap();
    assert_eq!(pending["payload_snapshot"]["quote"]["total_minor"], 12_500);
    let confirmed = payloads
        .iter()
        .find(|p| p["name"] == "registration.payment_confirmed")
        .unwrap();
    assert_eq!(
        confirmed["payload_snapshot"]["payment_reference"],
        "pi_3NxT2d"
    );
}

#[tokio::test]
async fn data_can_be_staged_across_several_validate_calls() {
    let harness = TestHarness::new();

    // Only the person record to start with.
    let mut opening = StagedBundle::default();
    opening.person = complete_bundle("carol@example.org").person;

    let session_id = actions::initiate(RegistrationFlow::PaymentGated, opening, &harness.deps)
        .await
        .unwrap();

    // First partial merge: still incomplete, but the session has moved into
    // data collection.
    let mut first_partial = StagedBundle::default();
    first_partial.address = complete_bundle("carol@example.org").address;
    let outcome = actions::validate(session_id, Some(first_partial), &harness.deps)
        .await
        .unwrap();
    let ValidateOutcome::Invalid(violations) = outcome else {
        panic!("bundle is still incomplete");
    };
    assert!(violations.iter().any(|v| v.field == "contact_channels"));

    let snapshot = actions::status(session_id, &harness.deps).await.unwrap();
    assert_eq!(snapshot.state, SessionState::CollectingData);

    // Second merge completes the bundle and passes the gate.
    let mut second_partial = StagedBundle::default();
    let full = complete_bundle("carol@example.org");
    second_partial.contact_channels = full.contact_channels;
    second_partial.identity = full.identity;
    second_partial.membership = full.membership;

    let outcome = actions::validate(session_id, Some(second_partial), &harness.deps)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        ValidateOutcome::Advanced(SessionState::PricingCalculated)
    ));
}

#[tokio::test]
async fn pricing_port_failure_is_retryable_and_leaves_data_staged() {
    let harness = {
        let mut harness = TestHarness::new();
        harness.deps.pricing = std::sync::Arc::new(
            server_core::kernel::test_dependencies::MockPricingService::new()
                .failing("catalog unavailable"),
        );
        harness
    };

    let session_id = actions::initiate(
        RegistrationFlow::PaymentGated,
        complete_bundle("bob@example.org"),
        &harness.deps,
    )
    .await
    .unwrap();

    let err = actions::validate(session_id, None, &harness.deps)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::ExternalStoreUnavailable(_)
    ));
    assert!(err.retryable());
}

#[tokio::test]
async fn begin_payment_before_pricing_is_an_illegal_transition() {
    let harness = TestHarness::new();
    let session_id = actions::initiate(
        RegistrationFlow::PaymentGated,
        complete_bundle("bob@example.org"),
        &harness.deps,
    )
    .await
    .unwrap();

    let err = actions::begin_payment(session_id, &harness.deps)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::InvalidStateTransition {
            from: SessionState::Initiated,
            requested: SessionState::PaymentPending,
        }
    ));
}
