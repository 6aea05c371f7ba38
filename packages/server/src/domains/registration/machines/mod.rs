//! Registration lifecycle state machine - pure decision logic
//!
//! Both lifecycle shapes run through the same mechanism and differ only in
//! their adjacency tables. Every transition request is checked against the
//! static table for the session's flow; an illegal request fails without
//! touching the session. Transitions are also the only point where a
//! session's TTL may be extended.

use chrono::{Duration, Utc};

use crate::domains::registration::errors::RegistrationError;
use crate::domains::registration::models::{RegistrationFlow, RegistrationSession, SessionState};

/// Legal targets from `from` under `flow`. Terminal states map to the empty
/// slice.
pub fn allowed_targets(flow: RegistrationFlow, from: SessionState) -> &'static [SessionState] {
    use SessionState::*;

    match flow {
        RegistrationFlow::ApprovalGated => match from {
            Staged => &[EmailVerificationPending, Failed, Expired, Cancelled],
            EmailVerificationPending => &[EmailVerified, Failed, Expired, Cancelled],
            EmailVerified => &[PendingApproval, Failed, Expired, Cancelled],
            PendingApproval => &[Approved, Rejected, Failed, Expired, Cancelled],
            Approved => &[Processing, Failed, Expired, Cancelled],
            Processing => &[Completed, Failed, Expired, Cancelled],
            // Payment-flow states are unreachable under this flow
            Initiated | CollectingData | PricingCalculated | PaymentPending | PaymentConfirmed => {
                &[]
            }
            Completed | Failed | Expired | Cancelled | Rejected => &[],
        },
        RegistrationFlow::PaymentGated => match from {
            Initiated => &[CollectingData, Failed, Expired, Cancelled],
            CollectingData => &[PricingCalculated, Failed, Expired, Cancelled],
            PricingCalculated => &[PaymentPending, Failed, Expired, Cancelled],
            PaymentPending => &[PaymentConfirmed, Failed, Expired, Cancelled],
            PaymentConfirmed => &[Processing, Failed, Expired, Cancelled],
            Processing => &[Completed, Failed, Expired, Cancelled],
            // Approval-flow states are unreachable under this flow
            Staged | EmailVerificationPending | EmailVerified | PendingApproval | Approved => &[],
            Completed | Failed | Expired | Cancelled | Rejected => &[],
        },
    }
}

pub fn can_transition(flow: RegistrationFlow, from: SessionState, to: SessionState) -> bool {
    allowed_targets(flow, from).contains(&to)
}

/// TTL grants. Sessions start with a per-flow TTL; entering a state with a
/// grant replaces the remaining TTL with that grant's window.
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    /// Initial TTL for approval-gated sessions
    pub approval_session: Duration,
    /// Initial TTL for payment-gated sessions
    pub payment_session: Duration,
    /// Window granted on entering `PendingApproval`, so reviewers get more
    /// time than the applicant-facing staging states
    pub approval_review_window: Duration,
}

impl TtlPolicy {
    pub fn new(
        approval_session_hours: i64,
        payment_session_hours: i64,
        approval_review_window_hours: i64,
    ) -> Self {
        Self {
            approval_session: Duration::hours(approval_session_hours),
            payment_session: Duration::hours(payment_session_hours),
            approval_review_window: Duration::hours(approval_review_window_hours),
        }
    }

    pub fn initial(&self, flow: RegistrationFlow) -> Duration {
        match flow {
            RegistrationFlow::ApprovalGated => self.approval_session,
            RegistrationFlow::PaymentGated => self.payment_session,
        }
    }

    fn grant(&self, flow: RegistrationFlow, to: SessionState) -> Option<Duration> {
        match (flow, to) {
            (RegistrationFlow::ApprovalGated, SessionState::PendingApproval) => {
                Some(self.approval_review_window)
            }
            _ => None,
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::new(24, 48, 72)
    }
}

/// A transition that was applied; feeds the lifecycle event.
#[derive(Debug, Clone, Copy)]
pub struct AppliedTransition {
    pub from: SessionState,
    pub to: SessionState,
}

/// Apply `to` to the session if the flow's table allows it, extending
/// `expires_at` when the target state carries a grant.
pub fn transition(
    session: &mut RegistrationSession,
    to: SessionState,
    ttl: &TtlPolicy,
) -> Result<AppliedTransition, RegistrationError> {
    let from = session.state;
    if !can_transition(session.flow, from, to) {
        return Err(RegistrationError::InvalidStateTransition {
            from,
            requested: to,
        });
    }

    session.state = to;
    if let Some(window) = ttl.grant(session.flow, to) {
        session.expires_at = Utc::now() + window;
    }

    Ok(AppliedTransition { from, to })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::registration::models::StagedBundle;

    const ALL_STATES: [SessionState; 16] = [
        SessionState::Staged,
        SessionState::EmailVerificationPending,
        SessionState::EmailVerified,
        SessionState::PendingApproval,
        SessionState::Approved,
        SessionState::Initiated,
        SessionState::CollectingData,
        SessionState::PricingCalculated,
        SessionState::PaymentPending,
        SessionState::PaymentConfirmed,
        SessionState::Processing,
        SessionState::Completed,
        SessionState::Failed,
        SessionState::Expired,
        SessionState::Cancelled,
        SessionState::Rejected,
    ];

    const FLOWS: [RegistrationFlow; 2] = [
        RegistrationFlow::ApprovalGated,
        RegistrationFlow::PaymentGated,
    ];

    fn session_in(flow: RegistrationFlow, state: SessionState) -> RegistrationSession {
        let mut session = RegistrationSession::new(
            flow,
            "a@example.org".into(),
            StagedBundle::default(),
            Duration::hours(24),
        );
        session.state = state;
        session
    }

    #[test]
    fn terminal_states_have_no_targets() {
        for flow in FLOWS {
            for state in ALL_STATES.iter().filter(|s| s.is_terminal()) {
                assert!(
                    allowed_targets(flow, *state).is_empty(),
                    "{flow}: {state} must be a sink"
                );
            }
        }
    }

    #[test]
    fn every_request_either_lands_in_the_table_or_is_rejected_unchanged() {
        let ttl = TtlPolicy::default();
        for flow in FLOWS {
            for from in ALL_STATES {
                for to in ALL_STATES {
                    let mut session = session_in(flow, from);
                    let result = transition(&mut session, to, &ttl);
                    if allowed_targets(flow, from).contains(&to) {
                        assert_eq!(session.state, to);
                        let applied = result.unwrap();
                        assert_eq!((applied.from, applied.to), (from, to));
                    } else {
                        assert!(matches!(
                            result,
                            Err(RegistrationError::InvalidStateTransition { .. })
                        ));
                        assert_eq!(session.state, from, "{flow}: rejected {from}->{to} mutated");
                    }
                }
            }
        }
    }

    #[test]
    fn happy_paths_are_fully_connected() {
        let approval = [
            SessionState::Staged,
            SessionState::EmailVerificationPending,
            SessionState::EmailVerified,
            SessionState::PendingApproval,
            SessionState::Approved,
            SessionState::Processing,
            SessionState::Completed,
        ];
        for pair in approval.windows(2) {
            assert!(can_transition(
                RegistrationFlow::ApprovalGated,
                pair[0],
                pair[1]
            ));
        }

        let payment = [
            SessionState::Initiated,
            SessionState::CollectingData,
            SessionState::PricingCalculated,
            SessionState::PaymentPending,
            SessionState::PaymentConfirmed,
            SessionState::Processing,
            SessionState::Completed,
        ];
        for pair in payment.windows(2) {
            assert!(can_transition(
                RegistrationFlow::PaymentGated,
                pair[0],
                pair[1]
            ));
        }
    }

    #[test]
    fn failed_reachable_from_every_non_terminal_payment_state() {
        for from in ALL_STATES.iter().filter(|s| !s.is_terminal()) {
            let targets = allowed_targets(RegistrationFlow::PaymentGated, *from);
            if !targets.is_empty() {
                assert!(targets.contains(&SessionState::Failed), "{from}");
            }
        }
    }

    #[test]
    fn entering_pending_approval_extends_the_ttl() {
        let ttl = TtlPolicy::default();
        let mut session = session_in(RegistrationFlow::ApprovalGated, SessionState::EmailVerified);
        let before = session.expires_at;

        transition(&mut session, SessionState::PendingApproval, &ttl).unwrap();

        assert!(session.expires_at > before);
    }

    #[test]
    fn flows_cannot_wander_into_each_others_states() {
        assert!(!can_transition(
            RegistrationFlow::ApprovalGated,
            SessionState::Staged,
            SessionState::CollectingData
        ));
        assert!(!can_transition(
            RegistrationFlow::PaymentGated,
            SessionState::Initiated,
            SessionState::EmailVerificationPending
        ));
    }
}
