//! Registration session - the record tracking one in-progress multi-entity
//! registration attempt.
//!
//! The session is exclusively owned by the orchestrator: created on
//! `initiate`, mutated on every transition, read-only once terminal, and
//! reclaimed when its TTL elapses.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::common::SessionId;
use crate::domains::registration::errors::ErrorBody;
use crate::domains::registration::models::bundle::{EntityType, StagedBundle};

// ============================================================================
// Lifecycle enums
// ============================================================================

/// Which lifecycle shape a session follows. Both flows share the staging,
/// validation and materialization machinery and differ only in their
/// transition tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationFlow {
    /// Applications reviewed by staff before materialization.
    ApprovalGated,
    /// Self-service signups paid for before materialization.
    PaymentGated,
}

impl RegistrationFlow {
    pub fn initial_state(&self) -> SessionState {
        match self {
            RegistrationFlow::ApprovalGated => SessionState::Staged,
            RegistrationFlow::PaymentGated => SessionState::Initiated,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationFlow::ApprovalGated => "approval_gated",
            RegistrationFlow::PaymentGated => "payment_gated",
        }
    }
}

impl fmt::Display for RegistrationFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every state of both lifecycle shapes. Which states are reachable for a
/// given session is decided by its flow's transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    // Approval-gated flow
    Staged,
    EmailVerificationPending,
    EmailVerified,
    PendingApproval,
    Approved,

    // Payment-gated flow
    Initiated,
    CollectingData,
    PricingCalculated,
    PaymentPending,
    PaymentConfirmed,

    // Shared tail
    Processing,

    // Terminal sinks
    Completed,
    Failed,
    Expired,
    Cancelled,
    Rejected,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Staged => "STAGED",
            SessionState::EmailVerificationPending => "EMAIL_VERIFICATION_PENDING",
            SessionState::EmailVerified => "EMAIL_VERIFIED",
            SessionState::PendingApproval => "PENDING_APPROVAL",
            SessionState::Approved => "APPROVED",
            SessionState::Initiated => "INITIATED",
            SessionState::CollectingData => "COLLECTING_DATA",
            SessionState::PricingCalculated => "PRICING_CALCULATED",
            SessionState::PaymentPending => "PAYMENT_PENDING",
            SessionState::PaymentConfirmed => "PAYMENT_CONFIRMED",
            SessionState::Processing => "PROCESSING",
            SessionState::Completed => "COMPLETED",
            SessionState::Failed => "FAILED",
            SessionState::Expired => "EXPIRED",
            SessionState::Cancelled => "CANCELLED",
            SessionState::Rejected => "REJECTED",
        }
    }

    /// Terminal states are immutable sinks: no outgoing transitions, no
    /// further writes to staged data or progress.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed
                | SessionState::Failed
                | SessionState::Expired
                | SessionState::Cancelled
                | SessionState::Rejected
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Staff decision on a pending approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

// ============================================================================
// Step records
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepOutcome {
    Success,
    Failure,
    Compensated,
}

/// Outcome of one creation step. `progress` holds at most one record per
/// entity type; compensation rewrites a `Success` record's outcome to
/// `Compensated` in place, keeping its `external_id` for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub entity: EntityType,
    pub outcome: StepOutcome,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub external_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_detail: Option<String>,
}

// ============================================================================
// Pricing (payment-gated flow)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingLine {
    pub code: String,
    pub description: String,
    pub amount_minor: i64,
}

/// Quote produced by the pricing port, stored on the session once
/// calculated so the caller and the payment subscriber see the same figure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingQuote {
    /// ISO 4217 currency code
    pub currency: String,
    pub total_minor: i64,
    pub lines: Vec<PricingLine>,
}

// ============================================================================
// The session
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationSession {
    pub session_id: SessionId,
    pub flow: RegistrationFlow,
    pub state: SessionState,
    /// Lowercased primary email; at most one non-terminal session per key.
    pub natural_key: String,
    /// Optimistic-concurrency token; bumped on every conditional write.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub staged: StagedBundle,
    pub progress: Vec<StepRecord>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub email_verification_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pricing: Option<PricingQuote>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub payment_reference: Option<String>,
}

impl RegistrationSession {
    pub fn new(
        flow: RegistrationFlow,
        natural_key: String,
        staged: StagedBundle,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: SessionId::new(),
            flow,
            state: flow.initial_state(),
            natural_key,
            version: 1,
            created_at: now,
            expires_at: now + ttl,
            staged,
            progress: Vec::new(),
            last_error: None,
            email_verification_code: None,
            pricing: None,
            payment_reference: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn record_for(&self, entity: EntityType) -> Option<&StepRecord> {
        self.progress.iter().find(|r| r.entity == entity)
    }

    pub fn step_succeeded(&self, entity: EntityType) -> bool {
        matches!(
            self.record_for(entity),
            Some(StepRecord {
                outcome: StepOutcome::Success,
                ..
            })
        )
    }

    /// Append a success record for `entity`.
    pub fn record_success(&mut self, entity: EntityType, external_id: Uuid) {
        self.progress.push(StepRecord {
            entity,
            outcome: StepOutcome::Success,
            external_id: Some(external_id),
            error_detail: None,
        });
    }

    /// Append a failure record for `entity`.
    pub fn record_failure(&mut self, entity: EntityType, detail: String) {
        self.progress.push(StepRecord {
            entity,
            outcome: StepOutcome::Failure,
            external_id: None,
            error_detail: Some(detail),
        });
    }

    /// Rewrite `entity`'s success record as compensated. `detail` carries
    /// the compensation call's own failure, if it had one.
    pub fn mark_compensated(&mut self, entity: EntityType, detail: Option<String>) {
        if let Some(record) = self.progress.iter_mut().find(|r| r.entity == entity) {
            record.outcome = StepOutcome::Compensated;
            record.error_detail = detail;
        }
    }

    /// Succeeded steps with their remote ids, in creation order.
    pub fn succeeded_steps(&self) -> Vec<(EntityType, Uuid)> {
        self.progress
            .iter()
            .filter(|r| r.outcome == StepOutcome::Success)
            .filter_map(|r| r.external_id.map(|id| (r.entity, id)))
            .collect()
    }

    /// Read-only view for `status` and event snapshots.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id,
            flow: self.flow,
            state: self.state,
            created_at: self.created_at,
            expires_at: self.expires_at,
            progress: self.progress.clone(),
            last_error: self.last_error.clone(),
            pricing: self.pricing.clone(),
        }
    }
}

/// What callers see from `status`: everything except the staged payloads
/// and the verification secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub flow: RegistrationFlow,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub progress: Vec<StepRecord>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pricing: Option<PricingQuote>,
}
