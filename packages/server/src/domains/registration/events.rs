//! Lifecycle event publishing.
//!
//! Every transition publishes a fact event for out-of-band subscribers
//! (notification email, audit trail). Events are fire-and-forget: they are
//! never read back, and a failed publish is logged and swallowed so a
//! broken subscriber path cannot affect orchestrator correctness.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::common::SessionId;
use crate::domains::registration::machines::AppliedTransition;
use crate::domains::registration::models::{RegistrationSession, SessionState};
use crate::kernel::nats::NatsPublisher;

/// A lifecycle fact: the session moved (or was created) and this is what it
/// looked like afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// e.g. `registration.pending_approval`
    pub name: String,
    pub session_id: SessionId,
    pub from_state: SessionState,
    pub to_state: SessionState,
    pub timestamp: DateTime<Utc>,
    pub payload_snapshot: serde_json::Value,
}

impl LifecycleEvent {
    /// Event for an applied transition.
    pub fn for_transition(session: &RegistrationSession, applied: &AppliedTransition) -> Self {
        Self {
            name: format!("registration.{}", applied.to.as_str().to_lowercase()),
            session_id: session.session_id,
            from_state: applied.from,
            to_state: applied.to,
            timestamp: Utc::now(),
            payload_snapshot: snapshot_value(session),
        }
    }

    /// Event for session creation (no transition happened yet).
    pub fn initiated(session: &RegistrationSession) -> Self {
        Self {
            name: "registration.initiated".to_string(),
            session_id: session.session_id,
            from_state: session.state,
            to_state: session.state,
            timestamp: Utc::now(),
            payload_snapshot: snapshot_value(session),
        }
    }

    /// Attach an extra field to the snapshot, e.g. the verification code the
    /// email subscriber needs, or the quote the payment subscriber needs.
    pub fn with_extra(mut self, key: &str, value: serde_json::Value) -> Self {
        if let Some(object) = self.payload_snapshot.as_object_mut() {
            object.insert(key.to_string(), value);
        }
        self
    }
}

fn snapshot_value(session: &RegistrationSession) -> serde_json::Value {
    serde_json::to_value(session.snapshot()).unwrap_or(serde_json::Value::Null)
}

/// NATS subject for a session's lifecycle stream.
///
/// # Subject Format
///
/// `registrations.{session_id}.lifecycle`
pub fn subject(session_id: SessionId) -> String {
    format!("registrations.{}.lifecycle", session_id)
}

/// Publish a lifecycle event. Errors are logged at warn and dropped.
pub async fn publish_lifecycle(event: &LifecycleEvent, nats: &dyn NatsPublisher) {
    let subject = subject(event.session_id);

    let payload = match serde_json::to_vec(event) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(subject = %subject, error = %e, "failed to serialize lifecycle event");
            return;
        }
    };

    if let Err(e) = nats.publish(subject.clone(), Bytes::from(payload)).await {
        warn!(
            subject = %subject,
            event = %event.name,
            error = %e,
            "failed to publish lifecycle event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::registration::models::{RegistrationFlow, StagedBundle};
    use crate::kernel::nats::TestNats;
    use chrono::Duration;

    fn session() -> RegistrationSession {
        RegistrationSession::new(
            RegistrationFlow::ApprovalGated,
            "a@example.org".into(),
            StagedBundle::default(),
            Duration::hours(24),
        )
    }

    #[tokio::test]
    async fn publishes_to_the_session_subject() {
        let nats = TestNats::new();
        let session = session();
        let event = LifecycleEvent::initiated(&session);

        publish_lifecycle(&event, &nats).await;

        let published = nats.published();
        assert_eq!(published.len(), 1);
        assert_eq!(
            published[0].subject,
            format!("registrations.{}.lifecycle", session.session_id)
        );
        let value: serde_json::Value = serde_json::from_slice(&published[0].payload).unwrap();
        assert_eq!(value["name"], "registration.initiated");
    }

    #[test]
    fn extras_land_in_the_snapshot() {
        let session = session();
        let event = LifecycleEvent::initiated(&session)
            .with_extra("verification_code", serde_json::json!("c0ffee42"));
        assert_eq!(event.payload_snapshot["verification_code"], "c0ffee42");
    }

    #[test]
    fn transition_event_is_named_after_the_target_state() {
        let session = session();
        let applied = AppliedTransition {
            from: SessionState::Staged,
            to: SessionState::EmailVerificationPending,
        };
        let event = LifecycleEvent::for_transition(&session, &applied);
        assert_eq!(event.name, "registration.email_verification_pending");
    }
}
