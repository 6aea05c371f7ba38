// TestDependencies - mock implementations for testing
//
// Provides mock services that can be injected into ServerDeps for tests.
// Production code never uses these: in particular, the in-memory session
// store exists for tests only - there is no in-memory fallback path.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::session_store::{BaseSessionStore, StoreError};
use super::{BaseEntityClient, BasePricingService};
use crate::common::SessionId;
use crate::domains::registration::models::{
    ParentKeys, PricingLine, PricingQuote, RegistrationSession, StagedBundle,
};

/// Shared call journal, so a test can assert ordering ACROSS several mock
/// clients (e.g. that compensation ran in reverse creation order).
pub type CallJournal = Arc<Mutex<Vec<String>>>;

pub fn new_call_journal() -> CallJournal {
    Arc::new(Mutex::new(Vec::new()))
}

// =============================================================================
// Mock Entity Client
// =============================================================================

pub struct MockEntityClient {
    label: &'static str,
    journal: Option<CallJournal>,
    fail_create: Option<String>,
    fail_delete: Option<String>,
    create_calls: Mutex<Vec<(Value, ParentKeys)>>,
    delete_calls: Mutex<Vec<Uuid>>,
    created_ids: Mutex<Vec<Uuid>>,
}

impl MockEntityClient {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            journal: None,
            fail_create: None,
            fail_delete: None,
            create_calls: Mutex::new(Vec::new()),
            delete_calls: Mutex::new(Vec::new()),
            created_ids: Mutex::new(Vec::new()),
        }
    }

    /// Record create/delete calls into a journal shared with other clients.
    pub fn with_journal(mut self, journal: CallJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Every create call fails with this message.
    pub fn failing_create(mut self, message: &str) -> Self {
        self.fail_create = Some(message.to_string());
        self
    }

    /// Every delete call fails with this message.
    pub fn failing_delete(mut self, message: &str) -> Self {
        self.fail_delete = Some(message.to_string());
        self
    }

    pub fn create_count(&self) -> usize {
        self.create_calls.lock().unwrap().len()
    }

    /// Payload/parent-key pairs from every create call.
    pub fn create_calls(&self) -> Vec<(Value, ParentKeys)> {
        self.create_calls.lock().unwrap().clone()
    }

    pub fn created_ids(&self) -> Vec<Uuid> {
        self.created_ids.lock().unwrap().clone()
    }

    pub fn deleted_ids(&self) -> Vec<Uuid> {
        self.delete_calls.lock().unwrap().clone()
    }

    fn journal_push(&self, op: &str) {
        if let Some(journal) = &self.journal {
            journal.lock().unwrap().push(format!("{}:{}", op, self.label));
        }
    }
}

#[async_trait]
impl BaseEntityClient for MockEntityClient {
    async fn create(&self, payload: &Value, parents: &ParentKeys) -> Result<Uuid> {
        self.create_calls
            .lock()
            .unwrap()
            .push((payload.clone(), parents.clone()));
        self.journal_push("create");

        if let Some(message) = &self.fail_create {
            bail!("{message}");
        }

        let id = Uuid::new_v4();
        self.created_ids.lock().unwrap().push(id);
        Ok(id)
    }

    async fn delete(&self, external_id: Uuid) -> Result<()> {
        self.delete_calls.lock().unwrap().push(external_id);
        self.journal_push("delete");

        if let Some(message) = &self.fail_delete {
            bail!("{message}");
        }
        Ok(())
    }
}

// =============================================================================
// Mock Pricing Service
// =============================================================================

pub struct MockPricingService {
    quote: PricingQuote,
    fail_with: Option<String>,
    calls: Mutex<usize>,
}

impl MockPricingService {
    pub fn new() -> Self {
        Self {
            quote: PricingQuote {
                currency: "EUR".to_string(),
                total_minor: 12_500,
                lines: vec![PricingLine {
                    code: "MEMBERSHIP_FEE".to_string(),
                    description: "Annual membership fee".to_string(),
                    amount_minor: 12_500,
                }],
            },
            fail_with: None,
            calls: Mutex::new(0),
        }
    }

    pub fn with_quote(mut self, quote: PricingQuote) -> Self {
        self.quote = quote;
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl Default for MockPricingService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BasePricingService for MockPricingService {
    async fn quote(&self, _bundle: &StagedBundle) -> Result<PricingQuote> {
        *self.calls.lock().unwrap() += 1;
        if let Some(message) = &self.fail_with {
            bail!("{message}");
        }
        Ok(self.quote.clone())
    }
}

// =============================================================================
// In-memory session store (tests only)
// =============================================================================

/// In-memory `BaseSessionStore` with the same lazy-expiry and
/// conditional-write semantics as the Postgres store.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, RegistrationSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a session without any checks. Lets tests craft
    /// states reachable only through crashes or elapsed time (e.g. an
    /// expired session, or a half-finished PROCESSING one).
    pub async fn force_put(&self, session: RegistrationSession) {
        self.sessions
            .write()
            .await
            .insert(session.session_id, session);
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl BaseSessionStore for InMemorySessionStore {
    async fn create(&self, session: &RegistrationSession) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(&session.session_id) {
            if !existing.is_expired(Utc::now()) {
                return Err(StoreError::DuplicateKey);
            }
        }
        sessions.insert(session.session_id, session.clone());
        Ok(())
    }

    async fn get(&self, session_id: SessionId) -> Result<Option<RegistrationSession>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(&session_id)
            .filter(|s| !s.is_expired(Utc::now()))
            .cloned())
    }

    async fn set(&self, session: &mut RegistrationSession) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&session.session_id) {
            None => Err(StoreError::NotFound),
            Some(existing) if existing.is_expired(Utc::now()) => Err(StoreError::NotFound),
            Some(existing) if existing.version != session.version => {
                Err(StoreError::VersionConflict {
                    expected: session.version,
                })
            }
            Some(existing) => {
                session.version += 1;
                *existing = session.clone();
                Ok(())
            }
        }
    }

    async fn delete(&self, session_id: SessionId) -> Result<(), StoreError> {
        self.sessions.write().await.remove(&session_id);
        Ok(())
    }

    async fn find_active_by_natural_key(
        &self,
        natural_key: &str,
    ) -> Result<Option<RegistrationSession>, StoreError> {
        let sessions = self.sessions.read().await;
        let now = Utc::now();
        Ok(sessions
            .values()
            .find(|s| s.natural_key == natural_key && !s.is_terminal() && !s.is_expired(now))
            .cloned())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::registration::models::RegistrationFlow;
    use chrono::Duration;

    fn sample_session() -> RegistrationSession {
        RegistrationSession::new(
            RegistrationFlow::ApprovalGated,
            "ada@example.org".into(),
            StagedBundle::default(),
            Duration::hours(24),
        )
    }

    #[tokio::test]
    async fn create_rejects_duplicate_keys() {
        let store = InMemorySessionStore::new();
        let session = sample_session();
        store.create(&session).await.unwrap();

        assert!(matches!(
            store.create(&session).await,
            Err(StoreError::DuplicateKey)
        ));
    }

    #[tokio::test]
    async fn expired_sessions_read_as_absent() {
        let store = InMemorySessionStore::new();
        let mut session = sample_session();
        session.expires_at = Utc::now() - Duration::minutes(1);
        store.force_put(session.clone()).await;

        assert!(store.get(session.session_id).await.unwrap().is_none());
        assert!(store
            .find_active_by_natural_key("ada@example.org")
            .await
            .unwrap()
            .is_none());
        // The row is still physically present until purged.
        assert_eq!(store.len().await, 1);
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn conditional_set_detects_lost_races() {
        let store = InMemorySessionStore::new();
        let session = sample_session();
        store.create(&session).await.unwrap();

        let mut copy_a = store.get(session.session_id).await.unwrap().unwrap();
        let mut copy_b = store.get(session.session_id).await.unwrap().unwrap();

        store.set(&mut copy_a).await.unwrap();
        assert_eq!(copy_a.version, session.version + 1);

        assert!(matches!(
            store.set(&mut copy_b).await,
            Err(StoreError::VersionConflict { .. })
        ));
    }

    #[tokio::test]
    async fn deleted_sessions_are_gone() {
        let store = InMemorySessionStore::new();
        let session = sample_session();
        store.create(&session).await.unwrap();

        store.delete(session.session_id).await.unwrap();

        assert!(store.get(session.session_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_on_missing_session_is_not_found() {
        let store = InMemorySessionStore::new();
        let mut session = sample_session();
        assert!(matches!(
            store.set(&mut session).await,
            Err(StoreError::NotFound)
        ));
    }
}
