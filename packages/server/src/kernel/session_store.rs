//! Session store abstraction - durable keyed storage with per-key TTL.
//!
//! The registration orchestrator holds no session state between calls; this
//! adapter is the single source of truth. Expiry is lazy: a key past its
//! `expires_at` reads as absent, indistinguishable from a deleted one,
//! whatever the physical purge has or hasn't done yet. `get` never extends
//! a TTL — only explicit writes tied to state transitions do.
//!
//! There is deliberately no in-memory fallback when the store is down:
//! operations fail with a retryable `Unavailable` error instead of quietly
//! losing durability.

use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use thiserror::Error;

use crate::common::SessionId;
use crate::domains::registration::models::RegistrationSession;

/// Migrations for the session table (`migrations/` in this package).
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Storage-layer failures, mapped onto the caller-facing taxonomy by the
/// registration error module.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session key already exists")]
    DuplicateKey,

    #[error("session not found")]
    NotFound,

    /// Conditional write lost: someone else wrote the record since it was
    /// read at version `expected`.
    #[error("conditional write lost at expected version {expected}")]
    VersionConflict { expected: i64 },

    #[error("session store unavailable")]
    Unavailable(#[source] anyhow::Error),
}

/// Durable keyed storage for registration sessions.
#[async_trait]
pub trait BaseSessionStore: Send + Sync {
    /// Insert a new session. Fails with `DuplicateKey` if the id exists.
    async fn create(&self, session: &RegistrationSession) -> Result<(), StoreError>;

    /// Fetch a session. Expired keys read as `None`. Never extends TTL.
    async fn get(&self, session_id: SessionId) -> Result<Option<RegistrationSession>, StoreError>;

    /// Conditional full-record write: succeeds only when the stored version
    /// equals `session.version`, then bumps the version (both in storage and
    /// on the passed record).
    async fn set(&self, session: &mut RegistrationSession) -> Result<(), StoreError>;

    async fn delete(&self, session_id: SessionId) -> Result<(), StoreError>;

    /// The non-terminal, non-expired session for a natural key, if any.
    /// Backs the one-in-progress-registration-per-applicant policy.
    async fn find_active_by_natural_key(
        &self,
        natural_key: &str,
    ) -> Result<Option<RegistrationSession>, StoreError>;

    /// Reclaim storage for expired sessions. Housekeeping only - lazy
    /// expiry keeps reads correct whether or not this ever runs.
    async fn purge_expired(&self) -> Result<u64, StoreError>;
}

// =============================================================================
// Postgres implementation
// =============================================================================

/// Postgres-backed session store. The full session record is stored as
/// JSONB next to the columns the store itself needs (key, natural key,
/// version, expiry, terminal flag).
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_sqlx(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::DuplicateKey;
        }
    }
    StoreError::Unavailable(anyhow!(e))
}

#[async_trait]
impl BaseSessionStore for PgSessionStore {
    async fn create(&self, session: &RegistrationSession) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO registration_sessions
                 (id, natural_key, terminal, version, created_at, expires_at, record)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(session.session_id)
        .bind(&session.natural_key)
        .bind(session.is_terminal())
        .bind(session.version)
        .bind(session.created_at)
        .bind(session.expires_at)
        .bind(Json(session))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn get(&self, session_id: SessionId) -> Result<Option<RegistrationSession>, StoreError> {
        let record: Option<Json<RegistrationSession>> = sqlx::query_scalar(
            "SELECT record FROM registration_sessions
             WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(record.map(|Json(session)| session))
    }

    async fn set(&self, session: &mut RegistrationSession) -> Result<(), StoreError> {
        let expected = session.version;
        session.version = expected + 1;

        let result = sqlx::query(
            "UPDATE registration_sessions
             SET record = $1, version = $2, expires_at = $3, terminal = $4
             WHERE id = $5 AND version = $6 AND expires_at > now()",
        )
        .bind(Json(&*session))
        .bind(session.version)
        .bind(session.expires_at)
        .bind(session.is_terminal())
        .bind(session.session_id)
        .bind(expected)
        .execute(&self.pool)
        .await;

        let result = match result {
            Ok(r) => r,
            Err(e) => {
                session.version = expected;
                return Err(map_sqlx(e));
            }
        };

        if result.rows_affected() == 0 {
            session.version = expected;
            // Distinguish a lost race from a vanished (or expired) row.
            let live: Option<i64> = sqlx::query_scalar(
                "SELECT version FROM registration_sessions
                 WHERE id = $1 AND expires_at > now()",
            )
            .bind(session.session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

            return Err(match live {
                Some(_) => StoreError::VersionConflict { expected },
                None => StoreError::NotFound,
            });
        }

        Ok(())
    }

    async fn delete(&self, session_id: SessionId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM registration_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        Ok(())
    }

    async fn find_active_by_natural_key(
        &self,
        natural_key: &str,
    ) -> Result<Option<RegistrationSession>, StoreError> {
        let record: Option<Json<RegistrationSession>> = sqlx::query_scalar(
            "SELECT record FROM registration_sessions
             WHERE natural_key = $1 AND NOT terminal AND expires_at > now()
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(natural_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(record.map(|Json(session)| session))
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM registration_sessions WHERE expires_at <= now()")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        Ok(result.rows_affected())
    }
}
