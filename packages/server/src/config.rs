use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

use crate::domains::registration::machines::TtlPolicy;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub nats_url: String,
    pub dataverse_base_url: String,
    pub dataverse_access_token: String,
    /// TTL of a fresh approval-gated session, in hours
    pub approval_session_ttl_hours: i64,
    /// TTL of a fresh payment-gated session, in hours
    pub payment_session_ttl_hours: i64,
    /// Window granted when a session enters PENDING_APPROVAL, in hours
    pub approval_review_window_hours: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            nats_url: env::var("NATS_URL")
                .unwrap_or_else(|_| "nats://localhost:4222".to_string()),
            dataverse_base_url: env::var("DATAVERSE_BASE_URL")
                .context("DATAVERSE_BASE_URL must be set")?,
            dataverse_access_token: env::var("DATAVERSE_ACCESS_TOKEN")
                .context("DATAVERSE_ACCESS_TOKEN must be set")?,
            approval_session_ttl_hours: env_hours("APPROVAL_SESSION_TTL_HOURS", 24)?,
            payment_session_ttl_hours: env_hours("PAYMENT_SESSION_TTL_HOURS", 48)?,
            approval_review_window_hours: env_hours("APPROVAL_REVIEW_WINDOW_HOURS", 72)?,
        })
    }

    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy::new(
            self.approval_session_ttl_hours,
            self.payment_session_ttl_hours,
            self.approval_review_window_hours,
        )
    }
}

fn env_hours(name: &str, default: i64) -> Result<i64> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("{name} must be a valid number of hours")),
        Err(_) => Ok(default),
    }
}
