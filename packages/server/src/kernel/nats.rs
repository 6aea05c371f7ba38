//! NATS client abstraction for production and testing.
//!
//! Provides a trait-based NATS implementation that allows swapping between
//! real NATS connections and test mocks.

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::RwLock;

/// A published message.
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub subject: String,
    pub payload: Bytes,
}

/// Trait for NATS publish operations.
///
/// This allows swapping between real NATS and test mocks.
#[async_trait]
pub trait NatsPublisher: Send + Sync {
    /// Publish a message to a subject.
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()>;
}

/// Real NATS client publisher.
pub struct NatsClientPublisher {
    client: async_nats::Client,
}

impl NatsClientPublisher {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NatsPublisher for NatsClientPublisher {
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()> {
        self.client.publish(subject, payload).await?;
        Ok(())
    }
}

/// Connect to NATS at `url`.
pub async fn connect(url: &str) -> Result<async_nats::Client> {
    let client = async_nats::connect(url).await?;
    Ok(client)
}

/// Mock NATS client that tracks published messages for testing.
///
/// This allows tests to inspect what messages would have been published
/// to NATS without requiring a real connection.
#[derive(Default)]
pub struct TestNats {
    /// Messages published to subjects.
    published: RwLock<Vec<PublishedMessage>>,
}

impl TestNats {
    /// Create a new test NATS client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all published messages.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Get published messages for a specific subject.
    pub fn messages_for_subject(&self, subject: &str) -> Vec<PublishedMessage> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|m| m.subject == subject)
            .cloned()
            .collect()
    }

    /// Check if any message was published to a subject.
    pub fn was_published_to(&self, subject: &str) -> bool {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|m| m.subject == subject)
    }

    /// Get the count of published messages.
    pub fn publish_count(&self) -> usize {
        self.published.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Decode every published payload on a subject as JSON.
    pub fn json_payloads_for(&self, subject: &str) -> Vec<serde_json::Value> {
        self.messages_for_subject(subject)
            .iter()
            .filter_map(|m| serde_json::from_slice(&m.payload).ok())
            .collect()
    }
}

#[async_trait]
impl NatsPublisher for TestNats {
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()> {
        self.published
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(PublishedMessage { subject, payload });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_nats_records_publishes() {
        let nats = TestNats::new();
        nats.publish("a.b.c".to_string(), Bytes::from_static(b"{}"))
            .await
            .unwrap();

        assert_eq!(nats.publish_count(), 1);
        assert!(nats.was_published_to("a.b.c"));
        assert!(!nats.was_published_to("a.b.d"));
    }
}
