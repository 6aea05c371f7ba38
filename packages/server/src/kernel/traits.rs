// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (like "validate a bundle") should be domain functions that
// use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseEntityClient)

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::domains::registration::models::{ParentKeys, PricingQuote, StagedBundle};

// =============================================================================
// Entity Creation Client Trait (Infrastructure - remote store writes)
// =============================================================================

/// One creation client per business-entity type, black-box against the
/// remote store.
///
/// Clients are NOT idempotent: calling `create` twice makes two records.
/// De-duplication is the sequencer's responsibility, not the client's.
#[async_trait]
pub trait BaseEntityClient: Send + Sync {
    /// Create a record from `payload`, binding foreign keys to the ids in
    /// `parents`. Returns the id the remote store generated.
    async fn create(&self, payload: &Value, parents: &ParentKeys) -> Result<Uuid>;

    /// Delete a previously created record. Compensation path.
    async fn delete(&self, external_id: Uuid) -> Result<()>;
}

// =============================================================================
// Pricing Service Trait (Infrastructure - catalog lives elsewhere)
// =============================================================================

#[async_trait]
pub trait BasePricingService: Send + Sync {
    /// Price a staged bundle. Product/price catalog logic lives behind this
    /// port.
    async fn quote(&self, bundle: &StagedBundle) -> Result<PricingQuote>;
}
