//! Server dependencies (using traits for testability)
//!
//! This module provides the central dependency container used by the
//! registration domain. All external services sit behind trait
//! abstractions so tests can swap them for mocks.

use anyhow::{Context, Result};
use async_trait::async_trait;
use dataverse::DataverseService;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::domains::registration::machines::TtlPolicy;
use crate::domains::registration::models::{EntityType, ParentKeys};
use crate::kernel::nats::NatsPublisher;
use crate::kernel::session_store::BaseSessionStore;
use crate::kernel::{BaseEntityClient, BasePricingService};

// =============================================================================
// Dataverse adapter (implements BaseEntityClient per entity set)
// =============================================================================

/// How one entity set binds to a parent created earlier in the sequence.
#[derive(Debug, Clone, Copy)]
pub struct ParentBinding {
    pub parent: EntityType,
    /// Single-valued navigation property on the child entity
    pub nav_property: &'static str,
    /// Entity set the navigation property points into
    pub target_set: &'static str,
}

/// `BaseEntityClient` over one Dataverse entity set. Foreign keys are bound
/// at creation time via `@odata.bind` — no follow-up patch calls.
pub struct DataverseEntityClient {
    service: Arc<DataverseService>,
    entity_set: &'static str,
    bindings: Vec<ParentBinding>,
}

impl DataverseEntityClient {
    pub fn new(
        service: Arc<DataverseService>,
        entity_set: &'static str,
        bindings: Vec<ParentBinding>,
    ) -> Self {
        Self {
            service,
            entity_set,
            bindings,
        }
    }
}

/// Attach `@odata.bind` properties for every configured parent binding.
fn bound_payload(payload: &Value, bindings: &[ParentBinding], parents: &ParentKeys) -> Result<Value> {
    let mut payload = payload.clone();
    let object = payload
        .as_object_mut()
        .context("entity payload must be a JSON object")?;

    for binding in bindings {
        let parent_id = parents.require(binding.parent)?;
        object.insert(
            format!("{}@odata.bind", binding.nav_property),
            Value::String(DataverseService::bind(binding.target_set, parent_id)),
        );
    }

    Ok(payload)
}

#[async_trait]
impl BaseEntityClient for DataverseEntityClient {
    async fn create(&self, payload: &Value, parents: &ParentKeys) -> Result<Uuid> {
        let payload = bound_payload(payload, &self.bindings, parents)?;
        let id = self.service.create(self.entity_set, payload).await?;
        Ok(id)
    }

    async fn delete(&self, external_id: Uuid) -> Result<()> {
        self.service.delete(self.entity_set, external_id).await?;
        Ok(())
    }
}

// =============================================================================
// Entity client registry
// =============================================================================

/// One creation client per entity domain, in the shape the sequencer needs.
#[derive(Clone)]
pub struct EntityClients {
    pub person: Arc<dyn BaseEntityClient>,
    pub address: Arc<dyn BaseEntityClient>,
    pub contact_channels: Arc<dyn BaseEntityClient>,
    pub identity: Arc<dyn BaseEntityClient>,
    pub education: Arc<dyn BaseEntityClient>,
    pub membership: Arc<dyn BaseEntityClient>,
}

impl EntityClients {
    pub fn for_entity(&self, entity: EntityType) -> &dyn BaseEntityClient {
        match entity {
            EntityType::Person => self.person.as_ref(),
            EntityType::Address => self.address.as_ref(),
            EntityType::ContactChannels => self.contact_channels.as_ref(),
            EntityType::Identity => self.identity.as_ref(),
            EntityType::Education => self.education.as_ref(),
            EntityType::Membership => self.membership.as_ref(),
        }
    }
}

/// The production wiring: entity sets and navigation properties of the
/// membership solution. `mbr_` is the solution's publisher prefix.
pub fn dataverse_entity_clients(service: Arc<DataverseService>) -> EntityClients {
    let person_binding = |nav: &'static str| ParentBinding {
        parent: EntityType::Person,
        nav_property: nav,
        target_set: "contacts",
    };

    EntityClients {
        person: Arc::new(DataverseEntityClient::new(service.clone(), "contacts", vec![])),
        address: Arc::new(DataverseEntityClient::new(
            service.clone(),
            "customeraddresses",
            vec![person_binding("parentid_contact")],
        )),
        contact_channels: Arc::new(DataverseEntityClient::new(
            service.clone(),
            "mbr_contactchannelsets",
            vec![person_binding("mbr_contact")],
        )),
        identity: Arc::new(DataverseEntityClient::new(
            service.clone(),
            "mbr_identityrecords",
            vec![person_binding("mbr_contact")],
        )),
        education: Arc::new(DataverseEntityClient::new(
            service.clone(),
            "mbr_educationrecords",
            vec![person_binding("mbr_contact")],
        )),
        membership: Arc::new(DataverseEntityClient::new(
            service,
            "mbr_memberships",
            vec![person_binding("mbr_member")],
        )),
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Server dependencies accessible to domain actions (using traits for
/// testability).
#[derive(Clone)]
pub struct ServerDeps {
    pub session_store: Arc<dyn BaseSessionStore>,
    pub entity_clients: Arc<EntityClients>,
    pub pricing: Arc<dyn BasePricingService>,
    pub nats: Arc<dyn NatsPublisher>,
    pub ttl: TtlPolicy,
}

impl ServerDeps {
    pub fn new(
        session_store: Arc<dyn BaseSessionStore>,
        entity_clients: Arc<EntityClients>,
        pricing: Arc<dyn BasePricingService>,
        nats: Arc<dyn NatsPublisher>,
        ttl: TtlPolicy,
    ) -> Self {
        Self {
            session_store,
            entity_clients,
            pricing,
            nats,
            ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bound_payload_attaches_odata_bindings() {
        let binding = ParentBinding {
            parent: EntityType::Person,
            nav_property: "parentid_contact",
            target_set: "contacts",
        };
        let person_id = Uuid::new_v4();
        let mut parents = ParentKeys::default();
        parents.insert(EntityType::Person, person_id);

        let payload = bound_payload(&json!({"line1": "1 Main St"}), &[binding], &parents).unwrap();

        assert_eq!(payload["line1"], "1 Main St");
        assert_eq!(
            payload["parentid_contact@odata.bind"],
            format!("/contacts({person_id})")
        );
    }

    #[test]
    fn bound_payload_fails_when_a_parent_id_is_missing() {
        let binding = ParentBinding {
            parent: EntityType::Person,
            nav_property: "parentid_contact",
            target_set: "contacts",
        };
        let err = bound_payload(&json!({}), &[binding], &ParentKeys::default()).unwrap_err();
        assert!(err.to_string().contains("person"));
    }

    #[test]
    fn registry_resolves_every_entity_type() {
        let service = Arc::new(
            DataverseService::new(dataverse::DataverseOptions {
                base_url: "https://org.api.crm.dynamics.com/api/data/v9.2".into(),
                access_token: "test-token".into(),
            })
            .unwrap(),
        );
        let clients = dataverse_entity_clients(service);

        for entity in [
            EntityType::Person,
            EntityType::Address,
            EntityType::ContactChannels,
            EntityType::Identity,
            EntityType::Education,
            EntityType::Membership,
        ] {
            // Resolution itself is the contract; calls would hit the network.
            let _ = clients.for_entity(entity);
        }
    }
}
