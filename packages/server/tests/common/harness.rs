//! Test harness wiring `ServerDeps` from the kernel's mock implementations.
//!
//! Everything runs in-process: the in-memory session store, mock entity
//! clients sharing one call journal, a mock pricing service and the
//! recording NATS publisher. No containers, no network.

use std::sync::Arc;

use server_core::domains::registration::machines::TtlPolicy;
use server_core::domains::registration::models::EntityType;
use server_core::kernel::test_dependencies::{
    new_call_journal, CallJournal, InMemorySessionStore, MockEntityClient, MockPricingService,
};
use server_core::kernel::{EntityClients, ServerDeps, TestNats};

pub struct TestHarness {
    pub deps: ServerDeps,
    pub store: Arc<InMemorySessionStore>,
    pub nats: Arc<TestNats>,
    pub journal: CallJournal,
    pub person_client: Arc<MockEntityClient>,
    pub address_client: Arc<MockEntityClient>,
    pub channels_client: Arc<MockEntityClient>,
    pub identity_client: Arc<MockEntityClient>,
    pub education_client: Arc<MockEntityClient>,
    pub membership_client: Arc<MockEntityClient>,
}

impl TestHarness {
    /// All entity clients succeed.
    pub fn new() -> Self {
        Self::build(|_, client| client)
    }

    /// Like `new`, but the named entity's client fails every create call.
    pub fn with_failing_create(entity: EntityType, message: &'static str) -> Self {
        Self::build(move |e, client| {
            if e == entity {
                client.failing_create(message)
            } else {
                client
            }
        })
    }

    /// Build with a per-entity customization hook.
    pub fn build(customize: impl Fn(EntityType, MockEntityClient) -> MockEntityClient) -> Self {
        let journal = new_call_journal();
        let make = |entity: EntityType, label: &'static str| {
            Arc::new(customize(
                entity,
                MockEntityClient::new(label).with_journal(journal.clone()),
            ))
        };

        let person_client = make(EntityType::Person, "person");
        let address_client = make(EntityType::Address, "address");
        let channels_client = make(EntityType::ContactChannels, "contact_channels");
        let identity_client = make(EntityType::Identity, "identity");
        let education_client = make(EntityType::Education, "education");
        let membership_client = make(EntityType::Membership, "membership");

        let entity_clients = EntityClients {
            person: person_client.clone(),
            address: address_client.clone(),
            contact_channels: channels_client.clone(),
            identity: identity_client.clone(),
            education: education_client.clone(),
            membership: membership_client.clone(),
        };

        let store = Arc::new(InMemorySessionStore::new());
        let nats = Arc::new(TestNats::new());
        let deps = ServerDeps::new(
            store.clone(),
            Arc::new(entity_clients),
            Arc::new(MockPricingService::new()),
            nats.clone(),
            TtlPolicy::default(),
        );

        Self {
            deps,
            store,
            nats,
            journal,
            person_client,
            address_client,
            channels_client,
            identity_client,
            education_client,
            membership_client,
        }
    }

    /// The shared create/delete call journal, e.g.
    /// `["create:person", "create:address", "delete:person"]`.
    pub fn journal_entries(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
