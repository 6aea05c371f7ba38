//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod nats;
pub mod session_store;
pub mod test_dependencies;
pub mod traits;

pub use deps::{
    dataverse_entity_clients, DataverseEntityClient, EntityClients, ParentBinding, ServerDeps,
};
pub use nats::{NatsClientPublisher, NatsPublisher, PublishedMessage, TestNats};
pub use session_store::{BaseSessionStore, PgSessionStore, StoreError, MIGRATOR};
pub use traits::{BaseEntityClient, BasePricingService};
