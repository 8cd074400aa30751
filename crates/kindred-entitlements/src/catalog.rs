//! Capability catalog

use kindred_common::{Capability, CapabilityId, Clock, KindredError, KindredResult};
use kindred_store::{settle, Constraint, Store, StoreError};
use std::sync::Arc;
use uuid::Uuid;

/// Read mostly view over the capability catalog
pub struct Catalog {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl Catalog {
    /// Create a catalog over `store`
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Every capability, ordered by name
    pub async fn list(&self) -> KindredResult<Vec<Capability>> {
        Ok(self.store.capabilities().await?)
    }

    /// Capability by id
    pub async fn get(&self, id: CapabilityId) -> KindredResult<Capability> {
        self.store
            .capability(id)
            .await?
            .ok_or(KindredError::CapabilityNotFound(id))
    }

    /// Capability by name, if registered
    pub async fn find(&self, name: &str) -> KindredResult<Option<Capability>> {
        Ok(self.store.capability_by_name(name).await?)
    }

    /// Add a capability to the catalog
    pub async fn register(&self, name: &str, description: &str) -> KindredResult<Capability> {
        let name = name.trim();
        if name.is_empty() {
            return Err(KindredError::InvalidInput("capability name is empty".into()));
        }

        let capability = Capability {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            created_at: self.clock.now(),
        };

        let conflict = |err: StoreError| match err.constraint() {
            Some(Constraint::CapabilityName) => KindredError::CapabilityNameTaken(name.to_string()),
            _ => err.into(),
        };

        let mut tx = self.store.begin().await?;
        let outcome = tx.insert_capability(&capability).await.map_err(conflict);
        let capability = settle(tx, outcome.map(|()| capability), conflict).await?;

        tracing::info!(capability = %capability.id, name = %capability.name, "capability registered");
        Ok(capability)
    }
}
