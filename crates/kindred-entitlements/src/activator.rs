//! Subscription activation
//!
//! The catalog lookup and the insert share one transaction. Exclusivity is
//! decided by the store inside the insert, serialized per (actor, capability).

use kindred_common::{
    ActorId, CapabilityGrant, CapabilityId, Clock, GrantId, GrantStatus, KindredError, KindredResult,
    SubscriptionPeriod,
};
use kindred_store::{settle, Constraint, Store, StoreError};
use std::sync::Arc;
use uuid::Uuid;

/// Creates and revokes capability grants
pub struct SubscriptionActivator {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl SubscriptionActivator {
    /// Create an activator
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Grant `capability` to `actor` for `period`, starting now.
    ///
    /// Fails with `AlreadySubscribed` while an active grant of the same
    /// capability is still open at the new start.
    pub async fn activate(
        &self,
        actor: ActorId,
        capability: CapabilityId,
        period: SubscriptionPeriod,
        value: i64,
    ) -> KindredResult<CapabilityGrant> {
        let now = self.clock.now();
        let grant = CapabilityGrant {
            id: Uuid::new_v4(),
            actor_id: actor,
            capability_id: capability,
            value,
            starts_at: now,
            ends_at: Some(period.ends_at(now)?),
            status: GrantStatus::Active,
            created_at: now,
        };

        let conflict = |err: StoreError| match err.constraint() {
            Some(Constraint::ActiveGrant) => KindredError::AlreadySubscribed { actor, capability },
            _ => err.into(),
        };

        let mut tx = self.store.begin().await?;
        let outcome = async {
            if tx.capability(capability).await?.is_none() {
                return Err(KindredError::CapabilityNotFound(capability));
            }
            tx.insert_grant(&grant).await.map_err(conflict)
        }
        .await;
        match settle(tx, outcome.map(|()| grant), conflict).await {
            Ok(grant) => {
                tracing::info!(
                    actor = %actor,
                    capability = %capability,
                    grant = %grant.id,
                    period = %period,
                    "subscription activated"
                );
                Ok(grant)
            }
            Err(err) => {
                tracing::debug!(actor = %actor, capability = %capability, error = %err, "activation refused");
                Err(err)
            }
        }
    }

    /// Revoke a grant. It stops resolving and stops blocking new activations.
    pub async fn revoke(&self, id: GrantId) -> KindredResult<CapabilityGrant> {
        let mut tx = self.store.begin().await?;
        let outcome = match tx.set_grant_status(id, GrantStatus::Revoked).await {
            Ok(Some(grant)) => Ok(grant),
            Ok(None) => Err(KindredError::GrantNotFound(id)),
            Err(err) => Err(err.into()),
        };
        let grant = settle(tx, outcome, KindredError::from).await?;

        tracing::info!(actor = %grant.actor_id, capability = %grant.capability_id, grant = %id, "grant revoked");
        Ok(grant)
    }
}
