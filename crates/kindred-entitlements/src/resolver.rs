//! Entitlement resolution
//!
//! A [`CapabilitySet`] is resolved once per request and handed down by
//! reference. Nothing downstream re-queries grants.

use chrono::{DateTime, Utc};
use kindred_common::{ActorId, Clock, KindredResult, ResolvedGrant};
use kindred_store::Store;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable snapshot of the capabilities an actor holds at one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilitySet {
    resolved_at: DateTime<Utc>,
    grants: HashMap<String, ResolvedGrant>,
}

impl CapabilitySet {
    /// No capabilities
    pub fn empty(resolved_at: DateTime<Utc>) -> Self {
        Self {
            resolved_at,
            grants: HashMap::new(),
        }
    }

    /// Build from grants ordered newest first; the newest grant per name wins
    pub fn from_grants(resolved_at: DateTime<Utc>, grants: impl IntoIterator<Item = ResolvedGrant>) -> Self {
        let mut by_name = HashMap::new();
        for grant in grants {
            by_name.entry(grant.capability_name.clone()).or_insert(grant);
        }
        Self {
            resolved_at,
            grants: by_name,
        }
    }

    /// Whether `name` is held
    pub fn has(&self, name: &str) -> bool {
        self.grants.contains_key(name)
    }

    /// Grant backing `name`
    pub fn get(&self, name: &str) -> Option<&ResolvedGrant> {
        self.grants.get(name)
    }

    /// All held capabilities, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResolvedGrant)> {
        self.grants.iter().map(|(name, grant)| (name.as_str(), grant))
    }

    /// Instant the snapshot describes
    pub fn resolved_at(&self) -> DateTime<Utc> {
        self.resolved_at
    }

    /// Number of held capabilities
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    /// Whether nothing is held
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

/// Resolves an actor's grants into a [`CapabilitySet`]
pub struct EntitlementResolver {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl EntitlementResolver {
    /// Create a resolver
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Capabilities of `actor` in force at `at`
    pub async fn resolve(&self, actor: ActorId, at: DateTime<Utc>) -> KindredResult<CapabilitySet> {
        let grants = self.store.grants_valid_at(actor, at).await?;
        let set = CapabilitySet::from_grants(at, grants);
        tracing::debug!(actor = %actor, capabilities = set.len(), "entitlements resolved");
        Ok(set)
    }

    /// Capabilities of `actor` in force now
    pub async fn resolve_now(&self, actor: ActorId) -> KindredResult<CapabilitySet> {
        self.resolve(actor, self.clock.now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use kindred_common::{Capability, CapabilityGrant, GrantStatus, ManualClock};
    use kindred_store::MemoryStore;
    use uuid::Uuid;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    async fn seeded() -> (Arc<MemoryStore>, ActorId, Capability) {
        let store = Arc::new(MemoryStore::new());
        let actor = Uuid::new_v4();
        let capability = Capability {
            id: Uuid::new_v4(),
            name: "daily_responses".into(),
            description: "Unlimited daily responses".into(),
            created_at: start(),
        };
        let grant = CapabilityGrant {
            id: Uuid::new_v4(),
            actor_id: actor,
            capability_id: capability.id,
            value: 1,
            starts_at: start(),
            ends_at: Some(start() + Duration::days(30)),
            status: GrantStatus::Active,
            created_at: start(),
        };

        let mut tx = store.begin().await.unwrap();
        tx.insert_capability(&capability).await.unwrap();
        tx.insert_grant(&grant).await.unwrap();
        tx.commit().await.unwrap();
        (store, actor, capability)
    }

    #[tokio::test]
    async fn test_resolve_respects_validity_window() {
        let (store, actor, _) = seeded().await;
        let clock = Arc::new(ManualClock::new(start()));
        let resolver = EntitlementResolver::new(store, clock.clone());

        assert!(!resolver.resolve(actor, start() - Duration::seconds(1)).await.unwrap().has("daily_responses"));

        let set = resolver.resolve_now(actor).await.unwrap();
        assert!(set.has("daily_responses"));
        assert_eq!(set.resolved_at(), start());
        assert_eq!(set.len(), 1);

        clock.advance(Duration::days(30));
        assert!(resolver.resolve_now(actor).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_actor_resolves_empty() {
        let (store, _, _) = seeded().await;
        let resolver = EntitlementResolver::new(store, Arc::new(ManualClock::new(start())));
        let set = resolver.resolve_now(Uuid::new_v4()).await.unwrap();
        assert!(set.is_empty());
        assert_eq!(set.iter().count(), 0);
    }
}
