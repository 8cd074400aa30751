//! In-memory store
//!
//! Committed state lives in one `RwLock`-guarded set of tables. A transaction
//! stages its writes and takes per-key async locks for the keys it must
//! serialize on ((actor, day) counters, (actor, capability) grants). Locks are
//! held until commit or rollback; commit re-validates uniqueness and applies
//! every staged write under a single write lock, so readers see all or nothing.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use kindred_common::{
    usage_day, ActorId, Capability, CapabilityGrant, CapabilityId, GrantId, GrantStatus,
    Interaction, Profile, ResolvedGrant,
};
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{Constraint, StoreError, StoreResult};
use crate::ports::{ActorRecord, Store, Transaction};

/// Serialization key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum LockKey {
    Usage(ActorId, NaiveDate),
    Subscription(ActorId, CapabilityId),
}

#[derive(Default)]
struct KeyLocks {
    locks: DashMap<LockKey, Arc<Mutex<()>>>,
}

async fn acquire(locks: &Arc<KeyLocks>, key: LockKey) -> KeyGuard {
    let lock = locks.locks.entry(key).or_default().clone();
    let guard = lock.lock_owned().await;
    KeyGuard {
        key,
        guard: Some(guard),
        locks: Arc::clone(locks),
    }
}

struct KeyGuard {
    key: LockKey,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<KeyLocks>,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map itself still references an idle lock.
        self.locks
            .locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[derive(Default)]
struct Tables {
    actors: HashMap<ActorId, ActorRecord>,
    emails: HashMap<String, ActorId>,
    capabilities: HashMap<CapabilityId, Capability>,
    grants: HashMap<GrantId, CapabilityGrant>,
    interactions: HashMap<(ActorId, ActorId), Interaction>,
    daily_usage: HashMap<(ActorId, NaiveDate), u32>,
}

/// Last status staged for grant `id`, if any
fn status_override(staged: &[Write], id: GrantId) -> Option<GrantStatus> {
    staged.iter().rev().find_map(|w| match w {
        Write::GrantStatus { id: staged_id, status } if *staged_id == id => Some(*status),
        _ => None,
    })
}

impl Tables {
    /// Whether `candidate` collides with a committed or earlier staged grant,
    /// with earlier staged status changes applied.
    fn grant_blocks(&self, candidate: &CapabilityGrant, earlier: &[Write]) -> bool {
        let staged = earlier.iter().filter_map(|w| match w {
            Write::Grant(g) => Some(g),
            _ => None,
        });
        self.grants.values().chain(staged).any(|g| {
            if g.id == candidate.id
                || g.actor_id != candidate.actor_id
                || g.capability_id != candidate.capability_id
            {
                return false;
            }
            match status_override(earlier, g.id) {
                Some(status) => CapabilityGrant { status, ..g.clone() }.blocks_start_at(candidate.starts_at),
                None => g.blocks_start_at(candidate.starts_at),
            }
        })
    }

    /// Validate `write` against committed state plus the writes staged before it
    fn check(&self, write: &Write, earlier: &[Write]) -> StoreResult<()> {
        match write {
            Write::Interaction(i) => {
                let pair = (i.from_actor_id, i.to_actor_id);
                let staged = earlier
                    .iter()
                    .any(|w| matches!(w, Write::Interaction(e) if (e.from_actor_id, e.to_actor_id) == pair));
                if staged || self.interactions.contains_key(&pair) {
                    return Err(StoreError::UniqueViolation(Constraint::InteractionPair));
                }
            }
            Write::Grant(g) if self.grant_blocks(g, earlier) => {
                return Err(StoreError::UniqueViolation(Constraint::ActiveGrant));
            }
            Write::Capability(c) => {
                let staged = earlier
                    .iter()
                    .any(|w| matches!(w, Write::Capability(e) if e.name == c.name));
                if staged || self.capabilities.values().any(|e| e.name == c.name) {
                    return Err(StoreError::UniqueViolation(Constraint::CapabilityName));
                }
            }
            Write::Actor(a) => {
                let email = &a.profile.email;
                let staged = earlier
                    .iter()
                    .any(|w| matches!(w, Write::Actor(e) if &e.profile.email == email));
                if staged || self.emails.contains_key(email) {
                    return Err(StoreError::UniqueViolation(Constraint::ActorEmail));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn apply(&mut self, write: Write) {
        match write {
            Write::Usage { actor, day } => {
                *self.daily_usage.entry((actor, day)).or_insert(0) += 1;
            }
            Write::Interaction(i) => {
                self.interactions.insert((i.from_actor_id, i.to_actor_id), i);
            }
            Write::Grant(g) => {
                self.grants.insert(g.id, g);
            }
            Write::GrantStatus { id, status } => {
                if let Some(g) = self.grants.get_mut(&id) {
                    g.status = status;
                }
            }
            Write::Capability(c) => {
                self.capabilities.insert(c.id, c);
            }
            Write::Actor(a) => {
                self.emails.insert(a.profile.email.clone(), a.profile.id);
                self.actors.insert(a.profile.id, a);
            }
        }
    }
}

enum Write {
    Usage { actor: ActorId, day: NaiveDate },
    Interaction(Interaction),
    Grant(CapabilityGrant),
    GrantStatus { id: GrantId, status: GrantStatus },
    Capability(Capability),
    Actor(ActorRecord),
}

/// In-memory store
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    locks: Arc<KeyLocks>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>> {
        Ok(Box::new(MemoryTransaction {
            tables: Arc::clone(&self.tables),
            locks: Arc::clone(&self.locks),
            held: HashMap::new(),
            staged: Vec::new(),
        }))
    }

    async fn capabilities(&self) -> StoreResult<Vec<Capability>> {
        let mut caps: Vec<_> = self.tables.read().capabilities.values().cloned().collect();
        caps.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(caps)
    }

    async fn capability(&self, id: CapabilityId) -> StoreResult<Option<Capability>> {
        Ok(self.tables.read().capabilities.get(&id).cloned())
    }

    async fn capability_by_name(&self, name: &str) -> StoreResult<Option<Capability>> {
        Ok(self
            .tables
            .read()
            .capabilities
            .values()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn grants_valid_at(&self, actor: ActorId, at: DateTime<Utc>) -> StoreResult<Vec<ResolvedGrant>> {
        let tables = self.tables.read();
        let mut grants: Vec<_> = tables
            .grants
            .values()
            .filter(|g| g.actor_id == actor && g.is_valid_at(at))
            .filter_map(|g| {
                tables.capabilities.get(&g.capability_id).map(|c| ResolvedGrant {
                    grant: g.clone(),
                    capability_name: c.name.clone(),
                    capability_description: c.description.clone(),
                })
            })
            .collect();
        grants.sort_by(|a, b| b.grant.created_at.cmp(&a.grant.created_at));
        Ok(grants)
    }

    async fn grant(&self, id: GrantId) -> StoreResult<Option<CapabilityGrant>> {
        Ok(self.tables.read().grants.get(&id).cloned())
    }

    async fn daily_usage(&self, actor: ActorId, day: NaiveDate) -> StoreResult<u32> {
        Ok(self
            .tables
            .read()
            .daily_usage
            .get(&(actor, day))
            .copied()
            .unwrap_or(0))
    }

    async fn count_interactions_on(&self, actor: ActorId, day: NaiveDate) -> StoreResult<u32> {
        let count = self
            .tables
            .read()
            .interactions
            .values()
            .filter(|i| i.from_actor_id == actor && usage_day(i.created_at) == day)
            .count();
        Ok(count as u32)
    }

    async fn interaction(&self, from: ActorId, to: ActorId) -> StoreResult<Option<Interaction>> {
        Ok(self.tables.read().interactions.get(&(from, to)).cloned())
    }

    async fn actor_by_email(&self, email: &str) -> StoreResult<Option<ActorRecord>> {
        let tables = self.tables.read();
        Ok(tables
            .emails
            .get(email)
            .and_then(|id| tables.actors.get(id))
            .cloned())
    }

    async fn profile(&self, id: ActorId) -> StoreResult<Option<Profile>> {
        Ok(self.tables.read().actors.get(&id).map(|a| a.profile.clone()))
    }

    async fn candidates(&self, actor: ActorId, limit: usize) -> StoreResult<Vec<Profile>> {
        let mut profiles: Vec<Profile> = {
            let tables = self.tables.read();
            tables
                .actors
                .values()
                .filter(|a| a.profile.id != actor && !tables.interactions.contains_key(&(actor, a.profile.id)))
                .map(|a| a.profile.clone())
                .collect()
        };
        profiles.shuffle(&mut rand::thread_rng());
        profiles.truncate(limit);
        Ok(profiles)
    }
}

/// Transaction over [`MemoryStore`]
pub struct MemoryTransaction {
    tables: Arc<RwLock<Tables>>,
    locks: Arc<KeyLocks>,
    held: HashMap<LockKey, KeyGuard>,
    staged: Vec<Write>,
}

impl MemoryTransaction {
    async fn lock(&mut self, key: LockKey) {
        if !self.held.contains_key(&key) {
            let guard = acquire(&self.locks, key).await;
            self.held.insert(key, guard);
        }
    }

    fn staged_usage(&self, actor: ActorId, day: NaiveDate) -> u32 {
        self.staged
            .iter()
            .filter(|w| matches!(w, Write::Usage { actor: a, day: d } if *a == actor && *d == day))
            .count() as u32
    }

    fn staged_status(&self, id: GrantId) -> Option<GrantStatus> {
        status_override(&self.staged, id)
    }

    fn find_grant(&self, id: GrantId) -> Option<CapabilityGrant> {
        let staged = self.staged.iter().rev().find_map(|w| match w {
            Write::Grant(g) if g.id == id => Some(g.clone()),
            _ => None,
        });
        let mut grant = staged.or_else(|| self.tables.read().grants.get(&id).cloned())?;
        if let Some(status) = self.staged_status(id) {
            grant.status = status;
        }
        Some(grant)
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn capability(&mut self, id: CapabilityId) -> StoreResult<Option<Capability>> {
        let staged = self.staged.iter().rev().find_map(|w| match w {
            Write::Capability(c) if c.id == id => Some(c.clone()),
            _ => None,
        });
        Ok(staged.or_else(|| self.tables.read().capabilities.get(&id).cloned()))
    }

    async fn increment_usage(
        &mut self,
        actor: ActorId,
        day: NaiveDate,
        ceiling: Option<u32>,
    ) -> StoreResult<Option<u32>> {
        self.lock(LockKey::Usage(actor, day)).await;

        let committed = self
            .tables
            .read()
            .daily_usage
            .get(&(actor, day))
            .copied()
            .unwrap_or(0);
        let current = committed + self.staged_usage(actor, day);

        if ceiling.is_some_and(|c| current >= c) {
            return Ok(None);
        }

        self.staged.push(Write::Usage { actor, day });
        Ok(Some(current + 1))
    }

    async fn insert_interaction(&mut self, interaction: &Interaction) -> StoreResult<()> {
        let pair = (interaction.from_actor_id, interaction.to_actor_id);
        let staged_dup = self.staged.iter().any(
            |w| matches!(w, Write::Interaction(i) if (i.from_actor_id, i.to_actor_id) == pair),
        );
        if staged_dup || self.tables.read().interactions.contains_key(&pair) {
            return Err(StoreError::UniqueViolation(Constraint::InteractionPair));
        }

        self.staged.push(Write::Interaction(interaction.clone()));
        Ok(())
    }

    async fn insert_grant(&mut self, grant: &CapabilityGrant) -> StoreResult<()> {
        self.lock(LockKey::Subscription(grant.actor_id, grant.capability_id)).await;

        let committed: Vec<CapabilityGrant> = self
            .tables
            .read()
            .grants
            .values()
            .filter(|g| g.actor_id == grant.actor_id && g.capability_id == grant.capability_id)
            .cloned()
            .collect();
        let staged = self.staged.iter().filter_map(|w| match w {
            Write::Grant(g) if g.actor_id == grant.actor_id && g.capability_id == grant.capability_id => {
                Some(g.clone())
            }
            _ => None,
        });

        let blocked = committed.into_iter().chain(staged).any(|mut existing| {
            if let Some(status) = self.staged_status(existing.id) {
                existing.status = status;
            }
            existing.blocks_start_at(grant.starts_at)
        });
        if blocked {
            return Err(StoreError::UniqueViolation(Constraint::ActiveGrant));
        }

        self.staged.push(Write::Grant(grant.clone()));
        Ok(())
    }

    async fn set_grant_status(
        &mut self,
        id: GrantId,
        status: GrantStatus,
    ) -> StoreResult<Option<CapabilityGrant>> {
        let Some(grant) = self.find_grant(id) else {
            return Ok(None);
        };
        self.lock(LockKey::Subscription(grant.actor_id, grant.capability_id)).await;

        self.staged.push(Write::GrantStatus { id, status });
        Ok(Some(CapabilityGrant { status, ..grant }))
    }

    async fn insert_capability(&mut self, capability: &Capability) -> StoreResult<()> {
        let staged_dup = self
            .staged
            .iter()
            .any(|w| matches!(w, Write::Capability(c) if c.name == capability.name));
        let committed_dup = self
            .tables
            .read()
            .capabilities
            .values()
            .any(|c| c.name == capability.name);
        if staged_dup || committed_dup {
            return Err(StoreError::UniqueViolation(Constraint::CapabilityName));
        }

        self.staged.push(Write::Capability(capability.clone()));
        Ok(())
    }

    async fn insert_actor(&mut self, record: &ActorRecord) -> StoreResult<()> {
        let email = &record.profile.email;
        let staged_dup = self
            .staged
            .iter()
            .any(|w| matches!(w, Write::Actor(a) if &a.profile.email == email));
        if staged_dup || self.tables.read().emails.contains_key(email) {
            return Err(StoreError::UniqueViolation(Constraint::ActorEmail));
        }

        self.staged.push(Write::Actor(record.clone()));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTransaction {
            tables, held, staged, ..
        } = *self;

        {
            let mut tables = tables.write();
            for (i, write) in staged.iter().enumerate() {
                tables.check(write, &staged[..i])?;
            }
            for write in staged {
                tables.apply(write);
            }
        }

        drop(held);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use kindred_common::{Gender, InteractionKind};
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
    }

    fn interaction(from: ActorId, to: ActorId) -> Interaction {
        Interaction {
            id: Uuid::new_v4(),
            from_actor_id: from,
            to_actor_id: to,
            kind: InteractionKind::Accept,
            created_at: now(),
        }
    }

    fn grant(actor: ActorId, capability: CapabilityId, starts_at: DateTime<Utc>) -> CapabilityGrant {
        CapabilityGrant {
            id: Uuid::new_v4(),
            actor_id: actor,
            capability_id: capability,
            value: 1,
            starts_at,
            ends_at: Some(starts_at + Duration::days(30)),
            status: GrantStatus::Active,
            created_at: starts_at,
        }
    }

    fn actor(email: &str) -> ActorRecord {
        ActorRecord {
            profile: Profile {
                id: Uuid::new_v4(),
                email: email.into(),
                name: "Test".into(),
                bio: String::new(),
                birth_date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
                gender: Gender::Other,
                created_at: now(),
                updated_at: now(),
            },
            credential_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn test_dropped_transaction_leaves_no_trace() {
        let store = MemoryStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let day = usage_day(now());

        let mut tx = store.begin().await.unwrap();
        tx.increment_usage(a, day, Some(10)).await.unwrap();
        tx.insert_interaction(&interaction(a, b)).await.unwrap();
        drop(tx);

        assert_eq!(store.daily_usage(a, day).await.unwrap(), 0);
        assert!(store.interaction(a, b).await.unwrap().is_none());
        assert!(store.locks.locks.is_empty());
    }

    #[tokio::test]
    async fn test_commit_applies_counter_and_row_together() {
        let store = MemoryStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let day = usage_day(now());

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.increment_usage(a, day, Some(10)).await.unwrap(), Some(1));
        tx.insert_interaction(&interaction(a, b)).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.daily_usage(a, day).await.unwrap(), 1);
        assert_eq!(store.count_interactions_on(a, day).await.unwrap(), 1);
        assert!(store.locks.locks.is_empty());
    }

    #[tokio::test]
    async fn test_increment_respects_ceiling() {
        let store = MemoryStore::new();
        let a = Uuid::new_v4();
        let day = usage_day(now());

        for expected in 1..=2 {
            let mut tx = store.begin().await.unwrap();
            assert_eq!(tx.increment_usage(a, day, Some(2)).await.unwrap(), Some(expected));
            tx.commit().await.unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.increment_usage(a, day, Some(2)).await.unwrap(), None);
        assert_eq!(tx.increment_usage(a, day, None).await.unwrap(), Some(3));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_never_exceed_ceiling() {
        let store = MemoryStore::new();
        let a = Uuid::new_v4();
        let day = usage_day(now());

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut tx = store.begin().await.unwrap();
                let granted = tx.increment_usage(a, day, Some(10)).await.unwrap();
                tokio::task::yield_now().await;
                tx.commit().await.unwrap();
                granted.is_some()
            }));
        }

        let mut granted = 0;
        for h in handles {
            if h.await.unwrap() {
                granted += 1;
            }
        }
        assert_eq!(granted, 10);
        assert_eq!(store.daily_usage(a, day).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_pair_uniqueness_is_directional() {
        let store = MemoryStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let mut tx = store.begin().await.unwrap();
        tx.insert_interaction(&interaction(a, b)).await.unwrap();
        assert_eq!(
            tx.insert_interaction(&interaction(a, b)).await,
            Err(StoreError::UniqueViolation(Constraint::InteractionPair))
        );
        tx.insert_interaction(&interaction(b, a)).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(
            tx.insert_interaction(&interaction(a, b)).await,
            Err(StoreError::UniqueViolation(Constraint::InteractionPair))
        );
    }

    #[tokio::test]
    async fn test_commit_rechecks_pairs_staged_by_racing_transactions() {
        let store = MemoryStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first.insert_interaction(&interaction(a, b)).await.unwrap();
        second.insert_interaction(&interaction(a, b)).await.unwrap();

        first.commit().await.unwrap();
        assert_eq!(
            second.commit().await,
            Err(StoreError::UniqueViolation(Constraint::InteractionPair))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_grants_single_winner() {
        let store = MemoryStore::new();
        let (a, cap) = (Uuid::new_v4(), Uuid::new_v4());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut tx = store.begin().await.unwrap();
                match tx.insert_grant(&grant(a, cap, now())).await {
                    Ok(()) => tx.commit().await.is_ok(),
                    Err(_) => false,
                }
            }));
        }

        let mut winners = 0;
        for h in handles {
            if h.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_revoked_grant_unblocks_new_grant() {
        let store = MemoryStore::new();
        let (a, cap) = (Uuid::new_v4(), Uuid::new_v4());
        let first = grant(a, cap, now());

        let mut tx = store.begin().await.unwrap();
        tx.insert_grant(&first).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let revoked = tx.set_grant_status(first.id, GrantStatus::Revoked).await.unwrap().unwrap();
        assert_eq!(revoked.status, GrantStatus::Revoked);
        let second = grant(a, cap, now());
        tx.insert_grant(&second).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.grant(first.id).await.unwrap().unwrap().status, GrantStatus::Revoked);
        assert_eq!(store.grant(second.id).await.unwrap().unwrap().status, GrantStatus::Active);
    }

    #[tokio::test]
    async fn test_grant_staged_and_revoked_in_one_transaction() {
        let store = MemoryStore::new();
        let (a, cap) = (Uuid::new_v4(), Uuid::new_v4());
        let first = grant(a, cap, now());
        let second = grant(a, cap, now());

        let mut tx = store.begin().await.unwrap();
        tx.insert_grant(&first).await.unwrap();
        assert_eq!(
            tx.insert_grant(&second).await,
            Err(StoreError::UniqueViolation(Constraint::ActiveGrant))
        );
        tx.set_grant_status(first.id, GrantStatus::Revoked).await.unwrap();
        tx.insert_grant(&second).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.grant(first.id).await.unwrap().unwrap().status, GrantStatus::Revoked);
        assert_eq!(store.grant(second.id).await.unwrap().unwrap().status, GrantStatus::Active);
    }

    #[tokio::test]
    async fn test_email_uniqueness() {
        let store = MemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.insert_actor(&actor("ana@example.com")).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(
            tx.insert_actor(&actor("ana@example.com")).await,
            Err(StoreError::UniqueViolation(Constraint::ActorEmail))
        );
        assert!(store.actor_by_email("ana@example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_candidates_exclude_self_and_responded() {
        let store = MemoryStore::new();
        let me = actor("me@example.com");
        let seen = actor("seen@example.com");
        let fresh = actor("fresh@example.com");

        let mut tx = store.begin().await.unwrap();
        for a in [&me, &seen, &fresh] {
            tx.insert_actor(a).await.unwrap();
        }
        tx.insert_interaction(&interaction(me.profile.id, seen.profile.id)).await.unwrap();
        tx.commit().await.unwrap();

        let candidates = store.candidates(me.profile.id, 10).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, fresh.profile.id);
    }
}
