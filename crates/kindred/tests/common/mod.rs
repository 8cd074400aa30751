#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use kindred::{CredentialVerifier, KindredConfig, MatchService};
use kindred_common::{
    ActorId, Capability, CapabilityGrant, CapabilityId, Gender, GrantId, GrantStatus, Interaction,
    KindredError, KindredResult, ManualClock, NewProfile, Profile, ResolvedGrant,
};
use kindred_store::{ActorRecord, MemoryStore, Store, StoreResult, Transaction};
use std::sync::Arc;
use std::time::Duration;

pub fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
}

/// Reversible stand-in for Argon2 so tests stay fast
pub struct PlainVerifier;

impl CredentialVerifier for PlainVerifier {
    fn hash(&self, password: &str) -> KindredResult<String> {
        Ok(format!("plain:{password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> KindredResult<bool> {
        Ok(hash.strip_prefix("plain:") == Some(password))
    }
}

/// Verifier whose hashing always fails, as a broken hasher would
pub struct BrokenVerifier;

impl CredentialVerifier for BrokenVerifier {
    fn hash(&self, _: &str) -> KindredResult<String> {
        Err(KindredError::Internal("failed to hash password: out of memory".into()))
    }

    fn verify(&self, _: &str, _: &str) -> KindredResult<bool> {
        Err(KindredError::Internal("stored credential is malformed".into()))
    }
}

pub fn new_profile(email: &str) -> NewProfile {
    NewProfile {
        email: email.into(),
        name: "Robin".into(),
        bio: "likes long walks".into(),
        birth_date: NaiveDate::from_ymd_opt(1993, 9, 9).unwrap(),
        gender: Gender::Other,
    }
}

pub fn service_over(store: Arc<dyn Store>, clock: Arc<ManualClock>, config: &KindredConfig) -> MatchService {
    MatchService::new(store, clock, Arc::new(PlainVerifier), config)
}

pub fn memory_service(config: &KindredConfig) -> (MatchService, Arc<MemoryStore>, Arc<ManualClock>) {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(noon()));
    (service_over(store.clone(), clock.clone(), config), store, clock)
}

/// Wraps a [`MemoryStore`]; every commit sleeps for `delay` first
pub struct SlowCommitStore {
    pub inner: MemoryStore,
    pub delay: Duration,
}

struct SlowTx {
    inner: Box<dyn Transaction>,
    delay: Duration,
}

#[async_trait]
impl Store for SlowCommitStore {
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>> {
        Ok(Box::new(SlowTx {
            inner: self.inner.begin().await?,
            delay: self.delay,
        }))
    }
    async fn capabilities(&self) -> StoreResult<Vec<Capability>> {
        self.inner.capabilities().await
    }
    async fn capability(&self, id: CapabilityId) -> StoreResult<Option<Capability>> {
        self.inner.capability(id).await
    }
    async fn capability_by_name(&self, name: &str) -> StoreResult<Option<Capability>> {
        self.inner.capability_by_name(name).await
    }
    async fn grants_valid_at(&self, actor: ActorId, at: DateTime<Utc>) -> StoreResult<Vec<ResolvedGrant>> {
        self.inner.grants_valid_at(actor, at).await
    }
    async fn grant(&self, id: GrantId) -> StoreResult<Option<CapabilityGrant>> {
        self.inner.grant(id).await
    }
    async fn daily_usage(&self, actor: ActorId, day: NaiveDate) -> StoreResult<u32> {
        self.inner.daily_usage(actor, day).await
    }
    async fn count_interactions_on(&self, actor: ActorId, day: NaiveDate) -> StoreResult<u32> {
        self.inner.count_interactions_on(actor, day).await
    }
    async fn interaction(&self, from: ActorId, to: ActorId) -> StoreResult<Option<Interaction>> {
        self.inner.interaction(from, to).await
    }
    async fn actor_by_email(&self, email: &str) -> StoreResult<Option<ActorRecord>> {
        self.inner.actor_by_email(email).await
    }
    async fn profile(&self, id: ActorId) -> StoreResult<Option<Profile>> {
        self.inner.profile(id).await
    }
    async fn candidates(&self, actor: ActorId, limit: usize) -> StoreResult<Vec<Profile>> {
        self.inner.candidates(actor, limit).await
    }
}

#[async_trait]
impl Transaction for SlowTx {
    async fn capability(&mut self, id: CapabilityId) -> StoreResult<Option<Capability>> {
        self.inner.capability(id).await
    }
    async fn increment_usage(&mut self, actor: ActorId, day: NaiveDate, ceiling: Option<u32>) -> StoreResult<Option<u32>> {
        self.inner.increment_usage(actor, day, ceiling).await
    }
    async fn insert_interaction(&mut self, interaction: &Interaction) -> StoreResult<()> {
        self.inner.insert_interaction(interaction).await
    }
    async fn insert_grant(&mut self, grant: &CapabilityGrant) -> StoreResult<()> {
        self.inner.insert_grant(grant).await
    }
    async fn set_grant_status(&mut self, id: GrantId, status: GrantStatus) -> StoreResult<Option<CapabilityGrant>> {
        self.inner.set_grant_status(id, status).await
    }
    async fn insert_capability(&mut self, capability: &Capability) -> StoreResult<()> {
        self.inner.insert_capability(capability).await
    }
    async fn insert_actor(&mut self, record: &ActorRecord) -> StoreResult<()> {
        self.inner.insert_actor(record).await
    }
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let this = *self;
        tokio::time::sleep(this.delay).await;
        this.inner.commit().await
    }
    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        let this = *self;
        this.inner.rollback().await
    }
}
