//! Store ports
//!
//! Hexagonal architecture: the ledger, resolver and activator depend on these
//! traits only; backends implement them.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use kindred_common::{
    ActorId, Capability, CapabilityGrant, CapabilityId, GrantId, GrantStatus, Interaction, Profile,
    ResolvedGrant,
};

use crate::error::StoreResult;

/// Stored actor: public profile plus the opaque credential hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorRecord {
    /// Public profile
    pub profile: Profile,
    /// Hash produced by the credential verifier
    pub credential_hash: String,
}

/// Transactional store
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a transaction. Dropping it without commit discards every staged write.
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>>;

    /// Catalog, ordered by name
    async fn capabilities(&self) -> StoreResult<Vec<Capability>>;

    /// Catalog entry by id
    async fn capability(&self, id: CapabilityId) -> StoreResult<Option<Capability>>;

    /// Catalog entry by unique name
    async fn capability_by_name(&self, name: &str) -> StoreResult<Option<Capability>>;

    /// Grants of `actor` in force at `at`, joined with the catalog, newest first
    async fn grants_valid_at(&self, actor: ActorId, at: DateTime<Utc>) -> StoreResult<Vec<ResolvedGrant>>;

    /// Grant by id, whatever its status
    async fn grant(&self, id: GrantId) -> StoreResult<Option<CapabilityGrant>>;

    /// Materialized interaction counter for (actor, day)
    async fn daily_usage(&self, actor: ActorId, day: NaiveDate) -> StoreResult<u32>;

    /// Interaction rows authored by `actor` on `day`, counted from the rows themselves
    async fn count_interactions_on(&self, actor: ActorId, day: NaiveDate) -> StoreResult<u32>;

    /// Interaction for the ordered pair, if any
    async fn interaction(&self, from: ActorId, to: ActorId) -> StoreResult<Option<Interaction>>;

    /// Actor by login email
    async fn actor_by_email(&self, email: &str) -> StoreResult<Option<ActorRecord>>;

    /// Public profile by id
    async fn profile(&self, id: ActorId) -> StoreResult<Option<Profile>>;

    /// Up to `limit` random profiles other than `actor` that `actor` has not responded to
    async fn candidates(&self, actor: ActorId, limit: usize) -> StoreResult<Vec<Profile>>;
}

/// Unit of work. Writes become visible to other readers only on commit.
#[async_trait]
pub trait Transaction: Send {
    /// Catalog entry by id, as seen by this transaction
    async fn capability(&mut self, id: CapabilityId) -> StoreResult<Option<Capability>>;

    /// Conditionally bump the (actor, day) counter.
    ///
    /// Serialized per key for the lifetime of the transaction. Returns the new
    /// count, or `None` without writing when the counter already sits at
    /// `ceiling`. `None` ceiling means unbounded.
    async fn increment_usage(
        &mut self,
        actor: ActorId,
        day: NaiveDate,
        ceiling: Option<u32>,
    ) -> StoreResult<Option<u32>>;

    /// Insert an interaction; [`Constraint::InteractionPair`](crate::Constraint) on a repeated pair
    async fn insert_interaction(&mut self, interaction: &Interaction) -> StoreResult<()>;

    /// Insert a grant unless an active grant for the same (actor, capability)
    /// is still open at its start; [`Constraint::ActiveGrant`](crate::Constraint) otherwise.
    async fn insert_grant(&mut self, grant: &CapabilityGrant) -> StoreResult<()>;

    /// Change a grant's status; `None` when the grant does not exist
    async fn set_grant_status(
        &mut self,
        id: GrantId,
        status: GrantStatus,
    ) -> StoreResult<Option<CapabilityGrant>>;

    /// Register a catalog entry; [`Constraint::CapabilityName`](crate::Constraint) on a repeated name
    async fn insert_capability(&mut self, capability: &Capability) -> StoreResult<()>;

    /// Register an actor; [`Constraint::ActorEmail`](crate::Constraint) on a repeated email
    async fn insert_actor(&mut self, record: &ActorRecord) -> StoreResult<()>;

    /// Make every staged write visible atomically
    async fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discard every staged write
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
