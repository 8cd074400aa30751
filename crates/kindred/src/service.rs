//! Match service façade
//!
//! Every call resolves entitlements once, hands the snapshot down by
//! reference and runs under the configured deadline. When the deadline
//! elapses the in-flight future is dropped together with its transaction.

use chrono::Duration as ChronoDuration;
use kindred_common::{
    ActorId, Capability, CapabilityGrant, CapabilityId, Clock, GrantId, Interaction, InteractionKind,
    KindredError, KindredResult, NewProfile, Profile, SubscriptionPeriod, SystemClock,
};
use kindred_entitlements::{CapabilitySet, Catalog, EntitlementResolver, SubscriptionActivator};
use kindred_ledger::{InteractionLedger, UsageSnapshot};
use kindred_store::{settle, ActorRecord, Constraint, MemoryStore, Store, StoreError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{Argon2Verifier, CredentialVerifier, SessionIssuer, SessionToken};
use crate::config::{KindredConfig, StoreConfig};

/// Open the backend described by `config`, creating the schema if needed
pub async fn open_store(config: &StoreConfig) -> KindredResult<Arc<dyn Store>> {
    match config {
        StoreConfig::Memory => Ok(Arc::new(MemoryStore::new())),
        #[cfg(feature = "sqlite")]
        StoreConfig::Sqlite {
            url,
            max_connections,
            busy_timeout_ms,
        } => {
            let settings = kindred_store::SqliteSettings {
                url: url.clone(),
                max_connections: *max_connections,
                busy_timeout: Duration::from_millis(*busy_timeout_ms),
            };
            let store = kindred_store::SqliteStore::connect(&settings).await?;
            store.migrate().await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        StoreConfig::Sqlite { .. } => Err(KindredError::InvalidInput(
            "sqlite backend requested but the `sqlite` feature is disabled".into(),
        )),
    }
}

/// Entry point for the routing layer
pub struct MatchService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    verifier: Arc<dyn CredentialVerifier>,
    sessions: SessionIssuer,
    catalog: Catalog,
    resolver: EntitlementResolver,
    ledger: InteractionLedger,
    activator: SubscriptionActivator,
    deadline: Duration,
}

impl MatchService {
    /// Wire the service over explicit collaborators
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        verifier: Arc<dyn CredentialVerifier>,
        config: &KindredConfig,
    ) -> Self {
        Self {
            sessions: SessionIssuer::new(
                &config.session.secret,
                ChronoDuration::hours(config.session.ttl_hours),
            ),
            catalog: Catalog::new(store.clone(), clock.clone()),
            resolver: EntitlementResolver::new(store.clone(), clock.clone()),
            ledger: InteractionLedger::new(store.clone(), clock.clone(), config.ledger_settings()),
            activator: SubscriptionActivator::new(store.clone(), clock.clone()),
            deadline: config.request_timeout(),
            store,
            clock,
            verifier,
        }
    }

    /// Service over the configured backend, the wall clock and Argon2
    pub async fn open(config: &KindredConfig) -> KindredResult<Self> {
        let store = open_store(&config.store).await?;
        Ok(Self::new(store, Arc::new(SystemClock), Arc::new(Argon2Verifier), config))
    }

    /// Backing store
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Capability catalog
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    async fn within<T, F>(&self, op: &'static str, fut: F) -> KindredResult<T>
    where
        F: Future<Output = KindredResult<T>>,
    {
        match tokio::time::timeout(self.deadline, fut).await {
            Ok(result) => result,
            Err(_) => {
                let ms = self.deadline.as_millis() as u64;
                tracing::warn!(op, deadline_ms = ms, "deadline elapsed");
                Err(KindredError::StoreUnavailable(format!("{op} exceeded its {ms}ms deadline")))
            }
        }
    }

    /// Capabilities `actor` holds right now
    pub async fn resolve(&self, actor: ActorId) -> KindredResult<CapabilitySet> {
        self.within("resolve", self.resolver.resolve_now(actor)).await
    }

    /// Next profiles for `actor`, refused once the daily quota is spent
    pub async fn get_profiles(&self, actor: ActorId) -> KindredResult<Vec<Profile>> {
        self.within("get_profiles", async {
            let capabilities = self.resolver.resolve_now(actor).await?;
            self.ledger.candidates(actor, &capabilities).await
        })
        .await
    }

    /// Record `from`'s response to `to`
    pub async fn record_interaction(
        &self,
        from: ActorId,
        to: ActorId,
        kind: InteractionKind,
    ) -> KindredResult<Interaction> {
        self.within("record_interaction", async {
            let capabilities = self.resolver.resolve_now(from).await?;
            self.ledger.record(from, to, kind, &capabilities).await
        })
        .await
    }

    /// Today's usage for `actor`
    pub async fn usage(&self, actor: ActorId) -> KindredResult<UsageSnapshot> {
        self.within("usage", async {
            let capabilities = self.resolver.resolve_now(actor).await?;
            self.ledger.usage(actor, &capabilities).await
        })
        .await
    }

    /// Subscribe `actor` to `capability` for `period`
    pub async fn activate_subscription(
        &self,
        actor: ActorId,
        capability: CapabilityId,
        period: SubscriptionPeriod,
        value: i64,
    ) -> KindredResult<CapabilityGrant> {
        self.within(
            "activate_subscription",
            self.activator.activate(actor, capability, period, value),
        )
        .await
    }

    /// Withdraw a grant
    pub async fn revoke_grant(&self, grant: GrantId) -> KindredResult<CapabilityGrant> {
        self.within("revoke_grant", self.activator.revoke(grant)).await
    }

    /// Catalog, ordered by name
    pub async fn capabilities(&self) -> KindredResult<Vec<Capability>> {
        self.within("capabilities", self.catalog.list()).await
    }

    /// Add a catalog entry
    pub async fn register_capability(&self, name: &str, description: &str) -> KindredResult<Capability> {
        self.within("register_capability", self.catalog.register(name, description))
            .await
    }

    /// Public profile of `actor`
    pub async fn profile(&self, actor: ActorId) -> KindredResult<Profile> {
        self.within("profile", async {
            self.store
                .profile(actor)
                .await?
                .ok_or_else(|| KindredError::ActorNotFound(actor.to_string()))
        })
        .await
    }

    /// Register a new actor
    pub async fn sign_up(&self, new: NewProfile, password: &str) -> KindredResult<Profile> {
        let new = NewProfile {
            email: normalize_email(&new.email),
            name: new.name.trim().to_string(),
            ..new
        };
        if !new.email.contains('@') {
            return Err(KindredError::InvalidInput(format!("invalid email: {}", new.email)));
        }
        if new.name.is_empty() {
            return Err(KindredError::InvalidInput("name is required".into()));
        }
        if password.is_empty() {
            return Err(KindredError::InvalidInput("password is required".into()));
        }

        // Hash before opening the transaction.
        let credential_hash = self.run_verifier({
            let password = password.to_owned();
            move |v: &dyn CredentialVerifier| v.hash(&password)
        })
        .await?;

        let record = ActorRecord {
            profile: new.into_profile(self.clock.now()),
            credential_hash,
        };
        let email = record.profile.email.clone();
        let conflict = |err: StoreError| match err.constraint() {
            Some(Constraint::ActorEmail) => KindredError::EmailTaken(email.clone()),
            _ => err.into(),
        };

        let profile = self
            .within("sign_up", async {
                let mut tx = self.store.begin().await?;
                let outcome = tx.insert_actor(&record).await.map_err(&conflict);
                settle(tx, outcome, &conflict).await?;
                Ok(record.profile.clone())
            })
            .await?;

        tracing::info!(actor = %profile.id, "actor signed up");
        Ok(profile)
    }

    /// Exchange credentials for a session token
    pub async fn login(&self, email: &str, password: &str) -> KindredResult<SessionToken> {
        let email = normalize_email(email);
        let record = self
            .within("login", self.store_lookup(&email))
            .await?
            .ok_or(KindredError::InvalidCredentials)?;

        let matches = self
            .run_verifier({
                let password = password.to_owned();
                let hash = record.credential_hash.clone();
                move |v: &dyn CredentialVerifier| v.verify(&password, &hash)
            })
            .await?;
        if !matches {
            tracing::debug!(actor = %record.profile.id, "login refused");
            return Err(KindredError::InvalidCredentials);
        }

        let session = self.sessions.issue(&record.profile, self.clock.now())?;
        tracing::info!(actor = %record.profile.id, "session issued");
        Ok(session)
    }

    /// Actor behind a session token
    pub fn authenticate(&self, token: &str) -> KindredResult<ActorId> {
        Ok(self.sessions.verify(token, self.clock.now())?.sub)
    }

    async fn store_lookup(&self, email: &str) -> KindredResult<Option<ActorRecord>> {
        Ok(self.store.actor_by_email(email).await?)
    }

    async fn run_verifier<T, F>(&self, f: F) -> KindredResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn CredentialVerifier) -> KindredResult<T> + Send + 'static,
    {
        let verifier = self.verifier.clone();
        tokio::task::spawn_blocking(move || f(verifier.as_ref()))
            .await
            .map_err(|e| KindredError::Internal(format!("credential worker failed: {e}")))?
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
