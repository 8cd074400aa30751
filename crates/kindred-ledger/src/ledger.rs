//! Interaction ledger

use chrono::NaiveDate;
use kindred_common::{
    usage_day, ActorId, Clock, Interaction, InteractionKind, KindredError, KindredResult, Profile,
    UNLIMITED_INTERACTIONS,
};
use kindred_entitlements::CapabilitySet;
use kindred_store::{settle, Constraint, Store, StoreError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Ledger tunables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// Interactions per actor per UTC day without the unlimited capability
    pub daily_limit: u32,
    /// Catalog name of the capability that lifts the limit
    pub unlimited_capability: String,
    /// Profiles returned per candidate request
    pub candidate_batch: usize,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            daily_limit: 10,
            unlimited_capability: UNLIMITED_INTERACTIONS.to_string(),
            candidate_batch: 1,
        }
    }
}

/// Usage of one actor on one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Actor
    pub actor_id: ActorId,
    /// UTC day
    pub day: NaiveDate,
    /// Interactions recorded so far
    pub count: u32,
    /// Limit in force; `None` when unlimited
    pub limit: Option<u32>,
    /// Interactions left today; `None` when unlimited
    pub remaining: Option<u32>,
}

/// Records interactions and enforces the daily quota
pub struct InteractionLedger {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    settings: LedgerSettings,
}

impl InteractionLedger {
    /// Create a ledger
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, settings: LedgerSettings) -> Self {
        Self { store, clock, settings }
    }

    /// Settings in force
    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    fn ceiling(&self, capabilities: &CapabilitySet) -> Option<u32> {
        if capabilities.has(&self.settings.unlimited_capability) {
            None
        } else {
            Some(self.settings.daily_limit)
        }
    }

    /// Whether `actor` may interact right now. Advisory only: [`record`]
    /// re-checks atomically.
    ///
    /// [`record`]: InteractionLedger::record
    pub async fn check_quota(&self, actor: ActorId, capabilities: &CapabilitySet) -> KindredResult<bool> {
        let Some(limit) = self.ceiling(capabilities) else {
            return Ok(true);
        };
        let used = self.store.daily_usage(actor, usage_day(self.clock.now())).await?;
        Ok(used < limit)
    }

    /// Today's usage for `actor`
    pub async fn usage(&self, actor: ActorId, capabilities: &CapabilitySet) -> KindredResult<UsageSnapshot> {
        let day = usage_day(self.clock.now());
        let count = self.store.daily_usage(actor, day).await?;
        let limit = self.ceiling(capabilities);
        Ok(UsageSnapshot {
            actor_id: actor,
            day,
            count,
            limit,
            remaining: limit.map(|l| l.saturating_sub(count)),
        })
    }

    /// Record `from`'s response to `to`.
    ///
    /// The counter bump and the row insert commit together or not at all.
    pub async fn record(
        &self,
        from: ActorId,
        to: ActorId,
        kind: InteractionKind,
        capabilities: &CapabilitySet,
    ) -> KindredResult<Interaction> {
        if from == to {
            return Err(KindredError::InvalidInput(
                "an actor cannot respond to their own profile".into(),
            ));
        }

        let now = self.clock.now();
        let day = usage_day(now);
        let ceiling = self.ceiling(capabilities);
        let interaction = Interaction {
            id: Uuid::new_v4(),
            from_actor_id: from,
            to_actor_id: to,
            kind,
            created_at: now,
        };

        let conflict = |err: StoreError| match err.constraint() {
            Some(Constraint::InteractionPair) => KindredError::DuplicateInteraction { from, to },
            _ => err.into(),
        };
        let limit = self.settings.daily_limit;

        let mut tx = self.store.begin().await?;
        let outcome = async {
            let count = tx
                .increment_usage(from, day, ceiling)
                .await?
                .ok_or(KindredError::QuotaExceeded { limit })?;
            tx.insert_interaction(&interaction).await.map_err(conflict)?;
            Ok::<_, KindredError>(count)
        }
        .await;

        match settle(tx, outcome, conflict).await {
            Ok(count) => {
                tracing::info!(actor = %from, target = %to, kind = %kind, count, "interaction recorded");
                Ok(interaction)
            }
            Err(err) => {
                if err.is_business_outcome() {
                    tracing::debug!(actor = %from, target = %to, error = %err, "interaction refused");
                } else {
                    tracing::warn!(actor = %from, target = %to, error = %err, "interaction not recorded");
                }
                Err(err)
            }
        }
    }

    /// Next profiles for `actor` to respond to, gated by the quota
    pub async fn candidates(&self, actor: ActorId, capabilities: &CapabilitySet) -> KindredResult<Vec<Profile>> {
        if !self.check_quota(actor, capabilities).await? {
            tracing::debug!(actor = %actor, "candidate request over quota");
            return Err(KindredError::QuotaExceeded {
                limit: self.settings.daily_limit,
            });
        }
        Ok(self.store.candidates(actor, self.settings.candidate_batch).await?)
    }
}
