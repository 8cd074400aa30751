//! Demo data
//!
//! Registers the catalog and a population of actors who responded to each
//! other the previous day, so today's quota starts empty. Every demo actor
//! shares [`DEMO_PASSWORD`].

use chrono::{DateTime, Duration, Utc};
use kindred_common::{
    usage_day, ActorId, Capability, Clock, Gender, Interaction, InteractionKind, KindredResult, Profile,
    UNLIMITED_INTERACTIONS,
};
use kindred_store::{settle, ActorRecord, Store, StoreError};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use uuid::Uuid;

use crate::auth::CredentialVerifier;

/// Password of every seeded actor
pub const DEMO_PASSWORD: &str = "Password123!";

/// Catalog entries every deployment needs
pub const CATALOG: &[(&str, &str)] = &[(UNLIMITED_INTERACTIONS, "Unlimited daily responses")];

const FIRST_NAMES: &[&str] = &[
    "Ada", "Bea", "Cal", "Dev", "Eli", "Fay", "Gus", "Hana", "Ivo", "Jun", "Kai", "Lena", "Milo",
    "Nia", "Omar", "Pia", "Quin", "Rae", "Sol", "Tess",
];
const LAST_NAMES: &[&str] = &[
    "Park", "Okafor", "Silva", "Novak", "Reyes", "Haddad", "Larsen", "Moreau", "Tanaka", "Osei",
];
const BIO_WORDS: &[&str] = &[
    "coffee", "hiking", "vinyl", "ramen", "climbing", "sketching", "podcasts", "sourdough", "cycling",
    "jazz", "travel", "board", "games", "sunsets", "museums", "cats", "dogs", "running", "poetry",
    "gardening",
];

/// Seeding parameters
#[derive(Debug, Clone, Copy)]
pub struct SeedOptions {
    /// Actors to create
    pub actors: usize,
    /// Responses each actor gives, at most
    pub responses_per_actor: usize,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            actors: 1000,
            responses_per_actor: 20,
        }
    }
}

/// What a seeding run wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Catalog entries added
    pub capabilities: usize,
    /// Actors added
    pub actors: usize,
    /// Interactions added
    pub interactions: usize,
}

/// Seed `store`. The catalog step skips entries that already exist.
pub async fn seed(
    store: &dyn Store,
    clock: &dyn Clock,
    verifier: &dyn CredentialVerifier,
    options: SeedOptions,
) -> KindredResult<SeedReport> {
    let now = clock.now();
    let mut report = SeedReport::default();

    let mut missing = Vec::new();
    for (name, description) in CATALOG {
        if store.capability_by_name(name).await?.is_none() {
            missing.push(Capability {
                id: Uuid::new_v4(),
                name: name.to_string(),
                description: description.to_string(),
                created_at: now,
            });
        }
    }

    let mut tx = store.begin().await?;
    let outcome = async {
        for capability in &missing {
            tx.insert_capability(capability).await?;
        }
        Ok::<_, StoreError>(())
    }
    .await;
    settle(tx, outcome, |e| e).await?;
    report.capabilities = missing.len();

    let credential_hash = verifier.hash(DEMO_PASSWORD)?;
    let history = now - Duration::days(1);
    let (actors, interactions) = generate(now, history, &credential_hash, options);

    let mut tx = store.begin().await?;
    let outcome = async {
        for actor in &actors {
            tx.insert_actor(actor).await?;
        }
        Ok::<_, StoreError>(())
    }
    .await;
    settle(tx, outcome, |e| e).await?;
    report.actors = actors.len();
    tracing::info!(actors = report.actors, "seeded actors");

    let day = usage_day(history);
    let mut tx = store.begin().await?;
    let outcome = async {
        for interaction in &interactions {
            tx.increment_usage(interaction.from_actor_id, day, None).await?;
            tx.insert_interaction(interaction).await?;
        }
        Ok::<_, StoreError>(())
    }
    .await;
    settle(tx, outcome, |e| e).await?;
    report.interactions = interactions.len();
    tracing::info!(interactions = report.interactions, "seeded interactions");

    Ok(report)
}

fn generate(
    now: DateTime<Utc>,
    history: DateTime<Utc>,
    credential_hash: &str,
    options: SeedOptions,
) -> (Vec<ActorRecord>, Vec<Interaction>) {
    let today = now.date_naive();
    let mut rng = rand::thread_rng();
    let genders = [Gender::Male, Gender::Female, Gender::Other];

    let actors: Vec<ActorRecord> = (0..options.actors)
        .map(|i| {
            let first = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
            let last = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];
            let bio: Vec<&str> = BIO_WORDS.choose_multiple(&mut rng, 6).copied().collect();
            let age_days = rng.gen_range(18 * 365..60 * 365);

            ActorRecord {
                profile: Profile {
                    id: Uuid::new_v4(),
                    email: format!("{}.{}.{}@example.com", first, last, i).to_lowercase(),
                    name: format!("{first} {last}"),
                    bio: bio.join(" "),
                    birth_date: today - Duration::days(age_days),
                    gender: genders[rng.gen_range(0..genders.len())],
                    created_at: history,
                    updated_at: history,
                },
                credential_hash: credential_hash.to_string(),
            }
        })
        .collect();

    let ids: Vec<ActorId> = actors.iter().map(|a| a.profile.id).collect();
    let mut seen: HashSet<(ActorId, ActorId)> = HashSet::new();
    let mut interactions = Vec::new();

    for &from in &ids {
        let mut targets: Vec<ActorId> = ids.iter().copied().filter(|&to| to != from).collect();
        targets.shuffle(&mut rng);

        let mut given = 0;
        for to in targets {
            if given == options.responses_per_actor {
                break;
            }
            // One response per unordered pair keeps the demo graph sparse.
            if seen.contains(&(from, to)) || seen.contains(&(to, from)) {
                continue;
            }
            seen.insert((from, to));
            interactions.push(Interaction {
                id: Uuid::new_v4(),
                from_actor_id: from,
                to_actor_id: to,
                kind: if rng.gen_bool(0.5) {
                    InteractionKind::Accept
                } else {
                    InteractionKind::Reject
                },
                created_at: history,
            });
            given += 1;
        }
    }

    (actors, interactions)
}
