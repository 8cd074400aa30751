//! SQLite store
//!
//! Timestamps are stored as UTC epoch milliseconds, ids as hyphenated UUID
//! text and usage days as `YYYY-MM-DD`. Every transaction opens with a write
//! statement so SQLite takes the database write lock before reading anything
//! the statement depends on.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use kindred_common::{
    ActorId, Capability, CapabilityGrant, CapabilityId, GrantId, GrantStatus, Interaction, Profile,
    ResolvedGrant,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{Constraint, StoreError, StoreResult};
use crate::ports::{ActorRecord, Store, Transaction};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS actors (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        bio TEXT NOT NULL DEFAULT '',
        birth_date TEXT NOT NULL,
        gender TEXT NOT NULL,
        credential_hash TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS capabilities (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        description TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS capability_grants (
        id TEXT PRIMARY KEY,
        actor_id TEXT NOT NULL,
        capability_id TEXT NOT NULL,
        value INTEGER NOT NULL,
        starts_at INTEGER NOT NULL,
        ends_at INTEGER,
        status TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS capability_grants_actor_idx
        ON capability_grants (actor_id, capability_id, status)",
    "CREATE TABLE IF NOT EXISTS interactions (
        id TEXT PRIMARY KEY,
        from_actor_id TEXT NOT NULL,
        to_actor_id TEXT NOT NULL,
        kind TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        UNIQUE (from_actor_id, to_actor_id)
    )",
    "CREATE INDEX IF NOT EXISTS interactions_from_created_idx
        ON interactions (from_actor_id, created_at)",
    "CREATE TABLE IF NOT EXISTS daily_usage (
        actor_id TEXT NOT NULL,
        usage_date TEXT NOT NULL,
        used INTEGER NOT NULL,
        PRIMARY KEY (actor_id, usage_date)
    )",
];

const GRANT_COLUMNS: &str = "id, actor_id, capability_id, value, starts_at, ends_at, status, created_at";
const PROFILE_COLUMNS: &str = "id, email, name, bio, birth_date, gender, created_at, updated_at";

/// Connection settings
#[derive(Debug, Clone)]
pub struct SqliteSettings {
    /// Connection URL, e.g. `sqlite://kindred.db`
    pub url: String,
    /// Pool size
    pub max_connections: u32,
    /// How long a writer waits on the database lock before failing
    pub busy_timeout: Duration,
}

impl Default for SqliteSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://kindred.db".to_string(),
            max_connections: 5,
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

/// SQLite-backed store
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database described by `settings`
    pub async fn connect(settings: &SqliteSettings) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(&settings.url)
            .map_err(unavailable)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(settings.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .connect_with(options)
            .await
            .map_err(unavailable)?;

        tracing::info!(url = %settings.url, max_connections = settings.max_connections, "sqlite store connected");
        Ok(Self { pool })
    }

    /// Create tables and indexes; idempotent
    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(unavailable)?;
        }
        tracing::debug!(statements = SCHEMA.len(), "schema applied");
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn unavailable(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn on_unique(constraint: Constraint) -> impl Fn(sqlx::Error) -> StoreError {
    move |err| match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::UniqueViolation(constraint),
        _ => unavailable(err),
    }
}

fn millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn day_text(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

fn text(row: &SqliteRow, column: &str) -> StoreResult<String> {
    row.try_get::<String, _>(column)
        .map_err(|e| StoreError::Corrupt(format!("{column}: {e}")))
}

fn integer(row: &SqliteRow, column: &str) -> StoreResult<i64> {
    row.try_get::<i64, _>(column)
        .map_err(|e| StoreError::Corrupt(format!("{column}: {e}")))
}

fn uuid(row: &SqliteRow, column: &str) -> StoreResult<Uuid> {
    let raw = text(row, column)?;
    Uuid::parse_str(&raw).map_err(|e| StoreError::Corrupt(format!("{column}: {e}")))
}

fn timestamp(raw: i64, column: &str) -> StoreResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(raw)
        .single()
        .ok_or_else(|| StoreError::Corrupt(format!("{column}: timestamp {raw} out of range")))
}

fn instant(row: &SqliteRow, column: &str) -> StoreResult<DateTime<Utc>> {
    timestamp(integer(row, column)?, column)
}

fn parsed<T>(row: &SqliteRow, column: &str) -> StoreResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = text(row, column)?;
    raw.parse()
        .map_err(|e: T::Err| StoreError::Corrupt(format!("{column}: {e}")))
}

fn grant_from_row(row: &SqliteRow) -> StoreResult<CapabilityGrant> {
    let ends_at = row
        .try_get::<Option<i64>, _>("ends_at")
        .map_err(|e| StoreError::Corrupt(format!("ends_at: {e}")))?
        .map(|raw| timestamp(raw, "ends_at"))
        .transpose()?;

    Ok(CapabilityGrant {
        id: uuid(row, "id")?,
        actor_id: uuid(row, "actor_id")?,
        capability_id: uuid(row, "capability_id")?,
        value: integer(row, "value")?,
        starts_at: instant(row, "starts_at")?,
        ends_at,
        status: parsed(row, "status")?,
        created_at: instant(row, "created_at")?,
    })
}

fn capability_from_row(row: &SqliteRow) -> StoreResult<Capability> {
    Ok(Capability {
        id: uuid(row, "id")?,
        name: text(row, "name")?,
        description: text(row, "description")?,
        created_at: instant(row, "created_at")?,
    })
}

fn profile_from_row(row: &SqliteRow) -> StoreResult<Profile> {
    let birth_date = NaiveDate::parse_from_str(&text(row, "birth_date")?, "%Y-%m-%d")
        .map_err(|e| StoreError::Corrupt(format!("birth_date: {e}")))?;

    Ok(Profile {
        id: uuid(row, "id")?,
        email: text(row, "email")?,
        name: text(row, "name")?,
        bio: text(row, "bio")?,
        birth_date,
        gender: parsed(row, "gender")?,
        created_at: instant(row, "created_at")?,
        updated_at: instant(row, "updated_at")?,
    })
}

fn interaction_from_row(row: &SqliteRow) -> StoreResult<Interaction> {
    Ok(Interaction {
        id: uuid(row, "id")?,
        from_actor_id: uuid(row, "from_actor_id")?,
        to_actor_id: uuid(row, "to_actor_id")?,
        kind: parsed(row, "kind")?,
        created_at: instant(row, "created_at")?,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>> {
        let tx = self.pool.begin().await.map_err(unavailable)?;
        Ok(Box::new(SqliteTransaction { tx }))
    }

    async fn capabilities(&self) -> StoreResult<Vec<Capability>> {
        let rows = sqlx::query("SELECT id, name, description, created_at FROM capabilities ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;
        rows.iter().map(capability_from_row).collect()
    }

    async fn capability(&self, id: CapabilityId) -> StoreResult<Option<Capability>> {
        sqlx::query("SELECT id, name, description, created_at FROM capabilities WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?
            .as_ref()
            .map(capability_from_row)
            .transpose()
    }

    async fn capability_by_name(&self, name: &str) -> StoreResult<Option<Capability>> {
        sqlx::query("SELECT id, name, description, created_at FROM capabilities WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?
            .as_ref()
            .map(capability_from_row)
            .transpose()
    }

    async fn grants_valid_at(&self, actor: ActorId, at: DateTime<Utc>) -> StoreResult<Vec<ResolvedGrant>> {
        let rows = sqlx::query(
            "SELECT g.id, g.actor_id, g.capability_id, g.value, g.starts_at, g.ends_at, g.status,
                    g.created_at, c.name AS capability_name, c.description AS capability_description
             FROM capability_grants g
             JOIN capabilities c ON c.id = g.capability_id
             WHERE g.actor_id = ?1
               AND g.status = 'active'
               AND g.starts_at <= ?2
               AND (g.ends_at IS NULL OR g.ends_at > ?2)
             ORDER BY g.created_at DESC",
        )
        .bind(actor.to_string())
        .bind(millis(at))
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        rows.iter()
            .map(|row| {
                Ok(ResolvedGrant {
                    grant: grant_from_row(row)?,
                    capability_name: text(row, "capability_name")?,
                    capability_description: text(row, "capability_description")?,
                })
            })
            .collect()
    }

    async fn grant(&self, id: GrantId) -> StoreResult<Option<CapabilityGrant>> {
        sqlx::query(&format!("SELECT {GRANT_COLUMNS} FROM capability_grants WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?
            .as_ref()
            .map(grant_from_row)
            .transpose()
    }

    async fn daily_usage(&self, actor: ActorId, day: NaiveDate) -> StoreResult<u32> {
        let used: Option<i64> =
            sqlx::query_scalar("SELECT used FROM daily_usage WHERE actor_id = ?1 AND usage_date = ?2")
                .bind(actor.to_string())
                .bind(day_text(day))
                .fetch_optional(&self.pool)
                .await
                .map_err(unavailable)?;
        Ok(used.unwrap_or(0) as u32)
    }

    async fn count_interactions_on(&self, actor: ActorId, day: NaiveDate) -> StoreResult<u32> {
        let start = day
            .and_hms_opt(0, 0, 0)
            .map(|d| Utc.from_utc_datetime(&d))
            .ok_or_else(|| StoreError::Corrupt(format!("day {day} has no midnight")))?;
        let end = start + chrono::Duration::days(1);

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM interactions
             WHERE from_actor_id = ?1 AND created_at >= ?2 AND created_at < ?3",
        )
        .bind(actor.to_string())
        .bind(millis(start))
        .bind(millis(end))
        .fetch_one(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(count as u32)
    }

    async fn interaction(&self, from: ActorId, to: ActorId) -> StoreResult<Option<Interaction>> {
        sqlx::query(
            "SELECT id, from_actor_id, to_actor_id, kind, created_at FROM interactions
             WHERE from_actor_id = ?1 AND to_actor_id = ?2",
        )
        .bind(from.to_string())
        .bind(to.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?
        .as_ref()
        .map(interaction_from_row)
        .transpose()
    }

    async fn actor_by_email(&self, email: &str) -> StoreResult<Option<ActorRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {PROFILE_COLUMNS}, credential_hash FROM actors WHERE email = ?1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        row.map(|row| {
            Ok(ActorRecord {
                profile: profile_from_row(&row)?,
                credential_hash: text(&row, "credential_hash")?,
            })
        })
        .transpose()
    }

    async fn profile(&self, id: ActorId) -> StoreResult<Option<Profile>> {
        sqlx::query(&format!("SELECT {PROFILE_COLUMNS} FROM actors WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?
            .as_ref()
            .map(profile_from_row)
            .transpose()
    }

    async fn candidates(&self, actor: ActorId, limit: usize) -> StoreResult<Vec<Profile>> {
        let rows = sqlx::query(&format!(
            "SELECT {PROFILE_COLUMNS} FROM actors
             WHERE id != ?1
               AND id NOT IN (SELECT to_actor_id FROM interactions WHERE from_actor_id = ?1)
             ORDER BY RANDOM()
             LIMIT ?2"
        ))
        .bind(actor.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;
        rows.iter().map(profile_from_row).collect()
    }
}

/// Transaction over [`SqliteStore`]. Dropping it rolls back.
pub struct SqliteTransaction {
    tx: sqlx::Transaction<'static, Sqlite>,
}

#[async_trait]
impl Transaction for SqliteTransaction {
    async fn capability(&mut self, id: CapabilityId) -> StoreResult<Option<Capability>> {
        sqlx::query("SELECT id, name, description, created_at FROM capabilities WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(unavailable)?
            .as_ref()
            .map(capability_from_row)
            .transpose()
    }

    async fn increment_usage(
        &mut self,
        actor: ActorId,
        day: NaiveDate,
        ceiling: Option<u32>,
    ) -> StoreResult<Option<u32>> {
        if ceiling == Some(0) {
            return Ok(None);
        }

        let used: Option<i64> = sqlx::query_scalar(
            "INSERT INTO daily_usage (actor_id, usage_date, used) VALUES (?1, ?2, 1)
             ON CONFLICT (actor_id, usage_date) DO UPDATE SET used = daily_usage.used + 1
             WHERE ?3 IS NULL OR daily_usage.used < ?3
             RETURNING used",
        )
        .bind(actor.to_string())
        .bind(day_text(day))
        .bind(ceiling.map(i64::from))
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(unavailable)?;

        Ok(used.map(|n| n as u32))
    }

    async fn insert_interaction(&mut self, interaction: &Interaction) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO interactions (id, from_actor_id, to_actor_id, kind, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(interaction.id.to_string())
        .bind(interaction.from_actor_id.to_string())
        .bind(interaction.to_actor_id.to_string())
        .bind(interaction.kind.as_str())
        .bind(millis(interaction.created_at))
        .execute(&mut *self.tx)
        .await
        .map_err(on_unique(Constraint::InteractionPair))?;
        Ok(())
    }

    async fn insert_grant(&mut self, grant: &CapabilityGrant) -> StoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO capability_grants
                (id, actor_id, capability_id, value, starts_at, ends_at, status, created_at)
             SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8
             WHERE NOT EXISTS (
                SELECT 1 FROM capability_grants
                WHERE actor_id = ?2 AND capability_id = ?3 AND status = 'active'
                  AND (ends_at IS NULL OR ends_at > ?5)
             )",
        )
        .bind(grant.id.to_string())
        .bind(grant.actor_id.to_string())
        .bind(grant.capability_id.to_string())
        .bind(grant.value)
        .bind(millis(grant.starts_at))
        .bind(grant.ends_at.map(millis))
        .bind(grant.status.as_str())
        .bind(millis(grant.created_at))
        .execute(&mut *self.tx)
        .await
        .map_err(unavailable)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::UniqueViolation(Constraint::ActiveGrant));
        }
        Ok(())
    }

    async fn set_grant_status(
        &mut self,
        id: GrantId,
        status: GrantStatus,
    ) -> StoreResult<Option<CapabilityGrant>> {
        let row = sqlx::query(&format!(
            "UPDATE capability_grants SET status = ?2 WHERE id = ?1 RETURNING {GRANT_COLUMNS}"
        ))
        .bind(id.to_string())
        .bind(status.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(unavailable)?;

        row.as_ref().map(grant_from_row).transpose()
    }

    async fn insert_capability(&mut self, capability: &Capability) -> StoreResult<()> {
        sqlx::query("INSERT INTO capabilities (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(capability.id.to_string())
            .bind(&capability.name)
            .bind(&capability.description)
            .bind(millis(capability.created_at))
            .execute(&mut *self.tx)
            .await
            .map_err(on_unique(Constraint::CapabilityName))?;
        Ok(())
    }

    async fn insert_actor(&mut self, record: &ActorRecord) -> StoreResult<()> {
        let p = &record.profile;
        sqlx::query(
            "INSERT INTO actors
                (id, email, name, bio, birth_date, gender, credential_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(p.id.to_string())
        .bind(&p.email)
        .bind(&p.name)
        .bind(&p.bio)
        .bind(day_text(p.birth_date))
        .bind(p.gender.as_str())
        .bind(&record.credential_hash)
        .bind(millis(p.created_at))
        .bind(millis(p.updated_at))
        .execute(&mut *self.tx)
        .await
        .map_err(on_unique(Constraint::ActorEmail))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let this = *self;
        this.tx.commit().await.map_err(unavailable)
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        let this = *self;
        this.tx.rollback().await.map_err(unavailable)
    }
}
