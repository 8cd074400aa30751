//! Domain model
//!
//! Actors are opaque ids; everything this core tracks about them is either a
//! capability grant or an interaction they authored.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::KindredError;

/// Actor identifier
pub type ActorId = Uuid;
/// Catalog capability identifier
pub type CapabilityId = Uuid;
/// Grant identifier
pub type GrantId = Uuid;
/// Interaction identifier
pub type InteractionId = Uuid;

/// Catalog name of the capability that lifts the daily interaction quota
pub const UNLIMITED_INTERACTIONS: &str = "daily_responses";

/// Gender as recorded on a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// male
    Male,
    /// female
    Female,
    /// other
    Other,
}

impl Gender {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }
}

impl FromStr for Gender {
    type Err = KindredError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            other => Err(KindredError::InvalidInput(format!("unknown gender: {other}"))),
        }
    }
}

/// Public record of an actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Actor id
    pub id: ActorId,
    /// Login email, unique
    pub email: String,
    /// Display name
    pub name: String,
    /// Free-form bio
    pub bio: String,
    /// Date of birth
    pub birth_date: NaiveDate,
    /// Gender
    pub gender: Gender,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

/// Sign-up payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProfile {
    /// Login email
    pub email: String,
    /// Display name
    pub name: String,
    /// Free-form bio
    #[serde(default)]
    pub bio: String,
    /// Date of birth
    pub birth_date: NaiveDate,
    /// Gender
    pub gender: Gender,
}

impl NewProfile {
    /// Materialize into a profile with a fresh id
    pub fn into_profile(self, now: DateTime<Utc>) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            email: self.email,
            name: self.name,
            bio: self.bio,
            birth_date: self.birth_date,
            gender: self.gender,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Catalog capability (immutable reference data)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    /// Capability id
    pub id: CapabilityId,
    /// Unique name, e.g. `daily_responses`
    pub name: String,
    /// Human description
    pub description: String,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

/// Grant status; the only mutable field of a grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantStatus {
    /// In force within its validity window
    Active,
    /// Withdrawn; never resolves again
    Revoked,
}

impl GrantStatus {
    /// Storage name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Revoked => "revoked",
        }
    }
}

impl FromStr for GrantStatus {
    type Err = KindredError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "revoked" => Ok(Self::Revoked),
            other => Err(KindredError::InvalidInput(format!("unknown grant status: {other}"))),
        }
    }
}

/// Capability granted to an actor over `[starts_at, ends_at)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityGrant {
    /// Grant id
    pub id: GrantId,
    /// Holder
    pub actor_id: ActorId,
    /// Granted capability
    pub capability_id: CapabilityId,
    /// Tier or quantity
    pub value: i64,
    /// Start of validity (inclusive)
    pub starts_at: DateTime<Utc>,
    /// End of validity (exclusive); `None` never expires
    pub ends_at: Option<DateTime<Utc>>,
    /// Status
    pub status: GrantStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl CapabilityGrant {
    /// Whether the grant is in force at `at`
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.status == GrantStatus::Active
            && self.starts_at <= at
            && self.ends_at.map_or(true, |end| end > at)
    }

    /// Whether this grant would overlap another grant starting at `start`.
    /// Revoked grants never block.
    pub fn blocks_start_at(&self, start: DateTime<Utc>) -> bool {
        self.status == GrantStatus::Active && self.ends_at.map_or(true, |end| end > start)
    }
}

/// Grant joined with its catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedGrant {
    /// The grant itself
    pub grant: CapabilityGrant,
    /// Catalog name of the granted capability
    pub capability_name: String,
    /// Catalog description of the granted capability
    pub capability_description: String,
}

/// Direction-specific response of one actor to another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionKind {
    /// "like"
    #[serde(rename = "like", alias = "accept")]
    Accept,
    /// "pass"
    #[serde(rename = "pass", alias = "reject")]
    Reject,
}

impl InteractionKind {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "like",
            Self::Reject => "pass",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionKind {
    type Err = KindredError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" | "accept" => Ok(Self::Accept),
            "pass" | "reject" => Ok(Self::Reject),
            other => Err(KindredError::InvalidInput(format!("unknown interaction kind: {other}"))),
        }
    }
}

/// Interaction from one actor toward another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    /// Interaction id
    pub id: InteractionId,
    /// Author
    pub from_actor_id: ActorId,
    /// Target
    pub to_actor_id: ActorId,
    /// Accept or reject
    pub kind: InteractionKind,
    /// Creation time; decides the usage day it counts toward
    pub created_at: DateTime<Utc>,
}

/// Interactions authored by one actor on one UTC day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsage {
    /// Author
    pub actor_id: ActorId,
    /// UTC calendar day
    pub day: NaiveDate,
    /// Interactions recorded that day
    pub count: u32,
}
