//! Store errors

use kindred_common::KindredError;
use std::fmt;

/// Store result type
pub type StoreResult<T> = Result<T, StoreError>;

/// Uniqueness rule enforced at the store boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// One interaction per ordered (from, to) pair
    InteractionPair,
    /// At most one non-lapsed active grant per (actor, capability)
    ActiveGrant,
    /// One actor per email
    ActorEmail,
    /// One catalog entry per capability name
    CapabilityName,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InteractionPair => "interactions_pair_key",
            Self::ActiveGrant => "capability_grants_active_key",
            Self::ActorEmail => "actors_email_key",
            Self::CapabilityName => "capabilities_name_key",
        };
        f.write_str(name)
    }
}

/// Store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness rule rejected the write
    #[error("unique constraint violated: {0}")]
    UniqueViolation(Constraint),

    /// Backend unreachable, timed out or failed mid-statement
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Row could not be decoded into the domain model
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Constraint that fired, if this is a uniqueness failure
    pub fn constraint(&self) -> Option<Constraint> {
        match self {
            Self::UniqueViolation(c) => Some(*c),
            _ => None,
        }
    }
}

/// Fallback translation. Operations that expect a specific constraint map it
/// to their own conflict variant before reaching for this.
impl From<StoreError> for KindredError {
    fn from(err: StoreError) -> Self {
        KindredError::StoreUnavailable(err.to_string())
    }
}
