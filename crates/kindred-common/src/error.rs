//! Error types for Kindred

use thiserror::Error;

use crate::model::{ActorId, CapabilityId, GrantId};

/// Kindred error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KindredError {
    /// Capability absent from the catalog
    #[error("capability not found: {0}")]
    CapabilityNotFound(CapabilityId),

    /// Grant absent from the entitlement store
    #[error("grant not found: {0}")]
    GrantNotFound(GrantId),

    /// Actor absent (lookup by email or id)
    #[error("actor not found: {0}")]
    ActorNotFound(String),

    /// The ordered pair already has an interaction
    #[error("actor {from} already responded to {to}")]
    DuplicateInteraction {
        /// Author of the existing interaction
        from: ActorId,
        /// Target of the existing interaction
        to: ActorId,
    },

    /// A currently-valid grant of the same capability exists
    #[error("actor {actor} already subscribed to capability {capability}")]
    AlreadySubscribed {
        /// Subscriber
        actor: ActorId,
        /// Capability already held
        capability: CapabilityId,
    },

    /// Email already registered to another actor
    #[error("email already registered: {0}")]
    EmailTaken(String),

    /// Catalog already holds a capability with this name
    #[error("capability name already registered: {0}")]
    CapabilityNameTaken(String),

    /// Daily interaction quota reached
    #[error("daily interaction limit of {limit} exceeded")]
    QuotaExceeded {
        /// Limit in force for the actor
        limit: u32,
    },

    /// Transient infrastructure failure
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Server-side failure outside the store, e.g. hashing or token signing
    #[error("internal error: {0}")]
    Internal(String),

    /// Malformed request, rejected before any store access
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Unknown email, wrong password or bad session token
    #[error("invalid credentials")]
    InvalidCredentials,
}

/// Coarse classification a caller can branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Referenced entity absent
    NotFound,
    /// Request collides with existing state; nothing changed
    Conflict,
    /// Rate limit reached; retry after the day rolls over
    QuotaExceeded,
    /// Server fault; retry at the caller's discretion
    StoreUnavailable,
    /// Server fault that repeating the request will not fix
    Internal,
    /// Malformed request
    InvalidInput,
    /// Authentication failed
    Unauthorized,
}

impl ErrorKind {
    /// Whether repeating the identical request later can succeed
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::QuotaExceeded | Self::StoreUnavailable)
    }
}

impl KindredError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CapabilityNotFound(_) | Self::GrantNotFound(_) | Self::ActorNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::DuplicateInteraction { .. }
            | Self::AlreadySubscribed { .. }
            | Self::EmailTaken(_)
            | Self::CapabilityNameTaken(_) => ErrorKind::Conflict,
            Self::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            Self::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            Self::Internal(_) => ErrorKind::Internal,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::InvalidCredentials => ErrorKind::Unauthorized,
        }
    }

    /// Expected business outcome, as opposed to a server fault.
    /// Business outcomes are never logged at error level.
    pub fn is_business_outcome(&self) -> bool {
        !matches!(self.kind(), ErrorKind::StoreUnavailable | ErrorKind::Internal)
    }
}

/// Result type for Kindred
pub type KindredResult<T> = Result<T, KindredError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_conflicts_are_not_retryable() {
        let dup = KindredError::DuplicateInteraction {
            from: Uuid::new_v4(),
            to: Uuid::new_v4(),
        };
        assert_eq!(dup.kind(), ErrorKind::Conflict);
        assert!(!dup.kind().is_retryable());

        let sub = KindredError::AlreadySubscribed {
            actor: Uuid::new_v4(),
            capability: Uuid::new_v4(),
        };
        assert_eq!(sub.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_quota_distinguishable_from_conflict() {
        let quota = KindredError::QuotaExceeded { limit: 10 };
        assert_eq!(quota.kind(), ErrorKind::QuotaExceeded);
        assert!(quota.kind().is_retryable());
        assert!(quota.is_business_outcome());
        assert_eq!(quota.to_string(), "daily interaction limit of 10 exceeded");
    }

    #[test]
    fn test_store_unavailable_is_fault() {
        let err = KindredError::StoreUnavailable("pool timed out".into());
        assert!(!err.is_business_outcome());
        assert!(err.kind().is_retryable());
    }

    #[test]
    fn test_internal_is_fault_not_input() {
        let err = KindredError::Internal("failed to sign token".into());
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(!err.is_business_outcome());
        assert!(!err.kind().is_retryable());
        assert_ne!(err.kind(), ErrorKind::InvalidInput);
    }
}
