//! Kindred Entitlements
//!
//! Who may do what, and since when.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         ENTITLEMENTS                                    │
//! │                                                                         │
//! │  ┌──────────────┐   ┌──────────────────────┐   ┌────────────────────┐  │
//! │  │   Catalog    │   │ EntitlementResolver  │   │SubscriptionActivator│ │
//! │  │ list/get/    │   │ resolve(actor, at)   │   │ activate / revoke  │  │
//! │  │ register     │   │   -> CapabilitySet   │   │                    │  │
//! │  └──────┬───────┘   └──────────┬───────────┘   └─────────┬──────────┘  │
//! │         │                      │                         │             │
//! │  ┌──────▼──────────────────────▼─────────────────────────▼──────────┐  │
//! │  │   Store: capabilities | capability_grants (one open grant per     │  │
//! │  │          (actor, capability), enforced inside the write)          │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod activator;
pub mod catalog;
pub mod resolver;

pub use activator::SubscriptionActivator;
pub use catalog::Catalog;
pub use resolver::{CapabilitySet, EntitlementResolver};
