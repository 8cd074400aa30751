//! Kindred Common - Shared types for the entitlement and interaction ledger
//!
//! This crate provides the vocabulary every other Kindred crate speaks:
//! - Domain model (actors, capabilities, grants, interactions)
//! - Error taxonomy shared across the ledger and the activator
//! - Calendar-day windows and subscription period arithmetic
//! - Clock abstraction so "now" can be pinned in tests
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         KINDRED LEDGER CORE                             │
//! │                                                                         │
//! │  ┌──────────────┐   ┌──────────────────┐   ┌────────────────────────┐  │
//! │  │ Entitlement  │──►│   Interaction    │   │     Subscription       │  │
//! │  │  Resolver    │   │     Ledger       │   │      Activator         │  │
//! │  └──────┬───────┘   └────────┬─────────┘   └───────────┬────────────┘  │
//! │         │                    │                         │               │
//! │  ┌──────▼────────────────────▼─────────────────────────▼────────────┐  │
//! │  │              STORE (transactional, per-key serialized)            │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │        COMMON: model | errors | clock | day windows | periods     │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod model;
pub mod time;

pub use error::*;
pub use model::*;
pub use time::{start_of_day, usage_day, Clock, ManualClock, SubscriptionPeriod, SystemClock};
