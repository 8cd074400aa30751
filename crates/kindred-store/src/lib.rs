//! Kindred Store - Persistence abstraction for the ledger
//!
//! Store pattern:
//! - Read paths are plain async queries against committed state
//! - Every multi-step write goes through a [`Transaction`]
//! - Writes that must not race are conditional and serialized per key
//!   ((actor, day) for quota, (actor, capability) for subscriptions)
//! - Uniqueness failures surface as [`StoreError::UniqueViolation`] tagged with
//!   the [`Constraint`] that fired, so callers translate them into domain conflicts
//!
//! Backends:
//! - [`MemoryStore`] - in-process tables, used by tests and single-node setups
//! - `SqliteStore` - durable backend behind the `sqlite` feature

#![warn(missing_docs)]

pub mod error;
pub mod memory;
pub mod ports;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod tx;

pub use error::{Constraint, StoreError, StoreResult};
pub use memory::MemoryStore;
pub use ports::{ActorRecord, Store, Transaction};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteSettings, SqliteStore};
pub use tx::settle;
