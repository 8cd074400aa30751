//! Kindred Ledger - Interaction recording under a daily quota
//!
//! # Flow
//!
//! ```text
//! record(from, to, kind, &CapabilitySet)
//!   │
//!   ├─ from == to ──────────────────────────────► InvalidInput
//!   │
//!   ├─ BEGIN
//!   │    ├─ increment usage(from, today) ≤ ceiling ─ denied ─► QuotaExceeded
//!   │    ├─ insert interaction(from, to) ─────────── taken ──► DuplicateInteraction
//!   │    └─ COMMIT (or ROLLBACK on any failure)
//!   │
//!   └─► Interaction
//! ```
//!
//! The ceiling is absent when the snapshot holds the unlimited capability, but
//! the counter is still bumped so usage stays observable.

#![warn(missing_docs)]

pub mod ledger;

pub use ledger::{InteractionLedger, LedgerSettings, UsageSnapshot};
