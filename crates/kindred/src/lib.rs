//! Kindred - entitlement-gated interaction service
//!
//! Hexagonal layout:
//! - `service` - [`MatchService`], the façade a routing layer calls
//! - `auth` - credential hashing and session tokens
//! - `config` - [`KindredConfig`] from TOML and `KINDRED_*` variables
//! - `seed` - demo catalog and population
//! - `telemetry` - tracing subscriber bootstrap
//!
//! ```text
//!   routing layer ──► MatchService ──► EntitlementResolver ──┐
//!                          │                                 ▼
//!                          ├──────────► InteractionLedger ─► Store
//!                          └──────────► SubscriptionActivator ┘
//! ```

#![warn(missing_docs)]

pub mod auth;
pub mod config;
pub mod seed;
pub mod service;
pub mod telemetry;

pub use auth::{Argon2Verifier, Claims, CredentialVerifier, SessionIssuer, SessionToken};
pub use config::{ConfigError, KindredConfig, SessionConfig, StoreConfig};
pub use service::{open_store, MatchService};

pub use kindred_common::{KindredError, KindredResult};
