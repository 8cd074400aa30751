//! Logging bootstrap

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber: `RUST_LOG` filter (falling back to
/// `default_filter`) and the fmt layer. Fails if a subscriber is already set.
pub fn init(default_filter: &str) -> Result<(), TryInitError> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into());

    tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
}
