//! Kindred CLI
//!
//! ```bash
//! kindred --config kindred.toml migrate
//! kindred seed --count 1000
//! kindred capabilities
//! ```

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use kindred::seed::{self, SeedOptions};
use kindred::{open_store, Argon2Verifier, KindredConfig, StoreConfig};
use kindred_common::SystemClock;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kindred")]
#[command(version)]
#[command(about = "Kindred ledger administration", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, short, env = "KINDRED_CONFIG", default_value = "kindred.toml")]
    config: PathBuf,

    /// Database URL, overriding the file
    #[arg(long, env = "KINDRED_DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create tables and indexes
    Migrate,
    /// Register the catalog and a demo population
    Seed {
        /// Actors to create
        #[arg(long, default_value_t = 1000)]
        count: usize,
        /// Responses per actor
        #[arg(long, default_value_t = 20)]
        responses: usize,
    },
    /// Print the capability catalog
    Capabilities,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kindred::telemetry::init("info")?;

    let cli = Cli::parse();
    let mut config = KindredConfig::load(Some(&cli.config))
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(url) = cli.database_url {
        config.apply_overrides(|key| (key == "KINDRED_DATABASE_URL").then(|| url.clone()))?;
    }
    if config.store == StoreConfig::Memory {
        bail!("no database configured; set KINDRED_DATABASE_URL or [store] in the config file");
    }

    let store = open_store(&config.store).await.context("opening store")?;

    match cli.command {
        Commands::Migrate => {
            tracing::info!("schema is up to date");
        }
        Commands::Seed { count, responses } => {
            let report = seed::seed(
                store.as_ref(),
                &SystemClock,
                &Argon2Verifier,
                SeedOptions {
                    actors: count,
                    responses_per_actor: responses,
                },
            )
            .await?;
            println!(
                "seeded {} capabilities, {} actors, {} interactions",
                report.capabilities, report.actors, report.interactions
            );
        }
        Commands::Capabilities => {
            for capability in store.capabilities().await? {
                println!("{}\t{}\t{}", capability.id, capability.name, capability.description);
            }
        }
    }

    Ok(())
}
