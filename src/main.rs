//! replset-bootstrap: one-shot replica set initialization.
//!
//! Waits for the three members to answer, initiates the set unless it is
//! already healthy, and polls until it reports a healthy status.  Exits 0
//! on success (including "already initialized"), 1 on any failure.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};

use replset_bootstrap::admin::mongo::MongoAdmin;
use replset_bootstrap::admin::simulated::SimulatedCluster;
use replset_bootstrap::admin::AdminClient;
use replset_bootstrap::config::{load_config, Config, LoggingConfig};
use replset_bootstrap::report::{render_outcome, unsettled_members};
use replset_bootstrap::{exit_code, BootstrapOutcome, Bootstrapper};

/// Which admin API implementation to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// Real nodes through the MongoDB driver.
    Mongo,
    /// In-process simulated replica set (rehearsal, no network).
    Simulated,
}

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "replset-bootstrap",
    version,
    about = "Initialize a three-member MongoDB replica set"
)]
struct Cli {
    /// Path to a YAML configuration file.  Built-in defaults apply when omitted.
    #[arg(short, long)]
    config: Option<String>,

    /// Override the host that receives status and initiate commands.
    #[arg(long)]
    seed: Option<String>,

    /// Admin API backend.
    #[arg(long, value_enum, default_value_t = Backend::Mongo)]
    backend: Backend,

    /// Override the log format (text or json).
    #[arg(long)]
    log_format: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let config = match load(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging);

    let admin: Arc<dyn AdminClient> = match cli.backend {
        Backend::Mongo => {
            let mongo = MongoAdmin::new(config.seed_host(), config.connection.clone());
            info!("Using MongoDB backend (seed {})", mongo.seed());
            Arc::new(mongo)
        }
        Backend::Simulated => {
            info!("Using simulated replica set backend");
            Arc::new(SimulatedCluster::rehearsal(&config.cluster))
        }
    };

    let result = Bootstrapper::new(admin, config.plan()).run().await;
    match &result {
        Ok(outcome) => {
            let status = match outcome {
                BootstrapOutcome::AlreadyInitialized(status) => status,
                BootstrapOutcome::Initialized(info) => &info.status,
            };
            for member in unsettled_members(status) {
                warn!("{} is in state {}", member.name, member.state_str);
            }
            print!("{}", render_outcome(outcome));
        }
        Err(err) => {
            error!(code = err.code(), "Bootstrap failed: {err}");
        }
    }
    std::process::exit(exit_code(&result));
}

/// Load the configuration file (or defaults) and apply CLI overrides.
fn load(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    if let Some(seed) = &cli.seed {
        config.seed = Some(seed.clone());
    }
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }
    config.check()?;
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
