//! edgekb: edge knowledge-base service.
//!
//! Serves the command channel (REQ/REP), consumes telemetry (SUB) and
//! publishes `Runnable`/`Stoppable` transitions (PUSH).

use clap::Parser;
use tracing::{info, warn};

use edgekb_bus::BusConfig;
use edgekb_core::config::{load_dotenv, KbConfig};
use edgekb_service::KbService;

// ── CLI ─────────────────────────────────────────────────────────────

/// Edge knowledge base: decides which plugins should run.
#[derive(Parser, Debug)]
#[command(name = "edgekb", version, about)]
struct Cli {
    /// Path to the bus TOML file. Defaults to `BUS_CONFIG` from the environment.
    #[arg(long, env = "EDGEKB_BUS_CONFIG")]
    bus_config: Option<String>,

    /// Telemetry topic prefix to subscribe to, replacing the configured list.
    #[arg(long, env = "EDGEKB_TELEMETRY_TOPIC")]
    telemetry_topic: Option<String>,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(long)]
    log_filter: Option<String>,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    let cli = Cli::parse();
    let config = KbConfig::from_env();

    let default_filter = cli.log_filter.as_deref().unwrap_or(&config.log_filter);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    config.log_summary();

    let path = cli
        .bus_config
        .unwrap_or_else(|| config.bus_config.display().to_string());
    let mut bus = match BusConfig::from_file(&path) {
        Ok(cfg) => {
            info!(path = %path, "loaded bus config");
            cfg
        }
        Err(e) => {
            warn!(error = %e, path = %path, "failed to load bus config, using local defaults");
            BusConfig::local()
        }
    };
    if let Some(topic) = cli.telemetry_topic {
        bus.telemetry.topics = vec![topic];
    }

    info!("edgekb starting");
    KbService::new(bus, config.queue_capacity).run().await?;
    info!("edgekb exited cleanly");
    Ok(())
}
