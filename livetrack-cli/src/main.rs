//! LiveTrack CLI - run the fleet simulation from a terminal.
//!
//! Starts the simulation engine, prints the initial state, and streams every
//! location update to stdout (as log lines or JSON) until Ctrl+C.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use livetrack::config::SimConfig;
use livetrack::service::SimulationService;

#[derive(Debug, Parser)]
#[command(name = "livetrack", version, about = "Simulated vehicle fleet with live location broadcasting")]
struct Cli {
    /// Number of simulated trackers
    #[arg(long, default_value_t = 10)]
    trackers: usize,

    /// Milliseconds between simulation ticks
    #[arg(long, value_name = "MS", default_value_t = 2000)]
    interval_ms: u64,

    /// OpenRouteService API key; without it every request fails and the
    /// simulation runs on synthetic paths
    #[arg(long, env = "ORS_API_KEY")]
    api_key: Option<String>,

    /// Seed the simulation RNG for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Cap per-tracker history at this many entries
    #[arg(long, value_name = "N")]
    history_retention: Option<usize>,

    /// Emit location updates as JSON lines instead of log lines
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn into_config(self) -> SimConfig {
        let mut config = SimConfig::default()
            .with_tracker_count(self.trackers)
            .with_tick_interval(Duration::from_millis(self.interval_ms));
        if let Some(key) = self.api_key {
            config = config.with_api_key(key);
        }
        if let Some(seed) = self.seed {
            config = config.with_rng_seed(seed);
        }
        if let Some(cap) = self.history_retention {
            config = config.with_history_retention(cap);
        }
        config
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let json_output = cli.json;
    let config = cli.into_config();

    if config.api_key.is_none() {
        info!("no API key configured, routes will fall back to synthetic paths");
    }

    let service = match SimulationService::start(config).await {
        Ok(service) => service,
        Err(e) => {
            error!(error = %e, "failed to start simulation");
            return ExitCode::FAILURE;
        }
    };

    for tracker in service.all_trackers() {
        info!(id = %tracker.id, name = %tracker.name, color = %tracker.color, "tracker registered");
    }

    let mut updates = service.subscribe();
    let stream_task = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) => {
                    if json_output {
                        match serde_json::to_string(&update) {
                            Ok(line) => println!("{}", line),
                            Err(e) => error!(error = %e, "failed to serialize update"),
                        }
                    } else {
                        info!(
                            tracker_id = %update.tracker_id,
                            lat = update.lat,
                            lng = update.lng,
                            timestamp = update.timestamp_ms,
                            "location update"
                        );
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    info!(skipped, "output fell behind, skipping updates");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }

    info!("shutdown signal received");
    service.shutdown().await;
    stream_task.abort();

    ExitCode::SUCCESS
}
