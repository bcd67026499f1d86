//! Service orchestrator for the tracking simulation.
//!
//! `SimulationService` coordinates startup, operation, and shutdown of the
//! engine:
//!
//! 1. Builds the tracker registry
//! 2. Seeds every tracker with an initial path and location via the route
//!    provider
//! 3. Spawns the tick scheduler
//! 4. Exposes the query surface (trackers, snapshot, history) and the
//!    broadcast subscription used by transport adapters
//!
//! # Example
//!
//! ```ignore
//! use livetrack::config::SimConfig;
//! use livetrack::service::SimulationService;
//!
//! let service = SimulationService::start(SimConfig::default()).await?;
//!
//! // Feed a newly joined subscriber
//! let snapshot = service.initial_state();
//! let mut updates = service.subscribe();
//!
//! // Graceful shutdown
//! service.shutdown().await;
//! ```

use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::broadcast::{BroadcastSink, ChannelBroadcaster};
use crate::config::{ConfigError, SimConfig};
use crate::model::{build_registry, LocationData, StateSnapshot, Tracker};
use crate::route::{
    OrsDirectionsApi, ReqwestRouteClient, RouteError, RouteHttpClient, RouteProvider,
    RouteProviderConfig,
};
use crate::sim::{SchedulerConfig, SimulationScheduler};
use crate::store::{SeedRecord, StateStore};

/// Errors that can occur during service startup.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The configuration failed validation.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] RouteError),
}

/// Coordinates the simulation engine for the lifetime of the process.
pub struct SimulationService {
    store: Arc<StateStore>,
    broadcaster: Arc<ChannelBroadcaster>,
    cancellation: CancellationToken,
    scheduler_task: JoinHandle<()>,
}

impl SimulationService {
    /// Start the service with a real HTTP client.
    pub async fn start(config: SimConfig) -> Result<Self, ServiceError> {
        config.validate()?;
        let client: Arc<dyn RouteHttpClient> =
            Arc::new(ReqwestRouteClient::with_timeout(config.request_timeout)?);
        Self::start_with_client(config, client).await
    }

    /// Start the service with an injected HTTP client.
    ///
    /// Transport adapters and tests use this to substitute the routing
    /// dependency.
    pub async fn start_with_client(
        config: SimConfig,
        client: Arc<dyn RouteHttpClient>,
    ) -> Result<Self, ServiceError> {
        config.validate()?;

        let api = OrsDirectionsApi::new(config.directions_endpoint.clone(), config.api_key.clone());
        let provider = Arc::new(RouteProvider::new(
            client,
            api,
            RouteProviderConfig::from(&config),
            config.rng_seed,
        ));

        let mut registry_rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let registry = build_registry(config.tracker_count, &mut registry_rng);

        // Seed every tracker: one initial path, location at its first point,
        // history of exactly that location.
        let mut seeds = Vec::with_capacity(registry.len());
        for tracker in registry {
            let path = provider.generate_path(&tracker.id, None).await;
            let point = path.current_point().unwrap_or(config.default_origin);
            let location =
                LocationData::at_point(tracker.id.as_str(), point, Utc::now().timestamp_millis());
            seeds.push(SeedRecord {
                tracker,
                path,
                location,
            });
        }

        let store = Arc::new(StateStore::new(seeds, config.history_retention));
        let broadcaster = Arc::new(ChannelBroadcaster::new());

        let scheduler = SimulationScheduler::new(
            Arc::clone(&store),
            provider,
            Arc::clone(&broadcaster) as Arc<dyn BroadcastSink>,
            SchedulerConfig::from(&config),
            config.rng_seed,
        );

        let cancellation = CancellationToken::new();
        let shutdown = cancellation.clone();
        let scheduler_task = tokio::spawn(async move {
            scheduler.run(shutdown).await;
        });

        info!(
            trackers = store.tracker_count(),
            interval_ms = config.tick_interval.as_millis() as u64,
            "simulation service started"
        );

        Ok(Self {
            store,
            broadcaster,
            cancellation,
            scheduler_task,
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Query surface for transport adapters
    // ─────────────────────────────────────────────────────────────────────

    /// All registered trackers.
    pub fn all_trackers(&self) -> Vec<Tracker> {
        self.store.all_trackers()
    }

    /// Full state snapshot for a newly joined subscriber.
    pub fn initial_state(&self) -> StateSnapshot {
        self.store.snapshot_all()
    }

    /// Location history for a tracker; empty for unknown ids.
    pub fn history(&self, tracker_id: &str) -> Vec<LocationData> {
        self.store.history(tracker_id)
    }

    /// Subscribe to future location updates.
    pub fn subscribe(&self) -> broadcast::Receiver<LocationData> {
        self.broadcaster.subscribe()
    }

    /// The underlying state store, for adapters that need direct reads.
    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// The cancellation token, for coordinating shutdown externally.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Shutdown
    // ─────────────────────────────────────────────────────────────────────

    /// Gracefully stop the scheduler and wait for the in-flight tick.
    pub async fn shutdown(self) {
        info!("shutting down simulation service");
        self.cancellation.cancel();
        let _ = self.scheduler_task.await;
        info!("simulation service stopped");
    }
}
