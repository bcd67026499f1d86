//! The simulation tick scheduler.
//!
//! Drives forward motion for every tracker on a fixed wall-clock interval.
//! Each tick advances every tracker by one path step, regenerating paths on
//! exhaustion, and publishes the resulting location through the broadcast
//! sink.
//!
//! # Tick semantics
//!
//! - Ticks never overlap: per-tracker work is joined before the next tick is
//!   awaited. A tick that triggers slow path regeneration simply runs long;
//!   there is no hard deadline.
//! - Path regeneration belongs to the tick that triggered it: the new path
//!   and the location derived from it are published within that tick.
//! - Per-tracker work is isolated; one tracker's failure to regenerate never
//!   blocks the rest of the fleet.
//!
//! # Example
//!
//! ```ignore
//! use livetrack::sim::{SimulationScheduler, SchedulerConfig};
//!
//! let scheduler = SimulationScheduler::new(store, provider, sink, config, None);
//! let shutdown = CancellationToken::new();
//! tokio::spawn(async move { scheduler.run(shutdown).await });
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::broadcast::BroadcastSink;
use crate::config::SimConfig;
use crate::coord::GeoPoint;
use crate::model::LocationData;
use crate::route::RouteProvider;
use crate::store::{PathUpdate, StateStore};

/// Span of the jitter applied when a path yields no point, in degrees.
/// A location is displaced by up to ±half this span on each axis.
pub const DEFAULT_JITTER_SPAN_DEG: f64 = 0.005;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Wall-clock interval between ticks.
    pub tick_interval: Duration,
    /// Jitter span for the corrupt-path fallback, in degrees.
    pub jitter_span_deg: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(2000),
            jitter_span_deg: DEFAULT_JITTER_SPAN_DEG,
        }
    }
}

impl From<&SimConfig> for SchedulerConfig {
    fn from(config: &SimConfig) -> Self {
        Self {
            tick_interval: config.tick_interval,
            jitter_span_deg: DEFAULT_JITTER_SPAN_DEG,
        }
    }
}

/// Advances every tracker one path step per tick.
pub struct SimulationScheduler {
    store: Arc<StateStore>,
    provider: Arc<RouteProvider>,
    sink: Arc<dyn BroadcastSink>,
    config: SchedulerConfig,
    rng: Mutex<StdRng>,
}

impl SimulationScheduler {
    /// Create a scheduler.
    ///
    /// The broadcast sink is injected here rather than assigned later;
    /// there is no unwired state.
    pub fn new(
        store: Arc<StateStore>,
        provider: Arc<RouteProvider>,
        sink: Arc<dyn BroadcastSink>,
        config: SchedulerConfig,
        rng_seed: Option<u64>,
    ) -> Self {
        let rng = match rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            store,
            provider,
            sink,
            config,
            rng: Mutex::new(rng),
        }
    }

    /// Run ticks until shutdown is signalled.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            trackers = self.store.tracker_count(),
            interval_ms = self.config.tick_interval.as_millis() as u64,
            "simulation scheduler starting"
        );

        let mut interval = tokio::time::interval(self.config.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a tokio interval completes immediately; consume
        // it so the first advancement lands one full interval after seeding.
        interval.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("simulation scheduler shutting down");
                    break;
                }

                _ = interval.tick() => {
                    self.tick_once().await;
                }
            }
        }
    }

    /// Execute one full tick: advance every tracker, concurrently, and wait
    /// for all of them before returning.
    pub async fn tick_once(&self) {
        let start = Instant::now();
        let ids = self.store.tracker_ids();
        join_all(ids.iter().map(|id| self.advance_tracker(id))).await;
        debug!(
            trackers = ids.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "tick complete"
        );
    }

    /// Advance one tracker by one path step.
    ///
    /// Absorbs every failure mode internally: path exhaustion regenerates,
    /// a missing point jitters around the last known location. The tick
    /// never fails on behalf of a single tracker.
    async fn advance_tracker(&self, tracker_id: &str) {
        let Some(plan) = self.store.plan_advance(tracker_id) else {
            return;
        };

        let (path_update, point) = if plan.exhausted {
            let new_path = self
                .provider
                .generate_path(tracker_id, Some(plan.last_location.position()))
                .await;
            let first = new_path.points.first().copied();
            (PathUpdate::Replace(new_path), first)
        } else {
            (PathUpdate::Advance(plan.next_index), plan.point_at_next)
        };

        let point = match point {
            Some(point) => point,
            None => {
                warn!(
                    tracker_id = %tracker_id,
                    "path yielded no point, jittering around last location"
                );
                self.jitter_around(plan.last_location.position())
            }
        };

        let location =
            LocationData::at_point(tracker_id, point, Utc::now().timestamp_millis());
        self.store
            .apply_update(tracker_id, path_update, location.clone());
        self.sink.on_location_update(&location);
    }

    /// A small random displacement around `origin`.
    fn jitter_around(&self, origin: GeoPoint) -> GeoPoint {
        let mut rng = self.rng.lock();
        let span = self.config.jitter_span_deg;
        GeoPoint::new(
            origin.lat + (rng.random_range(0.0..1.0) - 0.5) * span,
            origin.lng + (rng.random_range(0.0..1.0) - 0.5) * span,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LocationData, Tracker, TrackerPath};
    use crate::route::{
        MockRouteClient, OrsDirectionsApi, RouteError, RouteHttpClient, RouteProviderConfig,
    };
    use crate::store::SeedRecord;

    /// Sink that records every published update.
    struct CollectingSink {
        updates: Mutex<Vec<LocationData>>,
    }

    impl CollectingSink {
        fn new() -> Self {
            Self {
                updates: Mutex::new(Vec::new()),
            }
        }

        fn updates(&self) -> Vec<LocationData> {
            self.updates.lock().clone()
        }
    }

    impl BroadcastSink for CollectingSink {
        fn on_location_update(&self, location: &LocationData) {
            self.updates.lock().push(location.clone());
        }
    }

    fn seed(id: &str, points: Vec<GeoPoint>) -> SeedRecord {
        let path = TrackerPath::new(points, None, None);
        let first = path.points.first().copied().unwrap_or(GeoPoint::new(0.0, 0.0));
        SeedRecord {
            tracker: Tracker::new(id, "Vehicle", "#00FF00"),
            location: LocationData::at_point(id, first, 0),
            path,
        }
    }

    fn route_body(coordinates: &[[f64; 2]]) -> Vec<u8> {
        serde_json::json!({
            "features": [{
                "geometry": {"coordinates": coordinates},
                "properties": {},
            }]
        })
        .to_string()
        .into_bytes()
    }

    fn provider(client: MockRouteClient) -> Arc<RouteProvider> {
        let client: Arc<dyn RouteHttpClient> = Arc::new(client);
        Arc::new(RouteProvider::new(
            client,
            OrsDirectionsApi::new("http://ors.test", None),
            RouteProviderConfig::from(&SimConfig::default()),
            Some(1),
        ))
    }

    fn scheduler(
        seeds: Vec<SeedRecord>,
        client: MockRouteClient,
    ) -> (Arc<StateStore>, Arc<CollectingSink>, SimulationScheduler) {
        let store = Arc::new(StateStore::new(seeds, None));
        let sink = Arc::new(CollectingSink::new());
        let scheduler = SimulationScheduler::new(
            Arc::clone(&store),
            provider(client),
            Arc::clone(&sink) as Arc<dyn BroadcastSink>,
            SchedulerConfig::default(),
            Some(2),
        );
        (store, sink, scheduler)
    }

    fn two_points() -> Vec<GeoPoint> {
        vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.1, 0.1)]
    }

    #[tokio::test]
    async fn test_tick_advances_cursor_and_publishes() {
        let (store, sink, scheduler) =
            scheduler(vec![seed("tracker-1", two_points())], MockRouteClient::always(
                Err(RouteError::NotFound),
            ));

        scheduler.tick_once().await;

        assert_eq!(store.path_progress("tracker-1"), Some((1, 2)));
        let location = store.last_location("tracker-1").unwrap();
        assert_eq!(location.position(), GeoPoint::new(0.1, 0.1));
        assert_eq!(store.history("tracker-1").len(), 2);

        let updates = sink.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].tracker_id, "tracker-1");
    }

    #[tokio::test]
    async fn test_exhaustion_regenerates_within_same_tick() {
        // 2-point path: tick 1 moves to index 1, tick 2 exhausts and must
        // publish a point from the replacement path
        let body = route_body(&[[106.8, -6.2], [106.81, -6.21]]);
        let (store, sink, scheduler) =
            scheduler(vec![seed("tracker-1", two_points())], MockRouteClient::always(Ok(body)));

        scheduler.tick_once().await;
        assert_eq!(store.path_progress("tracker-1"), Some((1, 2)));

        scheduler.tick_once().await;
        assert_eq!(store.path_progress("tracker-1"), Some((0, 2)));
        let location = store.last_location("tracker-1").unwrap();
        assert_eq!(location.position(), GeoPoint::new(-6.2, 106.8));
        assert_eq!(sink.updates().len(), 2);
    }

    #[tokio::test]
    async fn test_exhaustion_with_failing_routes_uses_fallback() {
        let (store, _sink, scheduler) = scheduler(
            vec![seed("tracker-1", vec![GeoPoint::new(-6.2, 106.8)])],
            MockRouteClient::always(Err(RouteError::NotFound)),
        );

        // Single-point path is exhausted on the first advancement
        scheduler.tick_once().await;

        let (index, len) = store.path_progress("tracker-1").unwrap();
        assert_eq!(index, 0);
        assert_eq!(len, 10, "fallback path should have the configured length");
        assert!(index < len);
        assert_eq!(store.history("tracker-1").len(), 2);
    }

    #[tokio::test]
    async fn test_empty_replacement_path_jitters_around_last_location() {
        // A provider config with zero fallback length produces an empty
        // synthetic path; the scheduler must jitter rather than fail.
        let client: Arc<dyn RouteHttpClient> =
            Arc::new(MockRouteClient::always(Err(RouteError::Status(500))));
        let mut provider_config = RouteProviderConfig::from(&SimConfig::default());
        provider_config.fallback_path_length = 0;
        let provider = Arc::new(RouteProvider::new(
            client,
            OrsDirectionsApi::new("http://ors.test", None),
            provider_config,
            Some(3),
        ));

        let store = Arc::new(StateStore::new(
            vec![seed("tracker-1", vec![GeoPoint::new(-6.2, 106.8)])],
            None,
        ));
        let sink = Arc::new(CollectingSink::new());
        let scheduler = SimulationScheduler::new(
            Arc::clone(&store),
            provider,
            Arc::clone(&sink) as Arc<dyn BroadcastSink>,
            SchedulerConfig::default(),
            Some(4),
        );

        scheduler.tick_once().await;

        let location = store.last_location("tracker-1").unwrap();
        let origin = GeoPoint::new(-6.2, 106.8);
        assert!((location.lat - origin.lat).abs() <= DEFAULT_JITTER_SPAN_DEG / 2.0 + 1e-12);
        assert!((location.lng - origin.lng).abs() <= DEFAULT_JITTER_SPAN_DEG / 2.0 + 1e-12);
        assert_eq!(sink.updates().len(), 1, "the tick must still publish");
    }

    #[tokio::test]
    async fn test_trackers_advance_independently() {
        let (store, sink, scheduler) = scheduler(
            vec![
                // Exhausts immediately, forcing a (failing) regeneration
                seed("tracker-1", vec![GeoPoint::new(-6.2, 106.8)]),
                // Plenty of path left
                seed("tracker-2", two_points()),
            ],
            MockRouteClient::always(Err(RouteError::Network("down".into()))),
        );

        scheduler.tick_once().await;

        // tracker-2 advanced normally despite tracker-1's failed regeneration
        assert_eq!(store.path_progress("tracker-2"), Some((1, 2)));
        assert_eq!(store.history("tracker-1").len(), 2);
        assert_eq!(store.history("tracker-2").len(), 2);
        assert_eq!(sink.updates().len(), 2);
    }

    #[tokio::test]
    async fn test_index_invariant_holds_across_many_ticks() {
        let (store, _sink, scheduler) = scheduler(
            vec![seed("tracker-1", two_points())],
            MockRouteClient::always(Err(RouteError::NotFound)),
        );

        for _ in 0..25 {
            scheduler.tick_once().await;
            let (index, len) = store.path_progress("tracker-1").unwrap();
            assert!(index < len, "cursor {} escaped path of length {}", index, len);
        }
    }

    #[tokio::test]
    async fn test_history_timestamps_non_decreasing() {
        let (store, _sink, scheduler) = scheduler(
            vec![seed("tracker-1", two_points())],
            MockRouteClient::always(Err(RouteError::NotFound)),
        );

        for _ in 0..5 {
            scheduler.tick_once().await;
        }

        let history = store.history("tracker-1");
        assert_eq!(history.len(), 6);
        for pair in history.windows(2) {
            assert!(pair[0].timestamp_ms <= pair[1].timestamp_ms);
        }
    }

    #[tokio::test]
    async fn test_run_stops_on_cancellation() {
        let (_store, _sink, scheduler) = scheduler(
            vec![seed("tracker-1", two_points())],
            MockRouteClient::always(Err(RouteError::NotFound)),
        );

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        // Must return promptly instead of ticking forever
        tokio::time::timeout(Duration::from_secs(1), scheduler.run(shutdown))
            .await
            .expect("run did not observe cancellation");
    }
}
