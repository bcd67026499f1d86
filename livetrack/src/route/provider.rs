//! Path acquisition with retry and synthetic fallback.
//!
//! [`RouteProvider::generate_path`] is the sole place routing failures are
//! absorbed: it always hands back a usable path, falling back to a locally
//! generated random walk when the directions API cannot deliver one.
//!
//! # Retry policy
//!
//! Up to three attempts, each with a freshly sampled coordinate pair. Only a
//! "not found" response earns another attempt; any other failure aborts the
//! loop immediately. This asymmetry matches the upstream service's observed
//! behavior and is deliberate.

use std::f64::consts::TAU;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use super::http::RouteHttpClient;
use super::ors::OrsDirectionsApi;
use crate::config::SimConfig;
use crate::coord::{BoundingBox, GeoPoint, KM_PER_DEGREE};
use crate::model::TrackerPath;

/// Retry budget for directions requests.
pub const MAX_ROUTE_ATTEMPTS: u32 = 3;

/// Configuration for path generation.
#[derive(Debug, Clone)]
pub struct RouteProviderConfig {
    /// Maximum directions attempts before falling back.
    pub max_attempts: u32,
    /// Area random route endpoints are sampled from.
    pub bounding_box: BoundingBox,
    /// Fallback origin when no location hint is available.
    pub default_origin: GeoPoint,
    /// Number of points in a synthetic fallback path.
    pub fallback_path_length: usize,
    /// Step radius for synthetic paths, in kilometres.
    pub fallback_radius_km: f64,
}

impl From<&SimConfig> for RouteProviderConfig {
    fn from(config: &SimConfig) -> Self {
        Self {
            max_attempts: MAX_ROUTE_ATTEMPTS,
            bounding_box: config.bounding_box,
            default_origin: config.default_origin,
            fallback_path_length: config.fallback_path_length,
            fallback_radius_km: config.fallback_radius_km,
        }
    }
}

/// Generates tracker paths via the directions API, with fallback.
pub struct RouteProvider {
    client: Arc<dyn RouteHttpClient>,
    api: OrsDirectionsApi,
    config: RouteProviderConfig,
    rng: Mutex<StdRng>,
}

impl RouteProvider {
    /// Create a provider.
    ///
    /// `rng_seed` makes endpoint sampling and fallback generation
    /// deterministic; `None` seeds from entropy.
    pub fn new(
        client: Arc<dyn RouteHttpClient>,
        api: OrsDirectionsApi,
        config: RouteProviderConfig,
        rng_seed: Option<u64>,
    ) -> Self {
        let rng = match rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            client,
            api,
            config,
            rng: Mutex::new(rng),
        }
    }

    /// Generate a path for a tracker. Never fails.
    ///
    /// `current_location_hint` seeds the synthetic fallback so a tracker
    /// keeps wandering from where it is rather than teleporting to the
    /// default origin.
    pub async fn generate_path(
        &self,
        tracker_id: &str,
        current_location_hint: Option<GeoPoint>,
    ) -> TrackerPath {
        for attempt in 1..=self.config.max_attempts {
            let (origin, destination) = {
                let mut rng = self.rng.lock();
                (
                    self.config.bounding_box.random_point(&mut *rng),
                    self.config.bounding_box.random_point(&mut *rng),
                )
            };

            match self
                .api
                .fetch_route(self.client.as_ref(), origin, destination)
                .await
            {
                Ok(route) => {
                    debug!(
                        tracker_id = %tracker_id,
                        points = route.points.len(),
                        distance_m = ?route.distance_meters,
                        "route generated"
                    );
                    return TrackerPath::new(
                        route.points,
                        route.distance_meters,
                        route.duration_seconds,
                    );
                }
                Err(error) => {
                    warn!(
                        tracker_id = %tracker_id,
                        attempt,
                        origin_lat = origin.lat,
                        origin_lng = origin.lng,
                        destination_lat = destination.lat,
                        destination_lng = destination.lng,
                        error = %error,
                        "directions request failed"
                    );
                    if !error.is_retryable() {
                        break;
                    }
                }
            }
        }

        warn!(
            tracker_id = %tracker_id,
            "route generation exhausted, falling back to synthetic path"
        );
        self.synthetic_path(current_location_hint)
    }

    /// Build a random-walk path starting from the hint or the default
    /// origin.
    ///
    /// Each step picks a uniform heading and a bounded step length; the
    /// longitude component is latitude-corrected so the walk covers similar
    /// ground distance in every direction.
    fn synthetic_path(&self, hint: Option<GeoPoint>) -> TrackerPath {
        let mut rng = self.rng.lock();
        let mut last = hint.unwrap_or(self.config.default_origin);
        let mut points = Vec::with_capacity(self.config.fallback_path_length);

        for _ in 0..self.config.fallback_path_length {
            let heading = rng.random_range(0.0..TAU);
            let distance_deg =
                rng.random_range(0.0..self.config.fallback_radius_km) / KM_PER_DEGREE;
            let next = last.offset(heading, distance_deg);
            points.push(next);
            last = next;
        }

        TrackerPath::new(points, None, None)
    }
}
