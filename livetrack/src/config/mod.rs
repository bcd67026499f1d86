//! Simulation configuration.
//!
//! `SimConfig` is the single configuration surface passed to
//! [`SimulationService::start`](crate::service::SimulationService::start).
//! Defaults reproduce the original deployment: ten vehicles wandering the
//! Jabodetabek metropolitan area on a two-second tick.

use std::time::Duration;

use thiserror::Error;

use crate::coord::{BoundingBox, GeoPoint};

/// Default number of simulated trackers.
pub const DEFAULT_TRACKER_COUNT: usize = 10;

/// Default simulation tick interval.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(2000);

/// Default number of points in a synthetic fallback path.
pub const DEFAULT_FALLBACK_PATH_LENGTH: usize = 10;

/// Default step radius for synthetic fallback paths, in kilometres.
pub const DEFAULT_FALLBACK_RADIUS_KM: f64 = 0.05;

/// Default HTTP timeout for directions requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// OpenRouteService driving-car directions endpoint (GeoJSON flavor).
pub const DEFAULT_DIRECTIONS_ENDPOINT: &str =
    "https://api.openrouteservice.org/v2/directions/driving-car/geojson";

/// Jabodetabek (Greater Jakarta) bounding box for random endpoint sampling.
pub fn default_bounding_box() -> BoundingBox {
    BoundingBox::new(-6.4371, 106.6894, -5.9441, 107.0717)
}

/// Central Jakarta, used as the fallback origin when a tracker has no
/// location yet.
pub fn default_origin() -> GeoPoint {
    GeoPoint::new(-6.2607, 106.8107)
}

/// Configuration error raised by [`SimConfig::validate`].
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A numeric setting is out of its accepted range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level simulation configuration.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of trackers to create at startup.
    pub tracker_count: usize,

    /// Wall-clock interval between simulation ticks.
    pub tick_interval: Duration,

    /// Number of points generated for a synthetic fallback path.
    pub fallback_path_length: usize,

    /// Step radius for synthetic fallback paths, in kilometres.
    pub fallback_radius_km: f64,

    /// Bounding box random route endpoints are sampled from.
    pub bounding_box: BoundingBox,

    /// Origin used when a tracker has no last known location.
    pub default_origin: GeoPoint,

    /// Directions API endpoint URL.
    pub directions_endpoint: String,

    /// Routing service credential, sent as the `Authorization` header.
    pub api_key: Option<String>,

    /// HTTP timeout for directions requests.
    pub request_timeout: Duration,

    /// Seed for the simulation RNG. `None` seeds from entropy; set it for
    /// reproducible runs and tests.
    pub rng_seed: Option<u64>,

    /// Optional cap on per-tracker history length.
    ///
    /// The source system keeps history forever; `None` preserves that.
    /// Setting a cap is an explicit, documented deviation for long-running
    /// deployments that would otherwise grow without bound.
    pub history_retention: Option<usize>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tracker_count: DEFAULT_TRACKER_COUNT,
            tick_interval: DEFAULT_TICK_INTERVAL,
            fallback_path_length: DEFAULT_FALLBACK_PATH_LENGTH,
            fallback_radius_km: DEFAULT_FALLBACK_RADIUS_KM,
            bounding_box: default_bounding_box(),
            default_origin: default_origin(),
            directions_endpoint: DEFAULT_DIRECTIONS_ENDPOINT.to_string(),
            api_key: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            rng_seed: None,
            history_retention: None,
        }
    }
}

impl SimConfig {
    /// Set the tracker count.
    pub fn with_tracker_count(mut self, count: usize) -> Self {
        self.tracker_count = count;
        self
    }

    /// Set the tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the fallback path length.
    pub fn with_fallback_path_length(mut self, length: usize) -> Self {
        self.fallback_path_length = length;
        self
    }

    /// Set the fallback step radius in kilometres.
    pub fn with_fallback_radius_km(mut self, radius_km: f64) -> Self {
        self.fallback_radius_km = radius_km;
        self
    }

    /// Set the route endpoint sampling area.
    pub fn with_bounding_box(mut self, bbox: BoundingBox) -> Self {
        self.bounding_box = bbox;
        self
    }

    /// Set the routing service credential.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the directions endpoint URL.
    pub fn with_directions_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.directions_endpoint = endpoint.into();
        self
    }

    /// Set the RNG seed for reproducible runs.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Cap per-tracker history at `max_entries`.
    pub fn with_history_retention(mut self, max_entries: usize) -> Self {
        self.history_retention = Some(max_entries);
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tracker_count == 0 {
            return Err(ConfigError::Invalid("tracker_count must be at least 1".into()));
        }
        if self.fallback_path_length == 0 {
            return Err(ConfigError::Invalid(
                "fallback_path_length must be at least 1".into(),
            ));
        }
        if self.fallback_radius_km <= 0.0 {
            return Err(ConfigError::Invalid(
                "fallback_radius_km must be positive".into(),
            ));
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::Invalid("tick_interval must be non-zero".into()));
        }
        if !self.bounding_box.is_valid() {
            return Err(ConfigError::Invalid("bounding_box is malformed".into()));
        }
        if !self.default_origin.is_valid() {
            return Err(ConfigError::Invalid("default_origin is out of range".into()));
        }
        if let Some(0) = self.history_retention {
            return Err(ConfigError::Invalid(
                "history_retention must be at least 1 when set".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimConfig::default();
        assert_eq!(config.tracker_count, 10);
        assert_eq!(config.tick_interval, Duration::from_millis(2000));
        assert_eq!(config.fallback_path_length, 10);
        assert!((config.fallback_radius_km - 0.05).abs() < 1e-12);
        assert!(config.api_key.is_none());
        assert!(config.history_retention.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_setters() {
        let config = SimConfig::default()
            .with_tracker_count(3)
            .with_tick_interval(Duration::from_millis(10))
            .with_api_key("test-key")
            .with_rng_seed(99)
            .with_history_retention(500);
        assert_eq!(config.tracker_count, 3);
        assert_eq!(config.tick_interval, Duration::from_millis(10));
        assert_eq!(config.api_key.as_deref(), Some("test-key"));
        assert_eq!(config.rng_seed, Some(99));
        assert_eq!(config.history_retention, Some(500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_trackers() {
        let config = SimConfig::default().with_tracker_count(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_path_length() {
        let config = SimConfig::default().with_fallback_path_length(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_bbox() {
        let config =
            SimConfig::default().with_bounding_box(BoundingBox::new(1.0, 1.0, 0.0, 0.0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_retention() {
        let mut config = SimConfig::default();
        config.history_retention = Some(0);
        assert!(config.validate().is_err());
    }
}
