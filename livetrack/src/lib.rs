//! LiveTrack - fleet tracking simulation engine
//!
//! Simulates a fleet of moving trackers: paths come from an external
//! directions API (with a synthetic fallback), a fixed tick advances every
//! tracker one path step, and each position change is published to
//! subscribers while per-tracker history accumulates.
//!
//! Transport layers (HTTP/WebSocket servers, UIs) are thin adapters around
//! two surfaces:
//!
//! - [`service::SimulationService`] - startup, queries, shutdown
//! - [`broadcast::BroadcastSink`] / [`service::SimulationService::subscribe`]
//!   - push delivery of location updates

pub mod broadcast;
pub mod config;
pub mod coord;
pub mod model;
pub mod route;
pub mod service;
pub mod sim;
pub mod store;

/// Crate version, from Cargo metadata.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use broadcast::{BroadcastSink, ChannelBroadcaster};
pub use config::SimConfig;
pub use coord::{BoundingBox, GeoPoint};
pub use model::{LocationData, StateSnapshot, Tracker, TrackerPath};
pub use service::{ServiceError, SimulationService};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
