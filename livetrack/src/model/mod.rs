//! Domain model for the tracking simulation.
//!
//! These are the types that cross the boundary to transport adapters:
//! tracker identities, location updates, paths, and full-state snapshots.
//! Serde renames keep the wire format camelCase so existing map clients can
//! consume the payloads unchanged.
//!
//! # Lifecycle
//!
//! - [`Tracker`]s are created once at startup and never deleted.
//! - [`LocationData`] is replaced every tick; the per-tracker history is
//!   append-only.
//! - [`TrackerPath`]s are replaced whenever the cursor runs off the end.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::coord::GeoPoint;

/// A simulated moving entity with stable identity.
///
/// Immutable after creation; identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracker {
    /// Stable identifier, e.g. `tracker-3`.
    pub id: String,
    /// Display name shown on the map.
    pub name: String,
    /// Hex color (`#RRGGBB`) used to render the tracker.
    pub color: String,
}

impl Tracker {
    /// Create a tracker.
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
        }
    }
}

/// Generate a random `#RRGGBB` hex color.
pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("#{:06X}", rng.random_range(0..0x100_0000u32))
}

/// Build the fixed tracker registry created at startup.
///
/// Ids are `tracker-1..=count`, names `Vehicle {i}`, colors random.
pub fn build_registry<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<Tracker> {
    (1..=count)
        .map(|i| Tracker::new(format!("tracker-{}", i), format!("Vehicle {}", i), random_color(rng)))
        .collect()
}

/// A single position report for a tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationData {
    /// Owning tracker id.
    pub tracker_id: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
    /// Unix timestamp in milliseconds.
    #[serde(rename = "timestamp")]
    pub timestamp_ms: i64,
}

impl LocationData {
    /// Create a location report.
    pub fn new(tracker_id: impl Into<String>, lat: f64, lng: f64, timestamp_ms: i64) -> Self {
        Self {
            tracker_id: tracker_id.into(),
            lat,
            lng,
            timestamp_ms,
        }
    }

    /// Create a location report from a point.
    pub fn at_point(tracker_id: impl Into<String>, point: GeoPoint, timestamp_ms: i64) -> Self {
        Self::new(tracker_id, point.lat, point.lng, timestamp_ms)
    }

    /// The position as a [`GeoPoint`].
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// An ordered path a tracker walks through, with a cursor.
///
/// Invariant: `current_point_index < points.len()` at all times, except
/// transiently inside the tick that triggers regeneration. The scheduler is
/// the sole mutator; everyone else reads copies out of the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerPath {
    /// Ordered path points (non-empty).
    pub points: Vec<GeoPoint>,
    /// Index of the point the tracker currently occupies.
    pub current_point_index: usize,
    /// Total route distance in meters, when the routing service reported one.
    #[serde(rename = "distance")]
    pub distance_meters: Option<f64>,
    /// Estimated route duration in seconds, when reported.
    #[serde(rename = "duration")]
    pub duration_seconds: Option<f64>,
}

impl TrackerPath {
    /// Create a path with the cursor at the start.
    pub fn new(
        points: Vec<GeoPoint>,
        distance_meters: Option<f64>,
        duration_seconds: Option<f64>,
    ) -> Self {
        Self {
            points,
            current_point_index: 0,
            distance_meters,
            duration_seconds,
        }
    }

    /// Number of points in the path.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the path has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The point at the given index, if any.
    pub fn point_at(&self, index: usize) -> Option<GeoPoint> {
        self.points.get(index).copied()
    }

    /// The point under the cursor, if the path is intact.
    pub fn current_point(&self) -> Option<GeoPoint> {
        self.point_at(self.current_point_index)
    }
}

/// A consistent point-in-time copy of the full simulation state.
///
/// Delivered to newly joined subscribers. Consistency is per tracker: a
/// tracker's location always pairs with its own path, never with a stale one
/// from a concurrent tick.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    /// All registered trackers, in registration order.
    pub trackers: Vec<Tracker>,
    /// Last known location per tracker id.
    pub locations: HashMap<String, LocationData>,
    /// Current path per tracker id.
    pub paths: HashMap<String, TrackerPath>,
}
