//! Authoritative in-memory simulation state.
//!
//! The store holds one record per tracker: identity, current location,
//! current path, and the append-only location history. Each record sits
//! behind its own `RwLock`, so updating one tracker never blocks readers or
//! writers of another (the tracker set is fixed at startup, so the outer map
//! itself is never mutated and needs no lock).
//!
//! Consistency is per tracker: a record's location, path, and history are
//! always updated under one write lock, so a snapshot can never pair a
//! tracker's fresh location with its stale path. There is no cross-tracker
//! atomicity requirement and none is provided.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::coord::GeoPoint;
use crate::model::{LocationData, StateSnapshot, Tracker, TrackerPath};

/// Everything known about one tracker, guarded as a unit.
#[derive(Debug)]
struct TrackerRecord {
    tracker: Tracker,
    location: LocationData,
    path: TrackerPath,
    history: Vec<LocationData>,
}

/// Initial state for one tracker, produced during seeding.
#[derive(Debug, Clone)]
pub struct SeedRecord {
    /// The tracker identity.
    pub tracker: Tracker,
    /// Its first path.
    pub path: TrackerPath,
    /// Its initial location (normally the path's first point).
    pub location: LocationData,
}

/// How a tick changes a tracker's path.
#[derive(Debug, Clone)]
pub enum PathUpdate {
    /// Move the cursor on the existing path.
    Advance(usize),
    /// Replace the path entirely (cursor resets to 0).
    Replace(TrackerPath),
}

/// What the scheduler needs to know to advance one tracker.
#[derive(Debug, Clone)]
pub struct AdvancePlan {
    /// The index the cursor would move to.
    pub next_index: usize,
    /// Whether that index runs off the end of the current path.
    pub exhausted: bool,
    /// The point at `next_index`, when the path still covers it.
    pub point_at_next: Option<GeoPoint>,
    /// The tracker's last known location.
    pub last_location: LocationData,
}

/// The authoritative state store.
#[derive(Debug)]
pub struct StateStore {
    records: HashMap<String, RwLock<TrackerRecord>>,
    /// Tracker ids in registration order, for stable listings.
    order: Vec<String>,
    history_retention: Option<usize>,
}

impl StateStore {
    /// Build a fully seeded store.
    ///
    /// `history_retention` caps per-tracker history length; `None` keeps
    /// history for the process lifetime (the source system's behavior).
    pub fn new(seeds: Vec<SeedRecord>, history_retention: Option<usize>) -> Self {
        let mut records = HashMap::with_capacity(seeds.len());
        let mut order = Vec::with_capacity(seeds.len());

        for seed in seeds {
            let id = seed.tracker.id.clone();
            order.push(id.clone());
            records.insert(
                id,
                RwLock::new(TrackerRecord {
                    tracker: seed.tracker,
                    history: vec![seed.location.clone()],
                    location: seed.location,
                    path: seed.path,
                }),
            );
        }

        Self {
            records,
            order,
            history_retention,
        }
    }

    /// All registered trackers, in registration order.
    pub fn all_trackers(&self) -> Vec<Tracker> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .map(|record| record.read().tracker.clone())
            .collect()
    }

    /// All tracker ids, in registration order.
    pub fn tracker_ids(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Number of registered trackers.
    pub fn tracker_count(&self) -> usize {
        self.order.len()
    }

    /// The last known location for a tracker.
    pub fn last_location(&self, tracker_id: &str) -> Option<LocationData> {
        self.records
            .get(tracker_id)
            .map(|record| record.read().location.clone())
    }

    /// Current path cursor and length for a tracker.
    pub fn path_progress(&self, tracker_id: &str) -> Option<(usize, usize)> {
        self.records.get(tracker_id).map(|record| {
            let record = record.read();
            (record.path.current_point_index, record.path.len())
        })
    }

    /// Read everything the scheduler needs to advance one tracker.
    ///
    /// Returns `None` for an unknown id.
    pub fn plan_advance(&self, tracker_id: &str) -> Option<AdvancePlan> {
        let record = self.records.get(tracker_id)?.read();
        let next_index = record.path.current_point_index + 1;
        Some(AdvancePlan {
            next_index,
            exhausted: next_index >= record.path.len(),
            point_at_next: record.path.point_at(next_index),
            last_location: record.location.clone(),
        })
    }

    /// Apply one tick's outcome for a tracker: move or replace the path,
    /// replace the location, append to history. Atomic per record.
    ///
    /// Returns false for an unknown id.
    pub fn apply_update(
        &self,
        tracker_id: &str,
        path_update: PathUpdate,
        location: LocationData,
    ) -> bool {
        let Some(record) = self.records.get(tracker_id) else {
            return false;
        };
        let mut record = record.write();

        match path_update {
            PathUpdate::Advance(index) => {
                record.path.current_point_index = index;
            }
            PathUpdate::Replace(mut path) => {
                path.current_point_index = 0;
                record.path = path;
            }
        }

        record.location = location.clone();
        record.history.push(location);

        if let Some(cap) = self.history_retention {
            let excess = record.history.len().saturating_sub(cap);
            if excess > 0 {
                record.history.drain(..excess);
            }
        }

        true
    }

    /// The full location history for a tracker, oldest first.
    ///
    /// Unknown ids yield an empty vector, never an error.
    pub fn history(&self, tracker_id: &str) -> Vec<LocationData> {
        self.records
            .get(tracker_id)
            .map(|record| record.read().history.clone())
            .unwrap_or_default()
    }

    /// A point-in-time copy of trackers, locations, and paths.
    ///
    /// Each tracker's slice is internally consistent; the snapshot as a
    /// whole is assembled tracker by tracker.
    pub fn snapshot_all(&self) -> StateSnapshot {
        let mut trackers = Vec::with_capacity(self.order.len());
        let mut locations = HashMap::with_capacity(self.order.len());
        let mut paths = HashMap::with_capacity(self.order.len());

        for id in &self.order {
            if let Some(record) = self.records.get(id) {
                let record = record.read();
                trackers.push(record.tracker.clone());
                locations.insert(id.clone(), record.location.clone());
                paths.insert(id.clone(), record.path.clone());
            }
        }

        StateSnapshot {
            trackers,
            locations,
            paths,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn seed(id: &str, points: Vec<GeoPoint>) -> SeedRecord {
        let path = TrackerPath::new(points, None, None);
        let first = path.points[0];
        SeedRecord {
            tracker: Tracker::new(id, format!("Vehicle {}", id), "#FF0000"),
            location: LocationData::at_point(id, first, 1_000),
            path,
        }
    }

    fn two_point_store() -> StateStore {
        StateStore::new(
            vec![seed(
                "tracker-1",
                vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.1, 0.1)],
            )],
            None,
        )
    }

    #[test]
    fn test_seeded_store() {
        let store = two_point_store();
        assert_eq!(store.tracker_count(), 1);
        assert_eq!(store.all_trackers()[0].id, "tracker-1");
        assert_eq!(store.history("tracker-1").len(), 1);
        assert_eq!(store.path_progress("tracker-1"), Some((0, 2)));
    }

    #[test]
    fn test_unknown_id_queries() {
        let store = two_point_store();
        assert!(store.history("nonexistent").is_empty());
        assert!(store.last_location("nonexistent").is_none());
        assert!(store.plan_advance("nonexistent").is_none());
        assert!(!store.apply_update(
            "nonexistent",
            PathUpdate::Advance(1),
            LocationData::new("nonexistent", 0.0, 0.0, 0),
        ));
    }

    #[test]
    fn test_plan_advance() {
        let store = two_point_store();
        let plan = store.plan_advance("tracker-1").unwrap();
        assert_eq!(plan.next_index, 1);
        assert!(!plan.exhausted);
        assert_eq!(plan.point_at_next, Some(GeoPoint::new(0.1, 0.1)));
    }

    #[test]
    fn test_plan_advance_reports_exhaustion() {
        let store = two_point_store();
        store.apply_update(
            "tracker-1",
            PathUpdate::Advance(1),
            LocationData::new("tracker-1", 0.1, 0.1, 2_000),
        );
        let plan = store.plan_advance("tracker-1").unwrap();
        assert_eq!(plan.next_index, 2);
        assert!(plan.exhausted);
        assert!(plan.point_at_next.is_none());
    }

    #[test]
    fn test_apply_advance_updates_everything() {
        let store = two_point_store();
        let location = LocationData::new("tracker-1", 0.1, 0.1, 2_000);
        assert!(store.apply_update("tracker-1", PathUpdate::Advance(1), location.clone()));

        assert_eq!(store.path_progress("tracker-1"), Some((1, 2)));
        assert_eq!(store.last_location("tracker-1"), Some(location));
        assert_eq!(store.history("tracker-1").len(), 2);
    }

    #[test]
    fn test_apply_replace_resets_cursor() {
        let store = two_point_store();
        let mut new_path = TrackerPath::new(
            vec![GeoPoint::new(1.0, 1.0), GeoPoint::new(1.1, 1.1), GeoPoint::new(1.2, 1.2)],
            Some(300.0),
            None,
        );
        // A stale cursor on the incoming path must not survive the swap
        new_path.current_point_index = 2;

        store.apply_update(
            "tracker-1",
            PathUpdate::Replace(new_path),
            LocationData::new("tracker-1", 1.0, 1.0, 3_000),
        );

        assert_eq!(store.path_progress("tracker-1"), Some((0, 3)));
    }

    #[test]
    fn test_history_is_append_only_and_ordered() {
        let store = two_point_store();
        for (i, ts) in [2_000i64, 2_000, 3_000].iter().enumerate() {
            store.apply_update(
                "tracker-1",
                PathUpdate::Advance(i % 2),
                LocationData::new("tracker-1", 0.0, 0.0, *ts),
            );
        }
        let history = store.history("tracker-1");
        assert_eq!(history.len(), 4);
        for pair in history.windows(2) {
            assert!(pair[0].timestamp_ms <= pair[1].timestamp_ms);
        }
    }

    #[test]
    fn test_history_retention_cap() {
        let store = StateStore::new(
            vec![seed("tracker-1", vec![GeoPoint::new(0.0, 0.0)])],
            Some(3),
        );
        for ts in 1..=10i64 {
            store.apply_update(
                "tracker-1",
                PathUpdate::Advance(0),
                LocationData::new("tracker-1", 0.0, 0.0, ts * 1_000),
            );
        }
        let history = store.history("tracker-1");
        assert_eq!(history.len(), 3);
        // Oldest entries were evicted, newest retained
        assert_eq!(history[2].timestamp_ms, 10_000);
    }

    #[test]
    fn test_snapshot_contains_all_trackers() {
        let store = StateStore::new(
            vec![
                seed("tracker-1", vec![GeoPoint::new(0.0, 0.0)]),
                seed("tracker-2", vec![GeoPoint::new(1.0, 1.0)]),
            ],
            None,
        );
        let snapshot = store.snapshot_all();
        assert_eq!(snapshot.trackers.len(), 2);
        assert_eq!(snapshot.trackers[0].id, "tracker-1");
        assert!(snapshot.locations.contains_key("tracker-2"));
        assert!(snapshot.paths.contains_key("tracker-2"));
    }

    /// A concurrent reader must never see a location paired with a path it
    /// does not belong to. The writer below maintains "location == point
    /// under the path cursor" on every update; any snapshot violating that
    /// observed a torn record.
    #[test]
    fn test_snapshot_per_tracker_consistency_under_writes() {
        let store = Arc::new(StateStore::new(
            vec![seed(
                "tracker-1",
                vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.1, 0.1)],
            )],
            None,
        ));

        let writer_store = Arc::clone(&store);
        let writer = std::thread::spawn(move || {
            for i in 0..1_000u64 {
                let lat = i as f64;
                let path = TrackerPath::new(
                    vec![GeoPoint::new(lat, lat), GeoPoint::new(lat + 0.1, lat + 0.1)],
                    None,
                    None,
                );
                let location = LocationData::new("tracker-1", lat, lat, i as i64);
                writer_store.apply_update("tracker-1", PathUpdate::Replace(path), location);
            }
        });

        for _ in 0..1_000 {
            let snapshot = store.snapshot_all();
            let location = &snapshot.locations["tracker-1"];
            let path = &snapshot.paths["tracker-1"];
            let under_cursor = path.current_point().expect("path is non-empty");
            assert_eq!(
                location.position(),
                under_cursor,
                "snapshot paired a location with a mismatched path"
            );
        }

        writer.join().unwrap();
    }
}
