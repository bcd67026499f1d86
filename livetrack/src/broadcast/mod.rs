//! Outbound broadcast port.
//!
//! The scheduler publishes every location change through a
//! [`BroadcastSink`]. The sink is constructor-injected so the dependency is
//! visible and testable; transport adapters implement it (or subscribe to
//! [`ChannelBroadcaster`]) and own the fan-out to live clients.
//!
//! Delivery is fire-and-forget: a slow, failed, or absent subscriber never
//! propagates an error back into the simulation.

use tokio::sync::broadcast;

use crate::model::LocationData;

/// Default capacity of the broadcast channel.
///
/// Lagging subscribers drop the oldest updates rather than stalling the
/// scheduler; 64 gives a slow consumer several ticks of slack at the default
/// fleet size.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// Sink invoked synchronously by the scheduler once per tracker per tick.
pub trait BroadcastSink: Send + Sync {
    /// A tracker's location changed.
    fn on_location_update(&self, location: &LocationData);
}

/// A sink that discards every update. Useful for headless runs and tests.
#[derive(Debug, Default)]
pub struct NullSink;

impl BroadcastSink for NullSink {
    fn on_location_update(&self, _location: &LocationData) {}
}

/// Fans location updates out over a `tokio::sync::broadcast` channel.
///
/// Send errors (no receivers) and receiver lag are deliberately ignored;
/// subscribers that fall behind simply miss updates.
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    tx: broadcast::Sender<LocationData>,
}

impl ChannelBroadcaster {
    /// Create a broadcaster with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BROADCAST_CAPACITY)
    }

    /// Create a broadcaster with a custom channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to future location updates.
    pub fn subscribe(&self) -> broadcast::Receiver<LocationData> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChannelBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastSink for ChannelBroadcaster {
    fn on_location_update(&self, location: &LocationData) {
        // Err means no live receivers; that is fine
        let _ = self.tx.send(location.clone());
    }
}
