//! State store - concurrency-safe holder of the latest vehicle state
//!
//! One entry per vehicle: the latest snapshot, the capabilities derived
//! from it, and a staleness flag. Every `put` is a full replace through
//! the resolver; there is no merge path. Writes are serialized per
//! vehicle by the entry lock - never by a global lock, so one vehicle's
//! slow refresh cannot block another's.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::debug;
use vcsync_core::{mask_vin, CapabilitySet, TrackedStatuses, VehicleSnapshot};

use crate::resolver;

/// Consecutive fetch failures before an entry is flagged stale
const STALE_THRESHOLD: u32 = 3;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// The stored state for one vehicle, returned to callers by value
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState {
    pub snapshot: VehicleSnapshot,
    pub capabilities: CapabilitySet,
    pub tracked: TrackedStatuses,
    /// Set when the snapshot has missed its refresh cadence
    pub stale: bool,
}

/// Change notification emitted on every accepted put
#[derive(Debug, Clone)]
pub struct StateEvent {
    pub vin: String,
    pub state: VehicleState,
}

#[derive(Default)]
struct EntryInner {
    state: Option<VehicleState>,
    consecutive_failures: u32,
}

#[derive(Default)]
struct Entry {
    inner: RwLock<EntryInner>,
}

/// Per-vehicle state holder with change notifications
pub struct StateStore {
    entries: RwLock<HashMap<String, Arc<Entry>>>,
    events: broadcast::Sender<StateEvent>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            entries: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Create an empty entry for a vehicle if one does not exist yet
    pub fn register(&self, vin: &str) {
        self.entry(vin);
    }

    /// Store a fresh snapshot: recompute capabilities, replace the entry
    /// wholesale, clear the failure counter, and notify subscribers.
    pub fn put(&self, snapshot: VehicleSnapshot) {
        let vin = snapshot.vin.clone();
        let capabilities = resolver::resolve(&snapshot);
        let tracked = resolver::tracked_statuses(&snapshot, &capabilities);
        let state = VehicleState {
            snapshot,
            capabilities,
            tracked,
            stale: false,
        };

        let entry = self.entry(&vin);
        {
            let mut inner = entry.inner.write();
            inner.consecutive_failures = 0;
            inner.state = Some(state.clone());
        }

        debug!(vin = %mask_vin(&vin), powertrain = %state.capabilities.powertrain, "Snapshot stored");
        // Nobody subscribed is fine
        let _ = self.events.send(StateEvent { vin, state });
    }

    /// Record a failed refresh. The previous snapshot is kept; at
    /// [`STALE_THRESHOLD`] consecutive failures the entry is flagged
    /// stale. Returns the current consecutive failure count.
    pub fn record_failure(&self, vin: &str) -> u32 {
        let entry = self.entry(vin);
        let mut inner = entry.inner.write();
        inner.consecutive_failures += 1;
        if inner.consecutive_failures >= STALE_THRESHOLD {
            if let Some(state) = inner.state.as_mut() {
                state.stale = true;
            }
        }
        inner.consecutive_failures
    }

    /// Read the current state for one vehicle. Never blocks behind a
    /// network call; returns a consistent copy.
    pub fn get(&self, vin: &str) -> Option<VehicleState> {
        let entry = self.entries.read().get(vin).cloned()?;
        let inner = entry.inner.read();
        inner.state.clone()
    }

    /// All registered VINs, sorted
    pub fn vins(&self) -> Vec<String> {
        let mut vins: Vec<String> = self.entries.read().keys().cloned().collect();
        vins.sort();
        vins
    }

    /// Subscribe to change notifications for every accepted put
    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.events.subscribe()
    }

    fn entry(&self, vin: &str) -> Arc<Entry> {
        if let Some(entry) = self.entries.read().get(vin) {
            return entry.clone();
        }
        self.entries
            .write()
            .entry(vin.to_string())
            .or_default()
            .clone()
    }
}
