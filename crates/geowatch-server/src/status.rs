//! Status board: the server's presentation sink.
//!
//! Keeps the latest confirmed state of every region and a bounded history of
//! recent notifications for `GET /api/status`.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use geowatch_core::{GeoState, Geofence, GeowatchError, PresentationEvent, PresentationSink};
use tracing::info;

/// Number of recent events retained.
pub const RECENT_EVENTS_CAPACITY: usize = 100;

#[derive(Debug, Default)]
struct Board {
    latest: BTreeMap<String, GeoState>,
    recent: VecDeque<PresentationEvent>,
}

/// In-memory presentation sink shared with the HTTP handlers.
#[derive(Debug)]
pub struct StatusBoard {
    board: Mutex<Board>,
    capacity: usize,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::with_capacity(RECENT_EVENTS_CAPACITY)
    }
}

impl StatusBoard {
    /// Create an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a board retaining at most `capacity` recent events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            board: Mutex::new(Board::default()),
            capacity,
        }
    }

    /// Latest confirmed state per region identifier, sorted by identifier.
    #[must_use]
    pub fn latest_states(&self) -> Vec<GeoState> {
        self.lock().latest.values().cloned().collect()
    }

    /// Recent notifications, oldest first.
    #[must_use]
    pub fn recent_events(&self) -> Vec<PresentationEvent> {
        self.lock().recent.iter().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Board> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, event: PresentationEvent) {
        let mut board = self.lock();
        if board.recent.len() == self.capacity {
            board.recent.pop_front();
        }
        if self.capacity > 0 {
            board.recent.push_back(event);
        }
    }
}

impl PresentationSink for StatusBoard {
    fn geofence_added(&self, geofence: &Geofence) {
        self.record(PresentationEvent::added(geofence));
    }

    fn geofence_removed(&self, geofence: &Geofence) {
        self.lock().latest.remove(&geofence.location_name);
        self.record(PresentationEvent::removed(geofence));
    }

    fn state_changed(&self, state: &GeoState) {
        info!(status = %state.readable_status(), "presence changed");
        self.lock()
            .latest
            .insert(state.region().identifier.clone(), state.clone());
        self.record(PresentationEvent::state(state));
    }

    fn operation_failed(&self, operation: &str, error: &GeowatchError) {
        self.record(PresentationEvent::failure(operation, error));
    }
}
