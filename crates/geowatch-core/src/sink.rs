//! Outbound notifications to the presentation layer.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::GeowatchError;
use crate::geofence::{GeoState, Geofence};

/// Observer for scheduler output.
///
/// Calls are fire-and-forget and are made from the scheduler's control path,
/// so implementations must return promptly and never block.
pub trait PresentationSink: Send + Sync {
    /// A geofence joined the working set.
    fn geofence_added(&self, geofence: &Geofence);

    /// A geofence left the working set.
    fn geofence_removed(&self, geofence: &Geofence);

    /// A confirmed inside/outside state was reached.
    fn state_changed(&self, state: &GeoState);

    /// An operation failed; `operation` names what was attempted.
    fn operation_failed(&self, operation: &str, error: &GeowatchError);
}

/// A presentation notification captured as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PresentationEvent {
    /// See [`PresentationSink::geofence_added`].
    GeofenceAdded {
        /// Location name of the added geofence.
        location_name: String,
        /// When the notification was produced.
        at_utc: DateTime<Utc>,
    },
    /// See [`PresentationSink::geofence_removed`].
    GeofenceRemoved {
        /// Location name of the removed geofence.
        location_name: String,
        /// When the notification was produced.
        at_utc: DateTime<Utc>,
    },
    /// See [`PresentationSink::state_changed`].
    StateChanged {
        /// Confirmed state.
        state: GeoState,
        /// Human-readable status line.
        status: String,
        /// When the notification was produced.
        at_utc: DateTime<Utc>,
    },
    /// See [`PresentationSink::operation_failed`].
    OperationFailed {
        /// What was attempted.
        operation: String,
        /// Machine-readable error code.
        error_code: String,
        /// Error message.
        message: String,
        /// When the notification was produced.
        at_utc: DateTime<Utc>,
    },
}

impl PresentationEvent {
    /// Capture a geofence-added notification.
    #[must_use]
    pub fn added(geofence: &Geofence) -> Self {
        Self::GeofenceAdded {
            location_name: geofence.location_name.clone(),
            at_utc: Utc::now(),
        }
    }

    /// Capture a geofence-removed notification.
    #[must_use]
    pub fn removed(geofence: &Geofence) -> Self {
        Self::GeofenceRemoved {
            location_name: geofence.location_name.clone(),
            at_utc: Utc::now(),
        }
    }

    /// Capture a state change.
    #[must_use]
    pub fn state(state: &GeoState) -> Self {
        Self::StateChanged {
            status: state.readable_status(),
            state: state.clone(),
            at_utc: Utc::now(),
        }
    }

    /// Capture a failure.
    #[must_use]
    pub fn failure(operation: &str, error: &GeowatchError) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            error_code: error.error_code().to_string(),
            message: error.to_string(),
            at_utc: Utc::now(),
        }
    }
}

/// Sink that keeps every notification in memory, in arrival order.
///
/// Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<PresentationEvent>>>,
}

impl RecordingSink {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<PresentationEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded state changes only.
    #[must_use]
    pub fn states(&self) -> Vec<GeoState> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PresentationEvent::StateChanged { state, .. } => Some(state),
                _ => None,
            })
            .collect()
    }

    /// Number of recorded failures.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, PresentationEvent::OperationFailed { .. }))
            .count()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn push(&self, event: PresentationEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl PresentationSink for RecordingSink {
    fn geofence_added(&self, geofence: &Geofence) {
        self.push(PresentationEvent::added(geofence));
    }

    fn geofence_removed(&self, geofence: &Geofence) {
        self.push(PresentationEvent::removed(geofence));
    }

    fn state_changed(&self, state: &GeoState) {
        self.push(PresentationEvent::state(state));
    }

    fn operation_failed(&self, operation: &str, error: &GeowatchError) {
        self.push(PresentationEvent::failure(operation, error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geofence::{Coordinate, GeofenceParams};

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        let geo = Geofence::from_params(GeofenceParams::new("home", Coordinate::new(1.0, 1.0), 50.0));

        sink.geofence_added(&geo);
        sink.state_changed(&GeoState::Inside(geo.to_region()));
        sink.operation_failed("save", &GeowatchError::DuplicateGeofence("home".into()));

        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], PresentationEvent::GeofenceAdded { .. }));
        assert_eq!(sink.states(), vec![GeoState::Inside(geo.to_region())]);
        assert_eq!(sink.failure_count(), 1);
    }

    #[test]
    fn test_state_event_carries_readable_status() {
        let region = crate::geofence::CircularRegion::new("home", Coordinate::new(1.0, 1.0), 50.0);
        match PresentationEvent::state(&GeoState::Outside(region)) {
            PresentationEvent::StateChanged { status, .. } => assert_eq!(status, "OUTSIDE home"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_failure_event_serialization() {
        let event = PresentationEvent::failure("remove", &GeowatchError::GeofenceNotFound("x".into()));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"operation_failed\""));
        assert!(json.contains("GEOFENCE_NOT_FOUND"));
    }
}
