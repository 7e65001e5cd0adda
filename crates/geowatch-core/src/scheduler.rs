//! Geofence monitoring scheduler.
//!
//! [`GeofenceScheduler`] is the single owner of scheduling state: the working
//! geofence list, the last known location and the pending exit re-checks.
//! Everything that touches that state runs on one control path. Location and
//! region events from the platform, store mutations from clients and re-check
//! firings are all funnelled through one bounded queue and handled in order,
//! so two allocation passes never interleave.
//!
//! ```text
//! location update ──► allocator ──► start/stop on LocationProvider
//! region exit ──────► exit confirmation ──► Outside, or re-check in 30s
//! region enter ─────► Inside
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

use crate::allocator::{ActiveSetAllocator, AllocationOutcome};
use crate::config::MonitoringConfig;
use crate::confirmation::{ExitConfirmation, ExitDecision};
use crate::error::{GeowatchError, Result};
use crate::geofence::{CircularRegion, Coordinate, GeoState, Geofence, GeofenceParams, RegionState};
use crate::network::NetworkInfoProvider;
use crate::provider::LocationProvider;
use crate::recheck::RecheckTasks;
use crate::sink::PresentationSink;
use crate::store::GeofenceStore;

/// Depth of the scheduler event queue.
pub const EVENT_BUFFER_SIZE: usize = 256;

/// Work items processed by the scheduler loop.
#[derive(Debug)]
pub enum SchedulerEvent {
    /// The user's position changed.
    LocationUpdated(Coordinate),
    /// The platform reported entering a monitored region.
    RegionEntered(CircularRegion),
    /// The platform reported leaving a monitored region.
    RegionExited(CircularRegion),
    /// The platform answered a state request for a monitored region.
    RegionStateDetermined(CircularRegion, RegionState),
    /// A deferred exit is due for re-evaluation.
    RecheckDue {
        /// Region whose exit was deferred.
        region: CircularRegion,
        /// Generation of the task that fired.
        generation: u64,
    },
    /// Persist and start tracking a new geofence.
    Save {
        /// Geofence to create.
        params: GeofenceParams,
        /// Receives the stored record.
        reply: oneshot::Sender<Result<Geofence>>,
    },
    /// Delete a geofence and stop tracking it.
    Remove {
        /// Location name of the geofence.
        location_name: String,
        /// Receives the removed record.
        reply: oneshot::Sender<Result<Geofence>>,
    },
    /// Report current scheduling state.
    Snapshot {
        /// Receives the snapshot.
        reply: oneshot::Sender<SchedulerSnapshot>,
    },
    /// Stop the loop.
    Shutdown,
}

/// Point-in-time view of the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SchedulerSnapshot {
    /// Configured capacity limit.
    #[schema(example = 10)]
    pub capacity: usize,
    /// Most recent location update, if any.
    pub last_location: Option<Coordinate>,
    /// Working geofence list.
    pub geofences: Vec<Geofence>,
    /// Regions the platform currently monitors.
    pub monitored: Vec<CircularRegion>,
    /// Regions with a deferred exit awaiting re-check.
    pub pending_rechecks: Vec<String>,
}

/// External collaborators injected into the scheduler.
pub struct Collaborators {
    /// Region-monitoring platform.
    pub location: Box<dyn LocationProvider>,
    /// Visible network names.
    pub network: Box<dyn NetworkInfoProvider>,
    /// Geofence record store.
    pub store: Box<dyn GeofenceStore>,
    /// Presentation observer.
    pub sink: Arc<dyn PresentationSink>,
}

/// The scheduler facade and event loop.
pub struct GeofenceScheduler {
    allocator: ActiveSetAllocator,
    confirmation: ExitConfirmation,
    geofences: Vec<Geofence>,
    last_location: Option<Coordinate>,
    location: Box<dyn LocationProvider>,
    network: Box<dyn NetworkInfoProvider>,
    store: Box<dyn GeofenceStore>,
    sink: Arc<dyn PresentationSink>,
    rechecks: RecheckTasks,
    events_tx: mpsc::Sender<SchedulerEvent>,
    events_rx: mpsc::Receiver<SchedulerEvent>,
}

impl GeofenceScheduler {
    /// Create a scheduler with an empty working list.
    #[must_use]
    pub fn new(config: &MonitoringConfig, collaborators: Collaborators) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER_SIZE);
        Self {
            allocator: ActiveSetAllocator::new(config.capacity),
            confirmation: ExitConfirmation::new(config.recheck_delay()),
            geofences: Vec::new(),
            last_location: None,
            location: collaborators.location,
            network: collaborators.network,
            store: collaborators.store,
            sink: collaborators.sink,
            rechecks: RecheckTasks::new(),
            events_tx,
            events_rx,
        }
    }

    /// A cloneable handle for posting events to this scheduler.
    #[must_use]
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            events: self.events_tx.clone(),
        }
    }

    /// The working geofence list.
    #[must_use]
    pub fn geofences(&self) -> &[Geofence] {
        &self.geofences
    }

    /// Most recent location, if any.
    #[must_use]
    pub const fn last_location(&self) -> Option<Coordinate> {
        self.last_location
    }

    /// Regions with a pending exit re-check.
    #[must_use]
    pub fn pending_rechecks(&self) -> Vec<String> {
        self.rechecks.pending()
    }

    /// Current scheduling state.
    #[must_use]
    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            capacity: self.allocator.capacity(),
            last_location: self.last_location,
            geofences: self.geofences.clone(),
            monitored: self.location.monitored_regions(),
            pending_rechecks: self.rechecks.pending(),
        }
    }

    /// Replace the working list with everything in the store.
    ///
    /// Records whose location name repeats an earlier one are skipped.
    ///
    /// # Errors
    ///
    /// Returns the store error; the working list is left unchanged.
    pub fn load_all(&mut self) -> Result<usize> {
        let stored = match self.store.list_all() {
            Ok(stored) => stored,
            Err(e) => return Err(self.report("load", e.into())),
        };

        let mut loaded: Vec<Geofence> = Vec::with_capacity(stored.len());
        for geofence in stored {
            if loaded.iter().any(|g| g.location_name == geofence.location_name) {
                warn!(geofence = %geofence.location_name, "skipping duplicate stored geofence");
                continue;
            }
            loaded.push(geofence);
        }

        for geofence in &loaded {
            self.sink.geofence_added(geofence);
        }
        info!(count = loaded.len(), "geofences loaded");
        self.geofences = loaded;
        Ok(self.geofences.len())
    }

    /// Record a new user location and run an allocation pass.
    ///
    /// # Errors
    ///
    /// Returns allocation errors, including [`GeowatchError::CapacityDrift`].
    pub fn update_location(&mut self, location: Coordinate) -> Result<AllocationOutcome> {
        self.last_location = Some(location);
        self.allocate(location)
    }

    /// Handle a region-entered event.
    ///
    /// Entries are reported immediately and cancel any deferred exit for the region.
    pub fn region_entered(&mut self, region: CircularRegion) {
        if self.rechecks.cancel(&region.identifier) {
            debug!(region = %region.identifier, "re-entered before deferred exit was confirmed");
        }
        info!(region = %region.identifier, "entered region");
        self.sink.state_changed(&GeoState::Inside(region));
    }

    /// Handle a region-exited event.
    pub fn region_exited(&mut self, region: CircularRegion) -> ExitDecision {
        let decision = self
            .confirmation
            .evaluate(&region, &self.geofences, self.network.as_ref());

        match decision {
            ExitDecision::ConfirmedOutside => {
                self.rechecks.cancel(&region.identifier);
                info!(region = %region.identifier, "exited region");
                self.sink.state_changed(&GeoState::Outside(region));
            }
            ExitDecision::Recheck { after } => {
                self.rechecks
                    .schedule(region, after, self.events_tx.clone());
            }
        }
        decision
    }

    /// Handle a state-determination answer.
    ///
    /// `Inside` is treated as an entry, `Outside` as an exit, `Unknown` is ignored.
    pub fn region_state_determined(&mut self, region: CircularRegion, state: RegionState) {
        match state {
            RegionState::Inside => self.region_entered(region),
            RegionState::Outside => {
                self.region_exited(region);
            }
            RegionState::Unknown => {
                debug!(region = %region.identifier, "region state unknown");
            }
        }
    }

    /// Handle a re-check firing.
    ///
    /// Returns `None` when the firing is stale (cancelled or superseded) or the
    /// geofence has since been deleted.
    pub fn recheck_due(&mut self, region: CircularRegion, generation: u64) -> Option<ExitDecision> {
        if !self.rechecks.take_due(&region.identifier, generation) {
            debug!(region = %region.identifier, generation, "stale re-check ignored");
            return None;
        }
        if !self
            .geofences
            .iter()
            .any(|g| g.location_name == region.identifier)
        {
            debug!(region = %region.identifier, "geofence gone, re-check dropped");
            return None;
        }
        Some(self.region_exited(region))
    }

    /// Persist a new geofence and add it to the working list.
    ///
    /// If a location is already known, an allocation pass runs straight away.
    ///
    /// # Errors
    ///
    /// Returns validation, duplicate-name and store errors. On error the
    /// working list is unchanged.
    pub fn save(&mut self, params: GeofenceParams) -> Result<Geofence> {
        let params = match params.validated() {
            Ok(params) => params,
            Err(e) => return Err(self.report("save", e)),
        };
        if self
            .geofences
            .iter()
            .any(|g| g.location_name == params.location_name)
        {
            return Err(self.report(
                "save",
                GeowatchError::DuplicateGeofence(params.location_name),
            ));
        }

        let geofence = match self.store.save(&params) {
            Ok(geofence) => geofence,
            Err(e) => return Err(self.report("save", e.into())),
        };

        info!(geofence = %geofence.location_name, radius_m = geofence.radius_m, "geofence added");
        self.geofences.push(geofence.clone());
        self.sink.geofence_added(&geofence);

        if let Some(location) = self.last_location {
            if let Err(e) = self.allocate(location) {
                self.report("allocate", e);
            }
        }
        Ok(geofence)
    }

    /// Delete a geofence, stop monitoring it and forget its pending re-check.
    ///
    /// If a location is known, the freed slot is refilled by an allocation pass.
    ///
    /// # Errors
    ///
    /// Returns [`GeowatchError::GeofenceNotFound`] or the store error. On error
    /// nothing in memory changes.
    pub fn remove(&mut self, location_name: &str) -> Result<Geofence> {
        let Some(index) = self
            .geofences
            .iter()
            .position(|g| g.location_name == location_name)
        else {
            return Err(GeowatchError::GeofenceNotFound(location_name.to_string()));
        };

        if let Err(e) = self.store.delete(&self.geofences[index]) {
            return Err(self.report("remove", e.into()));
        }

        let geofence = self.geofences.remove(index);
        for region in self.location.monitored_regions() {
            if region.identifier == geofence.location_name {
                self.location.stop_monitoring(&region);
                info!(region = %region.identifier, "stopped monitoring removed geofence");
            }
        }
        self.rechecks.cancel(&geofence.location_name);
        self.sink.geofence_removed(&geofence);
        info!(geofence = %geofence.location_name, "geofence removed");

        if let Some(location) = self.last_location {
            if let Err(e) = self.allocate(location) {
                self.report("allocate", e);
            }
        }
        Ok(geofence)
    }

    /// Receive and handle one queued event.
    ///
    /// Returns `false` once the loop should stop.
    pub async fn process_next(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => self.dispatch(event),
            None => false,
        }
    }

    /// Handle events until [`SchedulerEvent::Shutdown`] arrives.
    pub async fn run(mut self) {
        info!(
            capacity = self.allocator.capacity(),
            geofences = self.geofences.len(),
            "scheduler running"
        );
        while self.process_next().await {}
        self.rechecks.cancel_all();
        info!("scheduler stopped");
    }

    fn dispatch(&mut self, event: SchedulerEvent) -> bool {
        match event {
            SchedulerEvent::LocationUpdated(location) => {
                if let Err(e) = self.update_location(location) {
                    self.report("allocate", e);
                }
            }
            SchedulerEvent::RegionEntered(region) => self.region_entered(region),
            SchedulerEvent::RegionExited(region) => {
                self.region_exited(region);
            }
            SchedulerEvent::RegionStateDetermined(region, state) => {
                self.region_state_determined(region, state);
            }
            SchedulerEvent::RecheckDue { region, generation } => {
                self.recheck_due(region, generation);
            }
            SchedulerEvent::Save { params, reply } => {
                let _ = reply.send(self.save(params));
            }
            SchedulerEvent::Remove {
                location_name,
                reply,
            } => {
                let _ = reply.send(self.remove(&location_name));
            }
            SchedulerEvent::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            SchedulerEvent::Shutdown => return false,
        }
        true
    }

    fn allocate(&mut self, location: Coordinate) -> Result<AllocationOutcome> {
        let outcome = self
            .allocator
            .allocate(&self.geofences, location, self.location.as_mut())?;
        for identifier in &outcome.stopped {
            if self.rechecks.cancel(identifier) {
                debug!(region = %identifier, "dropped deferred exit for evicted region");
            }
        }
        if !outcome.is_noop() {
            info!(
                started = outcome.started.len(),
                stopped = outcome.stopped.len(),
                retained = outcome.retained.len(),
                "monitoring slots reallocated"
            );
        }
        Ok(outcome)
    }

    fn report(&self, operation: &str, err: GeowatchError) -> GeowatchError {
        if err.is_logic_error() || err.is_store_error() {
            error!(operation, error = %err, "scheduler operation failed");
        } else {
            warn!(operation, error = %err, "scheduler operation rejected");
        }
        self.sink.operation_failed(operation, &err);
        err
    }
}

/// Cloneable front door to a running [`GeofenceScheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    events: mpsc::Sender<SchedulerEvent>,
}

impl SchedulerHandle {
    /// Post a location update.
    ///
    /// # Errors
    ///
    /// Returns [`GeowatchError::SchedulerUnavailable`] if the loop has stopped.
    pub async fn location_updated(&self, location: Coordinate) -> Result<()> {
        self.send(SchedulerEvent::LocationUpdated(location)).await
    }

    /// Post a region-entered event.
    ///
    /// # Errors
    ///
    /// Returns [`GeowatchError::SchedulerUnavailable`] if the loop has stopped.
    pub async fn region_entered(&self, region: CircularRegion) -> Result<()> {
        self.send(SchedulerEvent::RegionEntered(region)).await
    }

    /// Post a region-exited event.
    ///
    /// # Errors
    ///
    /// Returns [`GeowatchError::SchedulerUnavailable`] if the loop has stopped.
    pub async fn region_exited(&self, region: CircularRegion) -> Result<()> {
        self.send(SchedulerEvent::RegionExited(region)).await
    }

    /// Post a state-determination answer.
    ///
    /// # Errors
    ///
    /// Returns [`GeowatchError::SchedulerUnavailable`] if the loop has stopped.
    pub async fn region_state_determined(
        &self,
        region: CircularRegion,
        state: RegionState,
    ) -> Result<()> {
        self.send(SchedulerEvent::RegionStateDetermined(region, state))
            .await
    }

    /// Save a geofence and wait for the stored record.
    ///
    /// # Errors
    ///
    /// Returns the scheduler's save error, or
    /// [`GeowatchError::SchedulerUnavailable`] if the loop has stopped.
    pub async fn save(&self, params: GeofenceParams) -> Result<Geofence> {
        let (reply, rx) = oneshot::channel();
        self.send(SchedulerEvent::Save { params, reply }).await?;
        rx.await.map_err(|_| GeowatchError::SchedulerUnavailable)?
    }

    /// Remove a geofence and wait for the removed record.
    ///
    /// # Errors
    ///
    /// Returns the scheduler's remove error, or
    /// [`GeowatchError::SchedulerUnavailable`] if the loop has stopped.
    pub async fn remove(&self, location_name: impl Into<String>) -> Result<Geofence> {
        let (reply, rx) = oneshot::channel();
        self.send(SchedulerEvent::Remove {
            location_name: location_name.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| GeowatchError::SchedulerUnavailable)?
    }

    /// Fetch a snapshot of scheduling state.
    ///
    /// # Errors
    ///
    /// Returns [`GeowatchError::SchedulerUnavailable`] if the loop has stopped.
    pub async fn snapshot(&self) -> Result<SchedulerSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(SchedulerEvent::Snapshot { reply }).await?;
        rx.await.map_err(|_| GeowatchError::SchedulerUnavailable)
    }

    /// Ask the loop to stop after the events already queued.
    ///
    /// # Errors
    ///
    /// Returns [`GeowatchError::SchedulerUnavailable`] if the loop has already stopped.
    pub async fn shutdown(&self) -> Result<()> {
        self.send(SchedulerEvent::Shutdown).await
    }

    async fn send(&self, event: SchedulerEvent) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| GeowatchError::SchedulerUnavailable)
    }
}
