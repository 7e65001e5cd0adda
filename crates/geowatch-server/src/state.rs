//! Application state shared across handlers, and the wiring that builds it.

use std::sync::Arc;

use geowatch_core::{
    Collaborators, Config, GeofenceScheduler, GeofenceStore, MemoryLocationProvider,
    NetworkInfoProvider, NetworkSource, NmcliNetworkInfo, SchedulerHandle, StaticNetworkInfo,
};
use tracing::info;

use crate::status::StatusBoard;

/// Shared application state.
pub type SharedState = Arc<AppState>;

/// Everything the HTTP handlers need.
pub struct AppState {
    /// Front door to the scheduler loop.
    pub scheduler: SchedulerHandle,
    /// Presentation sink fed by the scheduler.
    pub status: Arc<StatusBoard>,
    /// Writable network names; `None` unless the static source is configured.
    pub network: Option<StaticNetworkInfo>,
    /// Loaded configuration.
    pub config: Config,
}

impl AppState {
    /// Build the scheduler and the state that fronts it.
    ///
    /// The store is loaded before returning; the caller spawns
    /// [`GeofenceScheduler::run`].
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn build(
        config: Config,
        store: Box<dyn GeofenceStore>,
    ) -> anyhow::Result<(GeofenceScheduler, SharedState)> {
        let status = Arc::new(StatusBoard::new());

        let (network, writable): (Box<dyn NetworkInfoProvider>, Option<StaticNetworkInfo>) =
            match config.network.source {
                NetworkSource::Nmcli => (Box::new(NmcliNetworkInfo::default()), None),
                NetworkSource::Static => {
                    let names = StaticNetworkInfo::new(config.network.static_names.clone());
                    (Box::new(names.clone()), Some(names))
                }
            };

        let mut scheduler = GeofenceScheduler::new(
            &config.monitoring,
            Collaborators {
                location: Box::new(MemoryLocationProvider::new(config.monitoring.platform_limit)),
                network,
                store,
                sink: status.clone(),
            },
        );
        let loaded = scheduler.load_all()?;
        info!(
            geofences = loaded,
            capacity = config.monitoring.capacity,
            network = ?config.network.source,
            "scheduler ready"
        );

        let state = Arc::new(Self {
            scheduler: scheduler.handle(),
            status,
            network: writable,
            config,
        });
        Ok((scheduler, state))
    }
}
