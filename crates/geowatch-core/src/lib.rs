//! # geowatch-core
//!
//! Core logic for the geowatch geofence monitoring service.
//!
//! The location platform can only watch a small number of circular regions
//! at once. This crate keeps the user's saved geofences, decides which of
//! them the platform should be watching as the user moves, and debounces
//! noisy exits using visibility of a trusted wireless network.
//!
//! ## Architecture
//!
//! - [`scheduler`] - The single-owner event loop tying everything together
//! - [`allocator`] - Bounded active-set allocation (closest N geofences)
//! - [`confirmation`] - Exit confirmation against a trusted network
//! - [`recheck`] - Cancellable deferred re-check tasks
//! - [`distance`] - Great-circle distance and proximity ranking
//! - [`geofence`] - Geofence records, regions and presence states
//! - [`provider`] - Location platform abstraction and in-memory platform
//! - [`network`] - Visible network names (nmcli or static)
//! - [`store`] - Geofence persistence (JSON file or memory)
//! - [`sink`] - Presentation notifications
//! - [`config`] - Configuration loading, saving, and validation
//! - [`error`] - Unified error types for the crate

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod allocator;
pub mod config;
pub mod confirmation;
pub mod distance;
pub mod error;
pub mod geofence;
pub mod network;
pub mod provider;
pub mod recheck;
pub mod scheduler;
pub mod sink;
pub mod store;

// Re-export primary types for convenience
pub use allocator::{ActiveSetAllocator, AllocationOutcome};
pub use config::{
    default_config_path, default_data_dir, Config, ConfigError, ConfigResult, GeofenceDefaults,
    MonitoringConfig, NetworkConfig, NetworkSource, ServerConfig, StorageConfig,
};
pub use confirmation::{resolve_geofence, ExitConfirmation, ExitDecision, DEFAULT_RECHECK_DELAY};
pub use distance::{closest_first, distance_m, furthest_first, Located, EARTH_RADIUS_M};
pub use error::{GeowatchError, Result};
pub use geofence::{
    is_valid_location_name, CircularRegion, Coordinate, GeoState, Geofence, GeofenceParams,
    RegionState, MAX_LOCATION_NAME_LENGTH,
};
pub use network::{NetworkInfoProvider, NmcliNetworkInfo, StaticNetworkInfo, NMCLI_ARGS};
pub use provider::{LocationProvider, MemoryLocationProvider};
pub use scheduler::{
    Collaborators, GeofenceScheduler, SchedulerEvent, SchedulerHandle, SchedulerSnapshot,
};
pub use sink::{PresentationEvent, PresentationSink, RecordingSink};
pub use store::{GeofenceStore, JsonFileStore, MemoryStore, StoreError, StoreResult};
