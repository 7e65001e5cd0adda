//! Unified error types for the geowatch core library.
//!
//! [`GeowatchError`] covers every failure mode the scheduler and its
//! collaborators can surface. Modules with richer internal failure modes
//! ([`ConfigError`](crate::config::ConfigError),
//! [`StoreError`](crate::store::StoreError)) keep their own types and convert
//! into this one at the module boundary.
//!
//! # Example
//!
//! ```rust
//! use geowatch_core::error::{GeowatchError, Result};
//!
//! fn require_positive(radius_m: f64) -> Result<f64> {
//!     if radius_m <= 0.0 {
//!         return Err(GeowatchError::InvalidGeofence(format!(
//!             "radius must be positive, got {radius_m}"
//!         )));
//!     }
//!     Ok(radius_m)
//! }
//!
//! assert!(require_positive(-1.0).is_err());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// The unified error type for all geowatch operations.
#[derive(Debug, Error)]
pub enum GeowatchError {
    // =========================================================================
    // SCHEDULING ERRORS
    // =========================================================================
    /// A slot was needed while at capacity but no monitored region was left to evict.
    ///
    /// The location provider's monitored set and the scheduler's view of it
    /// have drifted apart. This is a logic error, never an expected state.
    #[error(
        "Capacity accounting drifted: {monitored} regions monitored at capacity {capacity} \
         but nothing left to evict"
    )]
    CapacityDrift {
        /// Configured capacity limit.
        capacity: usize,
        /// Monitored-region count reported by the provider.
        monitored: usize,
    },

    /// The location platform refused to monitor another region.
    #[error("Location platform refused region '{identifier}': hard limit of {limit} regions reached")]
    PlatformLimitReached {
        /// Region that could not be started.
        identifier: String,
        /// Platform ceiling.
        limit: usize,
    },

    /// The scheduler event loop is no longer running.
    #[error("Scheduler is not running")]
    SchedulerUnavailable,

    // =========================================================================
    // GEOFENCE ERRORS
    // =========================================================================
    /// No geofence with the given location name is in the working set.
    #[error("Geofence not found: '{0}'")]
    GeofenceNotFound(String),

    /// A geofence with the given location name already exists.
    #[error("Geofence '{0}' already exists. Location names must be unique.")]
    DuplicateGeofence(String),

    /// The geofence parameters failed validation.
    #[error("Invalid geofence: {0}")]
    InvalidGeofence(String),

    // =========================================================================
    // NETWORK INFO ERRORS
    // =========================================================================
    /// The network info provider could not report visible networks.
    #[error("Network query failed: {0}")]
    NetworkQueryFailed(String),

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file exists but could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // =========================================================================
    // PERSISTENCE & I/O ERRORS
    // =========================================================================
    /// An error occurred while persisting or reading geofence records.
    #[error("Persistence error: {0}")]
    PersistenceError(String),

    /// A low-level I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A specialized [`Result`] type for geowatch operations.
pub type Result<T> = std::result::Result<T, GeowatchError>;

impl GeowatchError {
    /// Returns `true` if this error indicates internal state drift.
    #[inline]
    #[must_use]
    pub const fn is_logic_error(&self) -> bool {
        matches!(self, Self::CapacityDrift { .. })
    }

    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_) | Self::ConfigParseError(_) | Self::ConfigValidationError(_)
        )
    }

    /// Returns `true` if this error came from the geofence store or disk.
    #[inline]
    #[must_use]
    pub const fn is_store_error(&self) -> bool {
        matches!(self, Self::PersistenceError(_) | Self::IoError(_))
    }

    /// Returns `true` if the same request may succeed later without intervention.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NetworkQueryFailed(_) | Self::PlatformLimitReached { .. }
        )
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - malformed input
            Self::InvalidGeofence(_) => 400,

            // 404 Not Found
            Self::GeofenceNotFound(_) | Self::ConfigNotFound(_) => 404,

            // 409 Conflict
            Self::DuplicateGeofence(_) => 409,

            // 422 Unprocessable Entity - semantic errors
            Self::ConfigParseError(_) | Self::ConfigValidationError(_) => 422,

            // 500 Internal Server Error
            Self::CapacityDrift { .. } | Self::PersistenceError(_) | Self::IoError(_) => 500,

            // 503 Service Unavailable - platform or scheduler not accepting work
            Self::PlatformLimitReached { .. }
            | Self::SchedulerUnavailable
            | Self::NetworkQueryFailed(_) => 503,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::CapacityDrift { .. } => "CAPACITY_DRIFT",
            Self::PlatformLimitReached { .. } => "PLATFORM_LIMIT_REACHED",
            Self::SchedulerUnavailable => "SCHEDULER_UNAVAILABLE",
            Self::GeofenceNotFound(_) => "GEOFENCE_NOT_FOUND",
            Self::DuplicateGeofence(_) => "DUPLICATE_GEOFENCE",
            Self::InvalidGeofence(_) => "INVALID_GEOFENCE",
            Self::NetworkQueryFailed(_) => "NETWORK_QUERY_FAILED",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::PersistenceError(_) => "PERSISTENCE_ERROR",
            Self::IoError(_) => "IO_ERROR",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::config::ConfigError> for GeowatchError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::NotFound(path) => Self::ConfigNotFound(path),
            ConfigError::WriteError { path, source } => {
                Self::PersistenceError(format!("Failed to write {}: {}", path.display(), source))
            }
            ConfigError::ParseError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::SerializeError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::ValidationError { field, message } => {
                Self::ConfigValidationError(format!("{field}: {message}"))
            }
            ConfigError::MultipleValidationErrors(errors) => {
                let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
                Self::ConfigValidationError(messages.join("; "))
            }
        }
    }
}

impl From<crate::store::StoreError> for GeowatchError {
    fn from(err: crate::store::StoreError) -> Self {
        use crate::store::StoreError;
        match err {
            StoreError::ReadError { path, source } => {
                Self::PersistenceError(format!("Failed to read {}: {}", path.display(), source))
            }
            StoreError::WriteError { path, source } => {
                Self::PersistenceError(format!("Failed to write {}: {}", path.display(), source))
            }
            StoreError::ParseError { path, source } => {
                Self::PersistenceError(format!("Failed to parse {}: {}", path.display(), source))
            }
            StoreError::SerializeError(e) => Self::PersistenceError(e.to_string()),
            StoreError::CreateDirError { path, source } => Self::PersistenceError(format!(
                "Failed to create directory {}: {}",
                path.display(),
                source
            )),
            StoreError::Rejected(message) => Self::PersistenceError(message),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoErr, ErrorKind};

    #[test]
    fn test_logic_error_classification() {
        let err = GeowatchError::CapacityDrift {
            capacity: 10,
            monitored: 10,
        };
        assert!(err.is_logic_error());
        assert!(!GeowatchError::GeofenceNotFound("home".into()).is_logic_error());
    }

    #[test]
    fn test_config_error_classification() {
        assert!(GeowatchError::ConfigNotFound(PathBuf::from("/test")).is_config_error());
        assert!(GeowatchError::ConfigParseError("syntax error".into()).is_config_error());
        assert!(GeowatchError::ConfigValidationError("bad".into()).is_config_error());
        assert!(!GeowatchError::SchedulerUnavailable.is_config_error());
    }

    #[test]
    fn test_store_error_classification() {
        assert!(GeowatchError::PersistenceError("disk full".into()).is_store_error());
        assert!(GeowatchError::IoError(IoErr::new(ErrorKind::NotFound, "x")).is_store_error());
        assert!(!GeowatchError::DuplicateGeofence("home".into()).is_store_error());
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(GeowatchError::NetworkQueryFailed("nmcli missing".into()).is_recoverable());
        assert!(GeowatchError::PlatformLimitReached {
            identifier: "home".into(),
            limit: 20
        }
        .is_recoverable());
        assert!(!GeowatchError::CapacityDrift {
            capacity: 1,
            monitored: 1
        }
        .is_recoverable());
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(GeowatchError::InvalidGeofence("x".into()).http_status_code(), 400);
        assert_eq!(GeowatchError::GeofenceNotFound("x".into()).http_status_code(), 404);
        assert_eq!(GeowatchError::DuplicateGeofence("x".into()).http_status_code(), 409);
        assert_eq!(GeowatchError::ConfigParseError("x".into()).http_status_code(), 422);
        assert_eq!(
            GeowatchError::CapacityDrift {
                capacity: 1,
                monitored: 1
            }
            .http_status_code(),
            500
        );
        assert_eq!(GeowatchError::SchedulerUnavailable.http_status_code(), 503);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            GeowatchError::DuplicateGeofence("home".into()).error_code(),
            "DUPLICATE_GEOFENCE"
        );
        assert_eq!(
            GeowatchError::SchedulerUnavailable.error_code(),
            "SCHEDULER_UNAVAILABLE"
        );
    }

    #[test]
    fn test_from_store_error() {
        let err: GeowatchError = crate::store::StoreError::Rejected("read-only".into()).into();
        assert!(err.is_store_error());
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn test_error_display_messages() {
        let err = GeowatchError::CapacityDrift {
            capacity: 10,
            monitored: 10,
        };
        assert!(err.to_string().contains("capacity 10"));

        let err = GeowatchError::GeofenceNotFound("office".into());
        assert!(err.to_string().contains("office"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<GeowatchError>();
        assert_sync::<GeowatchError>();
    }
}
