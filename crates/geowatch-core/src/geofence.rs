//! Geofence records and the region types derived from them.

use std::fmt;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{GeowatchError, Result};

/// Maximum length of a geofence location name.
pub const MAX_LOCATION_NAME_LENGTH: usize = 64;

static LOCATION_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\p{Cc}]{1,64}$").expect("location name pattern is valid")
});

/// Returns `true` if `name` is usable as a geofence location name.
///
/// Names are 1 to 64 characters and contain no control characters.
#[must_use]
pub fn is_valid_location_name(name: &str) -> bool {
    !name.trim().is_empty() && LOCATION_NAME_RE.is_match(name)
}

/// A WGS84 latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"latitude": 37.33033674, "longitude": -122.02252593}))]
pub struct Coordinate {
    /// Latitude in degrees, -90 to 90.
    pub latitude: f64,

    /// Longitude in degrees, -180 to 180.
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate without validation.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check that both components are finite and within WGS84 bounds.
    ///
    /// # Errors
    ///
    /// Returns [`GeowatchError::InvalidGeofence`] describing the first bad component.
    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(GeowatchError::InvalidGeofence(format!(
                "latitude {} is outside -90..=90",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(GeowatchError::InvalidGeofence(format!(
                "longitude {} is outside -180..=180",
                self.longitude
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// A circular region as handed to the location platform.
///
/// This is the only region geometry the scheduler works with; providers that
/// support other shapes must not report them through
/// [`LocationProvider`](crate::provider::LocationProvider).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "identifier": "office",
    "center": {"latitude": 37.33033674, "longitude": -122.02252593},
    "radius_m": 150.0
}))]
pub struct CircularRegion {
    /// Region identifier; equal to the owning geofence's location name.
    #[schema(example = "office")]
    pub identifier: String,

    /// Center of the region.
    pub center: Coordinate,

    /// Radius in meters.
    #[schema(example = 150.0)]
    pub radius_m: f64,
}

impl CircularRegion {
    /// Create a new circular region.
    pub fn new(identifier: impl Into<String>, center: Coordinate, radius_m: f64) -> Self {
        Self {
            identifier: identifier.into(),
            center,
            radius_m,
        }
    }
}

/// A saved geofence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "location_name": "office",
    "coordinate": {"latitude": 37.33033674, "longitude": -122.02252593},
    "radius_m": 150.0,
    "trusted_network": "office-wifi",
    "created_at_utc": "2025-01-15T03:30:00Z"
}))]
pub struct Geofence {
    /// Unique, human-readable name. Also used as the monitored-region identifier.
    #[schema(example = "office")]
    pub location_name: String,

    /// Center of the geofence.
    pub coordinate: Coordinate,

    /// Radius in meters.
    #[schema(example = 150.0)]
    pub radius_m: f64,

    /// Wireless network whose presence marks an exit as spurious.
    #[schema(example = "office-wifi")]
    pub trusted_network: Option<String>,

    /// When the record was saved.
    pub created_at_utc: DateTime<Utc>,
}

impl Geofence {
    /// Build a geofence from validated parameters, stamped with the current time.
    #[must_use]
    pub fn from_params(params: GeofenceParams) -> Self {
        Self {
            location_name: params.location_name,
            coordinate: params.coordinate,
            radius_m: params.radius_m,
            trusted_network: params.trusted_network,
            created_at_utc: Utc::now(),
        }
    }

    /// Derive the region the location platform monitors for this geofence.
    #[must_use]
    pub fn to_region(&self) -> CircularRegion {
        CircularRegion::new(self.location_name.clone(), self.coordinate, self.radius_m)
    }

    /// Whether `region` is the region derived from this geofence.
    #[must_use]
    pub fn matches_region(&self, region: &CircularRegion) -> bool {
        region.identifier == self.location_name
            && region.center == self.coordinate
            && region.radius_m == self.radius_m
    }
}

/// Input for saving a new geofence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeofenceParams {
    /// Unique location name.
    #[schema(example = "office")]
    pub location_name: String,

    /// Center of the geofence.
    pub coordinate: Coordinate,

    /// Radius in meters.
    #[schema(example = 150.0)]
    pub radius_m: f64,

    /// Optional trusted wireless network name.
    #[schema(example = "office-wifi")]
    pub trusted_network: Option<String>,
}

impl GeofenceParams {
    /// Create parameters with no trusted network.
    pub fn new(location_name: impl Into<String>, coordinate: Coordinate, radius_m: f64) -> Self {
        Self {
            location_name: location_name.into(),
            coordinate,
            radius_m,
            trusted_network: None,
        }
    }

    /// Attach a trusted network name.
    #[must_use]
    pub fn with_trusted_network(mut self, network: impl Into<String>) -> Self {
        self.trusted_network = Some(network.into());
        self
    }

    /// Validate and normalise the parameters.
    ///
    /// An empty or whitespace-only trusted network is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`GeowatchError::InvalidGeofence`] if the name, coordinate or
    /// radius is unusable.
    pub fn validated(mut self) -> Result<Self> {
        if !is_valid_location_name(&self.location_name) {
            return Err(GeowatchError::InvalidGeofence(format!(
                "location name must be 1-{MAX_LOCATION_NAME_LENGTH} characters without control characters"
            )));
        }
        self.coordinate.validate()?;
        if !self.radius_m.is_finite() || self.radius_m <= 0.0 {
            return Err(GeowatchError::InvalidGeofence(format!(
                "radius must be a positive number of meters, got {}",
                self.radius_m
            )));
        }
        self.trusted_network = self
            .trusted_network
            .filter(|network| !network.trim().is_empty());
        Ok(self)
    }
}

/// Externally visible, confirmed presence state for a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "state", content = "region", rename_all = "snake_case")]
pub enum GeoState {
    /// The user is inside the region.
    Inside(CircularRegion),
    /// The user has left the region.
    Outside(CircularRegion),
}

impl GeoState {
    /// The region this state refers to.
    #[must_use]
    pub const fn region(&self) -> &CircularRegion {
        match self {
            Self::Inside(region) | Self::Outside(region) => region,
        }
    }

    /// Human-readable status, e.g. `INSIDE office`.
    #[must_use]
    pub fn readable_status(&self) -> String {
        match self {
            Self::Inside(region) => format!("INSIDE {}", region.identifier),
            Self::Outside(region) => format!("OUTSIDE {}", region.identifier),
        }
    }
}

/// Result of a state-determination request reported by the location platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RegionState {
    /// Device is inside the region.
    Inside,
    /// Device is outside the region.
    Outside,
    /// Platform could not tell.
    Unknown,
}
