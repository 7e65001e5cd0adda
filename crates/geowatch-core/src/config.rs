//! Application configuration management.
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then `GEOWATCH__SECTION__KEY` environment variables. For example
//! `GEOWATCH__MONITORING__CAPACITY=15` overrides `[monitoring] capacity`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "GEOWATCH";

/// Default number of simultaneously monitored regions.
pub const DEFAULT_CAPACITY: usize = 10;

/// Default hard ceiling of the location platform.
pub const DEFAULT_PLATFORM_LIMIT: usize = 20;

/// Errors raised while loading, saving or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required configuration file does not exist.
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The configuration file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    WriteError {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Sources could not be read or deserialized.
    #[error("failed to parse configuration: {0}")]
    ParseError(#[from] ::config::ConfigError),

    /// Configuration could not be rendered as TOML.
    #[error("failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// A single field holds an invalid value.
    #[error("invalid {field}: {message}")]
    ValidationError {
        /// Dotted field path.
        field: String,
        /// What is wrong.
        message: String,
    },

    /// Several fields hold invalid values.
    #[error("{} configuration errors", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Slot allocation and exit debounce settings.
    pub monitoring: MonitoringConfig,
    /// Where geofence records live.
    pub storage: StorageConfig,
    /// Where visible network names come from.
    pub network: NetworkConfig,
    /// Defaults applied to new geofences.
    pub geofences: GeofenceDefaults,
    /// HTTP server settings.
    pub server: ServerConfig,
}

/// Slot allocation and exit debounce settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Regions the scheduler keeps monitored at once.
    pub capacity: usize,
    /// Hard ceiling of the location platform; `capacity` must not exceed it.
    pub platform_limit: usize,
    /// Seconds before a deferred exit is evaluated again.
    pub recheck_delay_secs: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            platform_limit: DEFAULT_PLATFORM_LIMIT,
            recheck_delay_secs: 30,
        }
    }
}

impl MonitoringConfig {
    /// Re-check delay as a [`Duration`].
    #[must_use]
    pub const fn recheck_delay(&self) -> Duration {
        Duration::from_secs(self.recheck_delay_secs)
    }
}

/// Storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `geofences.json`.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Source of visible network names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkSource {
    /// Query NetworkManager through `nmcli`.
    #[default]
    Nmcli,
    /// Names are pushed through the API.
    Static,
}

/// Network info settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Where names come from.
    pub source: NetworkSource,
    /// Initial names for the static source.
    pub static_names: Vec<String>,
}

/// Defaults for new geofences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeofenceDefaults {
    /// Radius used when a save request omits one.
    pub default_radius_m: f64,
}

impl Default for GeofenceDefaults {
    fn default() -> Self {
        Self {
            default_radius_m: 500.0,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: String,
    /// Use production logging (JSON files plus compact stdout).
    pub production: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            production: false,
        }
    }
}

impl Config {
    /// Load configuration from `path` (if it exists) and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the result is invalid.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Load configuration, requiring the file at `path` to exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if the file is missing, otherwise as
    /// [`Config::load`].
    pub fn load_required(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Self::load(path)
    }

    /// Write configuration to `path` as TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::WriteError {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| ConfigError::WriteError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check every field, collecting all violations.
    ///
    /// # Errors
    ///
    /// Returns the single violation, or [`ConfigError::MultipleValidationErrors`].
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();
        let invalid = |field: &str, message: String| ConfigError::ValidationError {
            field: field.to_string(),
            message,
        };

        let monitoring = &self.monitoring;
        if monitoring.platform_limit == 0 {
            errors.push(invalid(
                "monitoring.platform_limit",
                "must be at least 1".to_string(),
            ));
        }
        if monitoring.capacity == 0 || monitoring.capacity > monitoring.platform_limit {
            errors.push(invalid(
                "monitoring.capacity",
                format!(
                    "must be between 1 and the platform limit ({}), got {}",
                    monitoring.platform_limit, monitoring.capacity
                ),
            ));
        }
        if monitoring.recheck_delay_secs == 0 {
            errors.push(invalid(
                "monitoring.recheck_delay_secs",
                "must be at least 1 second".to_string(),
            ));
        }

        let radius = self.geofences.default_radius_m;
        if !radius.is_finite() || radius <= 0.0 {
            errors.push(invalid(
                "geofences.default_radius_m",
                format!("must be a positive number of meters, got {radius}"),
            ));
        }

        if self.server.bind.parse::<SocketAddr>().is_err() {
            errors.push(invalid(
                "server.bind",
                format!("'{}' is not a socket address", self.server.bind),
            ));
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }
}

/// Default configuration file location.
///
/// On Linux: `/etc/geowatch/config.toml`
/// Elsewhere: the platform config directory.
#[must_use]
pub fn default_config_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/etc/geowatch/config.toml")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "geowatch").map_or_else(
            || PathBuf::from("./config.toml"),
            |dirs| dirs.config_dir().join("config.toml"),
        )
    }
}

/// Default data directory.
///
/// On Linux: `/var/lib/geowatch`
/// Elsewhere: the platform data directory.
#[must_use]
pub fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/var/lib/geowatch")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "geowatch")
            .map_or_else(|| PathBuf::from("./data"), |dirs| dirs.data_dir().to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.monitoring.capacity, 10);
        assert_eq!(config.monitoring.recheck_delay(), Duration::from_secs(30));
        assert_eq!(config.network.source, NetworkSource::Nmcli);
    }

    #[test]
    fn test_capacity_above_platform_limit_is_rejected() {
        let mut config = Config::default();
        config.monitoring.capacity = 25;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "monitoring.capacity"));
    }

    #[test]
    fn test_all_violations_are_collected() {
        let mut config = Config::default();
        config.monitoring.capacity = 0;
        config.monitoring.recheck_delay_secs = 0;
        config.geofences.default_radius_m = -1.0;
        config.server.bind = "not an address".to_string();

        match config.validate().unwrap_err() {
            ConfigError::MultipleValidationErrors(errors) => assert_eq!(errors.len(), 4),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_save_then_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("etc").join("config.toml");

        let mut config = Config::default();
        config.monitoring.capacity = 4;
        config.network.source = NetworkSource::Static;
        config.network.static_names = vec!["home-wifi".to_string()];
        config.storage.data_dir = dir.path().join("data");
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[monitoring]\nrecheck_delay_secs = 45\n").unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.monitoring.recheck_delay_secs, 45);
        assert_eq!(loaded.monitoring.capacity, DEFAULT_CAPACITY);
        assert_eq!(loaded.server, ServerConfig::default());
    }

    #[test]
    fn test_invalid_file_fails_validation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[monitoring]\ncapacity = 0\n").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_load_required_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load_required(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
