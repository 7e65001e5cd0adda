//! Persistent storage for geofence records.
//!
//! The file store keeps every record in a single JSON document; writes replace
//! the whole document (last write wins).

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, info};

use crate::geofence::{Geofence, GeofenceParams};

/// File name of the geofence document inside the data directory.
pub const GEOFENCES_FILE: &str = "geofences.json";

/// Errors raised by geofence stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store document could not be read.
    #[error("failed to read {}: {source}", path.display())]
    ReadError {
        /// Document path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The store document could not be written.
    #[error("failed to write {}: {source}", path.display())]
    WriteError {
        /// Document path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The store document is not valid JSON for a geofence list.
    #[error("failed to parse {}: {source}", path.display())]
    ParseError {
        /// Document path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Records could not be serialized.
    #[error("failed to serialize geofences: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// The data directory could not be created.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirError {
        /// Directory path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The store refused the operation.
    #[error("store rejected operation: {0}")]
    Rejected(String),
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Record store for saved geofences.
pub trait GeofenceStore: Send {
    /// All saved geofences, in save order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn list_all(&self) -> StoreResult<Vec<Geofence>>;

    /// Persist a new geofence and return the stored record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn save(&mut self, params: &GeofenceParams) -> StoreResult<Geofence>;

    /// Delete the record with the geofence's location name.
    ///
    /// Deleting a record that does not exist succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be updated.
    fn delete(&mut self, geofence: &Geofence) -> StoreResult<()>;
}

/// Geofence store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store records in `data_dir/geofences.json`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(GEOFENCES_FILE),
        }
    }

    /// Path of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> StoreResult<Vec<Geofence>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|source| StoreError::ReadError {
            path: self.path.clone(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|source| StoreError::ParseError {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, geofences: &[Geofence]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDirError {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = serde_json::to_string_pretty(geofences)?;
        std::fs::write(&self.path, content).map_err(|source| StoreError::WriteError {
            path: self.path.clone(),
            source,
        })
    }
}

impl GeofenceStore for JsonFileStore {
    fn list_all(&self) -> StoreResult<Vec<Geofence>> {
        let geofences = self.read()?;
        debug!(count = geofences.len(), path = %self.path.display(), "loaded geofences");
        Ok(geofences)
    }

    fn save(&mut self, params: &GeofenceParams) -> StoreResult<Geofence> {
        let mut geofences = self.read()?;
        let geofence = Geofence::from_params(params.clone());
        geofences.retain(|g| g.location_name != geofence.location_name);
        geofences.push(geofence.clone());
        self.write(&geofences)?;
        info!(geofence = %geofence.location_name, "geofence saved");
        Ok(geofence)
    }

    fn delete(&mut self, geofence: &Geofence) -> StoreResult<()> {
        let mut geofences = self.read()?;
        let before = geofences.len();
        geofences.retain(|g| g.location_name != geofence.location_name);
        if geofences.len() != before {
            self.write(&geofences)?;
            info!(geofence = %geofence.location_name, "geofence deleted");
        }
        Ok(())
    }
}

/// Volatile store; clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<Vec<Geofence>>>,
}

impl MemoryStore {
    /// Create a store pre-populated with `geofences`.
    #[must_use]
    pub fn with_geofences(geofences: Vec<Geofence>) -> Self {
        Self {
            records: Arc::new(Mutex::new(geofences)),
        }
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GeofenceStore for MemoryStore {
    fn list_all(&self) -> StoreResult<Vec<Geofence>> {
        Ok(self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&mut self, params: &GeofenceParams) -> StoreResult<Geofence> {
        let geofence = Geofence::from_params(params.clone());
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.retain(|g| g.location_name != geofence.location_name);
        records.push(geofence.clone());
        Ok(geofence)
    }

    fn delete(&mut self, geofence: &Geofence) -> StoreResult<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|g| g.location_name != geofence.location_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geofence::Coordinate;
    use tempfile::TempDir;

    fn params(name: &str) -> GeofenceParams {
        GeofenceParams::new(name, Coordinate::new(3.1, 101.6), 200.0)
    }

    #[test]
    fn test_missing_file_lists_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_save_list_delete() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("nested"));

        let home = store.save(&params("home")).unwrap();
        store
            .save(&params("office").with_trusted_network("office-wifi"))
            .unwrap();

        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].trusted_network.as_deref(), Some("office-wifi"));

        store.delete(&home).unwrap();
        let names: Vec<String> = store
            .list_all()
            .unwrap()
            .into_iter()
            .map(|g| g.location_name)
            .collect();
        assert_eq!(names, ["office"]);
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        JsonFileStore::new(dir.path()).save(&params("home")).unwrap();

        let reopened = JsonFileStore::new(dir.path());
        assert_eq!(reopened.list_all().unwrap()[0].location_name, "home");
    }

    #[test]
    fn test_corrupt_file_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(GEOFENCES_FILE), "{not json").unwrap();
        let err = JsonFileStore::new(dir.path()).list_all().unwrap_err();
        assert!(matches!(err, StoreError::ParseError { .. }));
    }

    #[test]
    fn test_delete_unknown_is_ok() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::new(dir.path());
        let ghost = Geofence::from_params(params("ghost"));
        assert!(store.delete(&ghost).is_ok());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_memory_store_clones_share_records() {
        let store = MemoryStore::default();
        let mut writer = store.clone();
        writer.save(&params("home")).unwrap();
        assert_eq!(store.len(), 1);
    }
}
