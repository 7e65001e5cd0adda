//! Location platform abstraction.
//!
//! The platform owns the set of monitored regions. The scheduler reads that
//! set and issues start/stop commands but never treats its own bookkeeping as
//! authoritative.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::error::{GeowatchError, Result};
use crate::geofence::CircularRegion;

/// Region-monitoring primitives of a location platform.
pub trait LocationProvider: Send {
    /// Regions currently occupying a monitoring slot, in platform order.
    fn monitored_regions(&self) -> Vec<CircularRegion>;

    /// Begin monitoring `region`.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform refuses the region.
    fn start_monitoring(&mut self, region: &CircularRegion) -> Result<()>;

    /// Stop monitoring `region`. Unknown regions are ignored.
    fn stop_monitoring(&mut self, region: &CircularRegion);
}

/// In-process location platform with a hard slot ceiling.
///
/// Cloning yields another handle onto the same platform state, so one clone
/// can be handed to the scheduler while another is kept for inspection.
/// Starting a region whose identifier is already monitored replaces it.
#[derive(Debug, Clone)]
pub struct MemoryLocationProvider {
    inner: Arc<Mutex<MemoryPlatform>>,
}

#[derive(Debug, Default)]
struct MemoryPlatform {
    regions: Vec<CircularRegion>,
    limit: usize,
    starts: usize,
    stops: usize,
}

impl MemoryLocationProvider {
    /// Create a platform that accepts at most `limit` regions.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryPlatform {
                limit,
                ..MemoryPlatform::default()
            })),
        }
    }

    /// Create a platform already monitoring `regions`.
    #[must_use]
    pub fn with_regions(limit: usize, regions: Vec<CircularRegion>) -> Self {
        let provider = Self::new(limit);
        provider.lock().regions = regions;
        provider
    }

    /// Number of start commands accepted since creation or the last reset.
    #[must_use]
    pub fn start_count(&self) -> usize {
        self.lock().starts
    }

    /// Number of stop commands received since creation or the last reset.
    #[must_use]
    pub fn stop_count(&self) -> usize {
        self.lock().stops
    }

    /// Zero the command counters.
    pub fn reset_counters(&self) {
        let mut platform = self.lock();
        platform.starts = 0;
        platform.stops = 0;
    }

    /// Identifiers of the monitored regions, in platform order.
    #[must_use]
    pub fn identifiers(&self) -> Vec<String> {
        self.lock()
            .regions
            .iter()
            .map(|region| region.identifier.clone())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryPlatform> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LocationProvider for MemoryLocationProvider {
    fn monitored_regions(&self) -> Vec<CircularRegion> {
        self.lock().regions.clone()
    }

    fn start_monitoring(&mut self, region: &CircularRegion) -> Result<()> {
        let mut platform = self.lock();

        if let Some(existing) = platform
            .regions
            .iter_mut()
            .find(|r| r.identifier == region.identifier)
        {
            *existing = region.clone();
        } else {
            if platform.regions.len() >= platform.limit {
                return Err(GeowatchError::PlatformLimitReached {
                    identifier: region.identifier.clone(),
                    limit: platform.limit,
                });
            }
            platform.regions.push(region.clone());
        }

        platform.starts += 1;
        debug!(region = %region.identifier, "platform started monitoring");
        Ok(())
    }

    fn stop_monitoring(&mut self, region: &CircularRegion) {
        let mut platform = self.lock();
        platform.stops += 1;
        if let Some(index) = platform.regions.iter().position(|r| r == region) {
            platform.regions.remove(index);
            debug!(region = %region.identifier, "platform stopped monitoring");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geofence::Coordinate;

    fn region(name: &str) -> CircularRegion {
        CircularRegion::new(name, Coordinate::new(1.0, 1.0), 50.0)
    }

    #[test]
    fn test_start_and_stop() {
        let mut provider = MemoryLocationProvider::new(2);
        provider.start_monitoring(&region("a")).unwrap();
        provider.start_monitoring(&region("b")).unwrap();
        assert_eq!(provider.identifiers(), ["a", "b"]);

        provider.stop_monitoring(&region("a"));
        assert_eq!(provider.identifiers(), ["b"]);
        assert_eq!(provider.start_count(), 2);
        assert_eq!(provider.stop_count(), 1);
    }

    #[test]
    fn test_hard_limit_is_enforced() {
        let mut provider = MemoryLocationProvider::new(1);
        provider.start_monitoring(&region("a")).unwrap();
        let err = provider.start_monitoring(&region("b")).unwrap_err();
        assert!(matches!(err, GeowatchError::PlatformLimitReached { limit: 1, .. }));
        assert_eq!(provider.identifiers(), ["a"]);
    }

    #[test]
    fn test_same_identifier_replaces() {
        let mut provider = MemoryLocationProvider::new(1);
        provider.start_monitoring(&region("a")).unwrap();
        let moved = CircularRegion::new("a", Coordinate::new(2.0, 2.0), 75.0);
        provider.start_monitoring(&moved).unwrap();
        assert_eq!(provider.monitored_regions(), vec![moved]);
    }

    #[test]
    fn test_clones_share_state() {
        let observer = MemoryLocationProvider::new(5);
        let mut commanded = observer.clone();
        commanded.start_monitoring(&region("a")).unwrap();
        assert_eq!(observer.identifiers(), ["a"]);

        observer.reset_counters();
        assert_eq!(observer.start_count(), 0);
    }
}
