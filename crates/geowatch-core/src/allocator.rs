//! Active-set allocation.
//!
//! The location platform can watch only a few regions at once. Each pass
//! moves the geofences nearest the user into those slots, evicting the
//! monitored regions furthest from the user to make room.

use std::collections::VecDeque;

use tracing::{debug, info};

use crate::distance::{closest_first, furthest_first};
use crate::error::{GeowatchError, Result};
use crate::geofence::{CircularRegion, Coordinate, Geofence};
use crate::provider::LocationProvider;

/// Region identifiers touched by one allocation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationOutcome {
    /// Regions monitoring was started for, in start order.
    pub started: Vec<String>,
    /// Regions evicted to make room, in eviction order.
    pub stopped: Vec<String>,
    /// Desired regions that were already monitored.
    pub retained: Vec<String>,
}

impl AllocationOutcome {
    /// Whether the pass issued no commands.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.started.is_empty() && self.stopped.is_empty()
    }
}

/// Reconciles a capacity-limited set of monitoring slots with the nearest geofences.
#[derive(Debug, Clone, Copy)]
pub struct ActiveSetAllocator {
    capacity: usize,
}

impl ActiveSetAllocator {
    /// Create an allocator for `capacity` simultaneous regions.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Run one allocation pass.
    ///
    /// The provider's monitored set is authoritative and is re-read before
    /// every start, so drift between commanded and actual state heals here.
    ///
    /// # Errors
    ///
    /// - [`GeowatchError::CapacityDrift`] if a slot is needed at capacity and
    ///   no evictable region remains.
    /// - Any error returned by [`LocationProvider::start_monitoring`].
    pub fn allocate(
        &self,
        geofences: &[Geofence],
        location: Coordinate,
        provider: &mut dyn LocationProvider,
    ) -> Result<AllocationOutcome> {
        let mut outcome = AllocationOutcome::default();
        if geofences.is_empty() {
            return Ok(outcome);
        }

        let desired: Vec<&Geofence> = closest_first(geofences, location)
            .into_iter()
            .take(self.capacity)
            .collect();

        let monitored = provider.monitored_regions();
        // Regions this pass keeps never enter the queue.
        let mut eviction_queue: VecDeque<CircularRegion> = furthest_first(&monitored, location)
            .into_iter()
            .filter(|region| !desired.iter().any(|g| g.matches_region(region)))
            .cloned()
            .collect();

        for geofence in desired {
            let live = provider.monitored_regions();

            if live.iter().any(|region| geofence.matches_region(region)) {
                debug!(geofence = %geofence.location_name, "already monitored");
                outcome.retained.push(geofence.location_name.clone());
                continue;
            }

            // Re-registering an identifier replaces the old region in place.
            let replaces = live
                .iter()
                .any(|region| region.identifier == geofence.location_name);

            if !replaces {
                let mut count = live.len();
                while count >= self.capacity {
                    let victim = eviction_queue
                        .pop_front()
                        .ok_or(GeowatchError::CapacityDrift {
                            capacity: self.capacity,
                            monitored: count,
                        })?;
                    provider.stop_monitoring(&victim);
                    info!(region = %victim.identifier, "stopped monitoring");
                    outcome.stopped.push(victim.identifier);
                    count = provider.monitored_regions().len();
                }
            }

            eviction_queue.retain(|region| region.identifier != geofence.location_name);
            provider.start_monitoring(&geofence.to_region())?;
            info!(geofence = %geofence.location_name, "started monitoring");
            outcome.started.push(geofence.location_name.clone());
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::distance_m;
    use crate::geofence::GeofenceParams;
    use crate::provider::MemoryLocationProvider;

    fn geofence(name: &str, latitude: f64, longitude: f64) -> Geofence {
        Geofence::from_params(GeofenceParams::new(
            name,
            Coordinate::new(latitude, longitude),
            100.0,
        ))
    }

    /// Geofences strung out north of the equator, 0.01 degrees apart.
    fn line_of(count: usize) -> Vec<Geofence> {
        (0..count)
            .map(|i| geofence(&format!("g{i}"), 0.01 * (i as f64 + 1.0), 0.0))
            .collect()
    }

    fn sorted(mut names: Vec<String>) -> Vec<String> {
        names.sort();
        names
    }

    #[test]
    fn test_scenario_picks_closer_geofence() {
        let first = geofence("first", 37.330_336_74, -122.022_525_93);
        let second = geofence("second", 37.326_022_76, -122.032_158_08);
        let user = Coordinate::new(37.335_258_15, -122.032_546_39);
        let mut provider = MemoryLocationProvider::new(20);

        ActiveSetAllocator::new(1)
            .allocate(&[first, second.clone()], user, &mut provider)
            .unwrap();

        assert_eq!(provider.monitored_regions(), vec![second.to_region()]);
    }

    #[test]
    fn test_under_capacity_monitors_everything() {
        let geofences = line_of(4);
        let mut provider = MemoryLocationProvider::new(20);

        let outcome = ActiveSetAllocator::new(10)
            .allocate(&geofences, Coordinate::new(5.0, 5.0), &mut provider)
            .unwrap();

        assert!(outcome.stopped.is_empty());
        assert_eq!(sorted(provider.identifiers()), ["g0", "g1", "g2", "g3"]);
    }

    #[test]
    fn test_over_capacity_monitors_nearest() {
        let geofences = line_of(6);
        let user = Coordinate::new(0.0, 0.0);
        let mut provider = MemoryLocationProvider::new(20);

        ActiveSetAllocator::new(3)
            .allocate(&geofences, user, &mut provider)
            .unwrap();

        assert_eq!(sorted(provider.identifiers()), ["g0", "g1", "g2"]);
    }

    #[test]
    fn test_moving_evicts_furthest_first() {
        let geofences = line_of(6);
        let mut provider = MemoryLocationProvider::new(20);
        let allocator = ActiveSetAllocator::new(3);

        allocator
            .allocate(&geofences, Coordinate::new(0.0, 0.0), &mut provider)
            .unwrap();

        // Walk north past g5: g3..g5 become nearest, g0 is now furthest.
        let user = Coordinate::new(0.07, 0.0);
        let outcome = allocator.allocate(&geofences, user, &mut provider).unwrap();

        assert_eq!(outcome.started, ["g5", "g4", "g3"]);
        assert_eq!(outcome.stopped, ["g0", "g1", "g2"]);
        assert_eq!(sorted(provider.identifiers()), ["g3", "g4", "g5"]);
    }

    #[test]
    fn test_no_farther_geofence_monitored_while_closer_is_not() {
        let geofences: Vec<Geofence> = (0..12_u32)
            .map(|i| {
                let x = f64::from(i);
                geofence(&format!("g{i}"), (x * 0.37).sin(), (x * 0.91).cos())
            })
            .collect();
        let mut provider = MemoryLocationProvider::new(20);
        let allocator = ActiveSetAllocator::new(5);

        for user in [
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.8, 0.2),
            Coordinate::new(-0.5, 1.0),
        ] {
            allocator.allocate(&geofences, user, &mut provider).unwrap();
            let monitored = provider.monitored_regions();
            assert_eq!(monitored.len(), 5);

            let furthest_kept = monitored
                .iter()
                .map(|r| distance_m(user, r.center))
                .fold(f64::MIN, f64::max);
            for g in &geofences {
                if !monitored.iter().any(|r| g.matches_region(r)) {
                    assert!(distance_m(user, g.coordinate) >= furthest_kept);
                }
            }
        }
    }

    #[test]
    fn test_second_pass_is_idempotent() {
        let geofences = line_of(8);
        let user = Coordinate::new(0.03, 0.0);
        let mut provider = MemoryLocationProvider::new(20);
        let allocator = ActiveSetAllocator::new(4);

        allocator.allocate(&geofences, user, &mut provider).unwrap();
        provider.reset_counters();

        let outcome = allocator.allocate(&geofences, user, &mut provider).unwrap();
        assert!(outcome.is_noop());
        assert_eq!(outcome.retained.len(), 4);
        assert_eq!(provider.start_count(), 0);
        assert_eq!(provider.stop_count(), 0);
    }

    #[test]
    fn test_empty_geofence_list_is_noop() {
        let mut provider = MemoryLocationProvider::with_regions(
            20,
            vec![geofence("stale", 1.0, 1.0).to_region()],
        );
        let outcome = ActiveSetAllocator::new(1)
            .allocate(&[], Coordinate::new(0.0, 0.0), &mut provider)
            .unwrap();
        assert!(outcome.is_noop());
        assert_eq!(provider.identifiers(), ["stale"]);
    }

    #[test]
    fn test_provider_state_is_trusted_over_last_command() {
        let geofences = line_of(2);
        let mut provider = MemoryLocationProvider::new(20);
        let allocator = ActiveSetAllocator::new(2);
        let user = Coordinate::new(0.0, 0.0);

        allocator.allocate(&geofences, user, &mut provider).unwrap();
        // Platform dropped a region on its own.
        provider.stop_monitoring(&geofences[1].to_region());
        provider.reset_counters();

        let outcome = allocator.allocate(&geofences, user, &mut provider).unwrap();
        assert_eq!(outcome.started, ["g1"]);
        assert_eq!(provider.stop_count(), 0);
    }

    #[test]
    fn test_overfull_platform_is_trimmed_to_capacity() {
        let geofences = line_of(3);
        let user = Coordinate::new(0.0, 0.0);
        let mut provider = MemoryLocationProvider::with_regions(
            20,
            vec![geofences[1].to_region(), geofences[2].to_region()],
        );

        let outcome = ActiveSetAllocator::new(1)
            .allocate(&geofences, user, &mut provider)
            .unwrap();

        assert_eq!(outcome.stopped, ["g2", "g1"]);
        assert_eq!(provider.identifiers(), ["g0"]);
    }

    #[test]
    fn test_unevictable_full_platform_reports_capacity_drift() {
        // The platform reports the same desired region twice, so it is full
        // but holds nothing the pass may evict.
        let geofences = line_of(3);
        let user = Coordinate::new(0.0, 0.0);
        let mut provider = MemoryLocationProvider::with_regions(
            20,
            vec![geofences[1].to_region(), geofences[1].to_region()],
        );

        let err = ActiveSetAllocator::new(2)
            .allocate(&geofences, user, &mut provider)
            .unwrap_err();

        assert!(err.is_logic_error());
        assert!(matches!(
            err,
            GeowatchError::CapacityDrift {
                capacity: 2,
                monitored: 2
            }
        ));
    }

    #[test]
    fn test_duplicate_coordinates_rank_by_input_order() {
        let geofences = vec![geofence("a", 1.0, 1.0), geofence("b", 1.0, 1.0)];
        let mut provider = MemoryLocationProvider::new(20);

        ActiveSetAllocator::new(1)
            .allocate(&geofences, Coordinate::new(0.0, 0.0), &mut provider)
            .unwrap();

        assert_eq!(provider.identifiers(), ["a"]);
    }

    #[test]
    fn test_stale_region_evicted_before_kept_region() {
        let geofences = line_of(2);
        let user = Coordinate::new(0.0, 0.0);
        // A leftover region very close to the user, plus g1 which stays desired.
        let stale = CircularRegion::new("stale", Coordinate::new(0.001, 0.0), 10.0);
        let mut provider = MemoryLocationProvider::with_regions(
            20,
            vec![stale, geofences[1].to_region()],
        );

        let outcome = ActiveSetAllocator::new(2)
            .allocate(&geofences, user, &mut provider)
            .unwrap();

        assert_eq!(outcome.stopped, ["stale"]);
        assert_eq!(outcome.started, ["g0"]);
        assert_eq!(outcome.retained, ["g1"]);
    }

    #[test]
    fn test_changed_geometry_replaces_without_eviction() {
        let original = geofence("home", 1.0, 1.0);
        let other = geofence("gym", 2.0, 2.0);
        let mut provider = MemoryLocationProvider::with_regions(
            20,
            vec![original.to_region(), other.to_region()],
        );
        let mut moved = original;
        moved.radius_m = 250.0;

        let outcome = ActiveSetAllocator::new(2)
            .allocate(&[moved.clone(), other], Coordinate::new(0.0, 0.0), &mut provider)
            .unwrap();

        assert!(outcome.stopped.is_empty());
        assert!(provider.monitored_regions().contains(&moved.to_region()));
        assert_eq!(provider.monitored_regions().len(), 2);
    }
}
