//! Great-circle distance and distance-ordered views over located items.
//!
//! Both orderings are stable: items at equal distance keep their input order,
//! so repeated passes over unchanged input produce identical results.

use crate::geofence::{CircularRegion, Coordinate, Geofence};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Anything with a position on the globe.
pub trait Located {
    /// The point distances are measured from.
    fn coordinate(&self) -> Coordinate;
}

impl Located for Coordinate {
    fn coordinate(&self) -> Coordinate {
        *self
    }
}

impl Located for Geofence {
    fn coordinate(&self) -> Coordinate {
        self.coordinate
    }
}

impl Located for CircularRegion {
    fn coordinate(&self) -> Coordinate {
        self.center
    }
}

/// Haversine distance between two coordinates, in meters.
#[must_use]
pub fn distance_m(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Items ordered nearest to `origin` first.
pub fn closest_first<T: Located>(items: &[T], origin: Coordinate) -> Vec<&T> {
    ranked(items, origin, false)
}

/// Items ordered furthest from `origin` first.
pub fn furthest_first<T: Located>(items: &[T], origin: Coordinate) -> Vec<&T> {
    ranked(items, origin, true)
}

fn ranked<T: Located>(items: &[T], origin: Coordinate, descending: bool) -> Vec<&T> {
    let mut measured: Vec<(f64, &T)> = items
        .iter()
        .map(|item| (distance_m(origin, item.coordinate()), item))
        .collect();

    // sort_by is stable, ties keep input order in both directions
    if descending {
        measured.sort_by(|a, b| b.0.total_cmp(&a.0));
    } else {
        measured.sort_by(|a, b| a.0.total_cmp(&b.0));
    }

    measured.into_iter().map(|(_, item)| item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(name: &str, latitude: f64, longitude: f64) -> CircularRegion {
        CircularRegion::new(name, Coordinate::new(latitude, longitude), 100.0)
    }

    #[test]
    fn test_distance_is_zero_for_same_point() {
        let point = Coordinate::new(37.33, -122.03);
        assert!(distance_m(point, point).abs() < f64::EPSILON);
    }

    #[test]
    fn test_distance_one_degree_of_latitude() {
        let d = distance_m(Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 0.0));
        assert!((d - 111_195.0).abs() < 10.0, "got {d}");
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = Coordinate::new(37.330_336_74, -122.022_525_93);
        let b = Coordinate::new(37.335_258_15, -122.032_546_39);
        assert!((distance_m(a, b) - distance_m(b, a)).abs() < 1e-6);
    }

    #[test]
    fn test_closest_first_orders_ascending() {
        let items = vec![
            region("far", 10.0, 0.0),
            region("near", 1.0, 0.0),
            region("mid", 5.0, 0.0),
        ];
        let names: Vec<&str> = closest_first(&items, Coordinate::new(0.0, 0.0))
            .into_iter()
            .map(|r| r.identifier.as_str())
            .collect();
        assert_eq!(names, ["near", "mid", "far"]);
    }

    #[test]
    fn test_furthest_first_orders_descending() {
        let items = vec![
            region("near", 1.0, 0.0),
            region("far", 10.0, 0.0),
            region("mid", 5.0, 0.0),
        ];
        let names: Vec<&str> = furthest_first(&items, Coordinate::new(0.0, 0.0))
            .into_iter()
            .map(|r| r.identifier.as_str())
            .collect();
        assert_eq!(names, ["far", "mid", "near"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let items = vec![
            region("a", 1.0, 0.0),
            region("b", 1.0, 0.0),
            region("c", -1.0, 0.0),
        ];
        let origin = Coordinate::new(0.0, 0.0);

        let asc: Vec<&str> = closest_first(&items, origin)
            .into_iter()
            .map(|r| r.identifier.as_str())
            .collect();
        assert_eq!(asc, ["a", "b", "c"]);

        let desc: Vec<&str> = furthest_first(&items, origin)
            .into_iter()
            .map(|r| r.identifier.as_str())
            .collect();
        assert_eq!(desc, ["a", "b", "c"]);
    }

    #[test]
    fn test_empty_input() {
        let items: Vec<CircularRegion> = Vec::new();
        assert!(closest_first(&items, Coordinate::new(0.0, 0.0)).is_empty());
    }
}
