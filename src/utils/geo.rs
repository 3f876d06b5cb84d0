//! Geofence checks for clock-in locations.

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geofence {
    pub id: u64,
    pub center: GeoPoint,
    pub radius_meters: f64,
}

/// Great-circle distance in meters (haversine).
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

/// Closest fence to `point` and the distance to its center.
pub fn nearest(point: GeoPoint, fences: &[Geofence]) -> Option<(Geofence, f64)> {
    fences
        .iter()
        .map(|f| (*f, distance_meters(point, f.center)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// The nearest fence whose radius contains `point`, if any.
pub fn resolve(point: GeoPoint, fences: &[Geofence]) -> Option<(Geofence, f64)> {
    fences
        .iter()
        .map(|f| (*f, distance_meters(point, f.center)))
        .filter(|(f, distance)| *distance <= f.radius_meters)
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAKATI: GeoPoint = GeoPoint {
        latitude: 14.5547,
        longitude: 121.0244,
    };
    const ORTIGAS: GeoPoint = GeoPoint {
        latitude: 14.5869,
        longitude: 121.0614,
    };

    fn fence(id: u64, center: GeoPoint, radius: f64) -> Geofence {
        Geofence {
            id,
            center,
            radius_meters: radius,
        }
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_self() {
        assert_eq!(distance_meters(MAKATI, MAKATI), 0.0);
        let there = distance_meters(MAKATI, ORTIGAS);
        let back = distance_meters(ORTIGAS, MAKATI);
        assert!((there - back).abs() < 1e-6);
        // roughly 5.3 km apart
        assert!((5_000.0..5_800.0).contains(&there), "got {there}");
    }

    #[test]
    fn resolve_requires_point_inside_radius() {
        let fences = [fence(1, MAKATI, 200.0), fence(2, ORTIGAS, 200.0)];
        let near_makati = GeoPoint {
            latitude: 14.5550,
            longitude: 121.0245,
        };

        let (hit, distance) = resolve(near_makati, &fences).unwrap();
        assert_eq!(hit.id, 1);
        assert!(distance < 200.0);

        let far = GeoPoint {
            latitude: 14.6500,
            longitude: 121.0300,
        };
        assert!(resolve(far, &fences).is_none());
        assert_eq!(nearest(far, &fences).unwrap().0.id, 2);
    }

    #[test]
    fn overlapping_fences_pick_the_closest() {
        let fences = [fence(1, MAKATI, 10_000.0), fence(2, ORTIGAS, 10_000.0)];
        let near_ortigas = GeoPoint {
            latitude: 14.5860,
            longitude: 121.0600,
        };
        assert_eq!(resolve(near_ortigas, &fences).unwrap().0.id, 2);
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(MAKATI.is_valid());
        assert!(
            !GeoPoint {
                latitude: 91.0,
                longitude: 0.0
            }
            .is_valid()
        );
        assert!(
            !GeoPoint {
                latitude: f64::NAN,
                longitude: 0.0
            }
            .is_valid()
        );
    }
}
