//! Great-circle distance between listing and caller coordinates.
//!
//! Distances are presented to users in statute miles with one decimal
//! place, so the calculation rounds at the source and every consumer
//! (filters, API responses) sees the same value.

/// Earth's radius in statute miles (for Haversine formula)
const EARTH_RADIUS_MILES: f64 = 3_959.0;

/// A WGS84 latitude/longitude pair in degrees.
///
/// Callers are responsible for only constructing coordinates they
/// actually have; absence of a coordinate is handled upstream (rows
/// without coordinates are excluded before any distance math).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Calculate Haversine distance between two points in miles,
/// rounded to one decimal place.
///
/// Deterministic and symmetric: `distance_miles(a, b)` equals
/// `distance_miles(b, a)`. No validation is performed; garbage in,
/// garbage out.
pub fn distance_miles(a: Coordinates, b: Coordinates) -> f64 {
    let lat1_rad = a.latitude.to_radians();
    let lat2_rad = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().asin();

    let miles = EARTH_RADIUS_MILES * c;

    // One decimal place, matching what the API returns to clients.
    (miles * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        let sf = Coordinates::new(37.7749, -122.4194);
        assert_eq!(distance_miles(sf, sf), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let sf = Coordinates::new(37.7749, -122.4194);
        let oakland = Coordinates::new(37.8044, -122.2712);
        assert_eq!(distance_miles(sf, oakland), distance_miles(oakland, sf));
    }

    #[test]
    fn one_degree_of_latitude() {
        // One degree of latitude is ~69.1 miles anywhere on the sphere.
        let a = Coordinates::new(0.0, 0.0);
        let b = Coordinates::new(1.0, 0.0);
        assert_eq!(distance_miles(a, b), 69.1);
    }

    #[test]
    fn rounds_to_one_decimal() {
        let sf = Coordinates::new(37.7749, -122.4194);
        let nearby = Coordinates::new(37.7793, -122.4193);
        let d = distance_miles(sf, nearby);
        assert_eq!(d, (d * 10.0).round() / 10.0);
    }
}
