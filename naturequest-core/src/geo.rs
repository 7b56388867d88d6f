// naturequest-core/src/geo.rs

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Latitude must be in [-90, 90], longitude in [-180, 180].
pub fn validate_coordinates(latitude: f64, longitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)
}

/// Great-circle distance between two coordinates in meters (haversine).
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1) = (lat1.to_radians(), lon1.to_radians());
    let (lat2, lon2) = (lat2.to_radians(), lon2.to_radians());

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Implied travel speed in km/h between two submissions; `None` when the
/// elapsed time is not positive.
pub fn travel_speed_kmh(distance_m: f64, elapsed_secs: f64) -> Option<f64> {
    if elapsed_secs <= 0.0 {
        return None;
    }
    Some((distance_m / 1000.0) / (elapsed_secs / 3600.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(validate_coordinates(45.0, -93.0));
        assert!(validate_coordinates(-90.0, 180.0));
        assert!(!validate_coordinates(90.5, 0.0));
        assert!(!validate_coordinates(0.0, -181.0));
    }

    #[test]
    fn zero_distance_for_same_point() {
        let d = haversine_distance_m(44.98, -93.26, 44.98, -93.26);
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn known_distance_is_close() {
        // Minneapolis -> Saint Paul, roughly 13.5 km.
        let d = haversine_distance_m(44.9778, -93.2650, 44.9537, -93.0900);
        assert!(d > 12_000.0 && d < 16_000.0, "got {d}");
    }

    #[test]
    fn one_degree_latitude_is_about_111_km() {
        let d = haversine_distance_m(10.0, 20.0, 11.0, 20.0);
        assert!((d - 111_195.0).abs() < 200.0, "got {d}");
    }

    #[test]
    fn travel_speed_handles_degenerate_time() {
        assert!(travel_speed_kmh(1000.0, 0.0).is_none());
        let v = travel_speed_kmh(100_000.0, 3600.0).unwrap();
        assert!((v - 100.0).abs() < 1e-9);
    }
}
