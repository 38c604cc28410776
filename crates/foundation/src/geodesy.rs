use crate::coords::LatLng;

/// WGS84 semi-major axis (meters).
pub const WGS84_A: f64 = 6_378_137.0;
/// Mean Earth radius used for great-circle distances (meters).
pub const EARTH_MEAN_RADIUS: f64 = 6_371_008.8;

/// Great-circle distance between two positions (meters, haversine).
pub fn haversine_m(a: LatLng, b: LatLng) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_MEAN_RADIUS * h.sqrt().min(1.0).asin()
}

/// Cumulative distance along `line`, starting at 0.0 for the first point.
pub fn cumulative_distances_m(line: &[LatLng]) -> Vec<f64> {
    let mut out = Vec::with_capacity(line.len());
    let mut total = 0.0;
    for (i, p) in line.iter().enumerate() {
        if i > 0 {
            total += haversine_m(line[i - 1], *p);
        }
        out.push(total);
    }
    out
}
