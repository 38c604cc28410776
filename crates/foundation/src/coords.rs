//! Nominal coordinate types.
//!
//! The routing service and the decoded route geometry use `[lat, lng]`, while
//! GeoJSON and the map library use `[lng, lat]`. The two orders are separate
//! types so that mixing them up is a type error rather than a misplaced marker.
//! The only way across is `From`, which swaps the axes.

/// A WGS84 position in routing-service order (`[lat, lng]`).
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// A WGS84 position in GeoJSON order (`[lng, lat]`).
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn from_array(a: [f64; 2]) -> Self {
        Self::new(a[0], a[1])
    }

    pub fn as_array(self) -> [f64; 2] {
        [self.lat, self.lng]
    }

    /// True if both axes are finite and within the WGS84 ranges.
    pub fn is_valid(self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Fixed-precision label, as shown in popups and copied to the clipboard.
    pub fn label(self, decimals: usize) -> String {
        format!("{:.*}, {:.*}", decimals, self.lat, decimals, self.lng)
    }
}

impl LngLat {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    pub fn from_array(a: [f64; 2]) -> Self {
        Self::new(a[0], a[1])
    }

    pub fn as_array(self) -> [f64; 2] {
        [self.lng, self.lat]
    }

    pub fn is_valid(self) -> bool {
        LatLng::from(self).is_valid()
    }
}

impl From<LatLng> for LngLat {
    fn from(p: LatLng) -> Self {
        LngLat::new(p.lng, p.lat)
    }
}

impl From<LngLat> for LatLng {
    fn from(p: LngLat) -> Self {
        LatLng::new(p.lat, p.lng)
    }
}

/// Converts a decoded route geometry to map order.
pub fn to_lng_lat(coords: &[LatLng]) -> Vec<LngLat> {
    coords.iter().copied().map(LngLat::from).collect()
}

#[cfg(test)]
mod tests {
    use super::{LatLng, LngLat, to_lng_lat};

    #[test]
    fn conversion_swaps_axes() {
        let p = LatLng::new(52.5, 13.4);
        let q = LngLat::from(p);
        assert_eq!(q.as_array(), [13.4, 52.5]);
        assert_eq!(LatLng::from(q), p);
    }

    #[test]
    fn array_constructors_respect_order() {
        assert_eq!(LatLng::from_array([1.0, 2.0]), LatLng::new(1.0, 2.0));
        assert_eq!(LngLat::from_array([1.0, 2.0]).lat, 2.0);
    }

    #[test]
    fn rejects_out_of_range_and_nan() {
        assert!(LatLng::new(45.0, 170.0).is_valid());
        assert!(!LatLng::new(91.0, 0.0).is_valid());
        assert!(!LatLng::new(0.0, f64::NAN).is_valid());
        // lng 100 is fine, but as a latitude it is not.
        assert!(!LngLat::new(10.0, 100.0).is_valid());
    }

    #[test]
    fn converts_sequences() {
        let line = vec![LatLng::new(1.0, 2.0), LatLng::new(3.0, 4.0)];
        let out = to_lng_lat(&line);
        assert_eq!(out, vec![LngLat::new(2.0, 1.0), LngLat::new(4.0, 3.0)]);
    }

    #[test]
    fn label_uses_fixed_decimals() {
        assert_eq!(LatLng::new(1.5, -2.25).label(3), "1.500, -2.250");
    }
}
