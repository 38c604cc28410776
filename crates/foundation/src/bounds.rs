use crate::coords::LatLng;

/// Axis-aligned geographic bounding box, corners in `[lat, lng]` order.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeoBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl GeoBounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        GeoBounds {
            south_west,
            north_east,
        }
    }

    /// Degenerate box around a single point.
    pub fn point(p: LatLng) -> Self {
        GeoBounds::new(p, p)
    }

    /// Folds min/max over `points`. Returns `None` for an empty input.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = LatLng>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut out = GeoBounds::point(first);
        for p in iter {
            out.extend(p);
        }
        Some(out)
    }

    pub fn extend(&mut self, p: LatLng) {
        self.south_west.lat = self.south_west.lat.min(p.lat);
        self.south_west.lng = self.south_west.lng.min(p.lng);
        self.north_east.lat = self.north_east.lat.max(p.lat);
        self.north_east.lng = self.north_east.lng.max(p.lng);
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut out = *self;
        out.extend(other.south_west);
        out.extend(other.north_east);
        out
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }

    pub fn contains(&self, p: LatLng) -> bool {
        p.lat >= self.south_west.lat
            && p.lat <= self.north_east.lat
            && p.lng >= self.south_west.lng
            && p.lng <= self.north_east.lng
    }

    pub fn is_point(&self) -> bool {
        self.south_west == self.north_east
    }
}
