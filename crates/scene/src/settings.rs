//! Request settings: costing, time, exclusions and isochrone contours.

use foundation::coords::LngLat;
use formats::geojson::{Feature, Geometry};
use formats::profile::Profile;
use serde_json::{Map, Value, json};
use streaming::protocol::{Contour, DateTime};
use tracing::debug;

/// Upper bound of the isochrone range slider (minutes).
pub const MAX_ISO_RANGE: u32 = 120;

/// Contour colours, nearest band first.
const CONTOUR_RAMP: [&str; 8] = [
    "ff0000", "ff7f00", "ffbf00", "ffff00", "bfff00", "7fff00", "00ff7f", "00bfff",
];

#[derive(Debug, Clone, PartialEq)]
pub struct DirectionsSettings {
    pub profile: Profile,
    /// Costing options per profile, sent as `costing_options.{costing}`.
    pub costing_options: Map<String, Value>,
    pub alternates: u32,
    pub language: Option<String>,
    pub date_time: Option<DateTime>,
    /// Outer rings of the drawn exclusion polygons.
    pub exclude_polygons: Vec<Vec<LngLat>>,
}

impl Default for DirectionsSettings {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            costing_options: default_costing_options(),
            alternates: 0,
            language: None,
            date_time: None,
            exclude_polygons: Vec::new(),
        }
    }
}

fn default_costing_options() -> Map<String, Value> {
    let v = json!({
        "bicycle": {"bicycle_type": "Hybrid", "use_roads": 0.5, "use_hills": 0.5, "cycling_speed": 20.0},
        "pedestrian": {"walking_speed": 5.1, "use_ferry": 1.0, "use_living_streets": 0.5},
        "auto": {"use_highways": 1.0, "use_tolls": 1.0, "use_ferry": 1.0},
        "truck": {"height": 4.11, "width": 2.6, "length": 21.64, "weight": 21.77, "axle_load": 9.07},
        "bus": {"use_highways": 1.0, "use_tolls": 1.0},
        "motor_scooter": {"top_speed": 45.0, "use_primary": 0.5, "use_hills": 0.5},
        "motorcycle": {"use_highways": 1.0, "use_trails": 0.0}
    });
    match v {
        Value::Object(m) => m,
        _ => Map::new(),
    }
}

impl DirectionsSettings {
    /// `{ "<costing>": {...} }` for the active profile only.
    pub fn costing_options_value(&self) -> Value {
        let costing = self.profile.costing();
        let mut out = Map::new();
        if let Some(opts) = self.costing_options.get(costing) {
            out.insert(costing.to_string(), opts.clone());
        }
        Value::Object(out)
    }

    /// Sets one costing option of the active profile.
    pub fn set_costing_option(&mut self, key: &str, value: Value) {
        let entry = self
            .costing_options
            .entry(self.profile.costing().to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(opts) = entry {
            opts.insert(key.to_string(), value);
        }
    }

    /// Recomputes all exclusion rings from the drawing tool's current feature
    /// set. Returns whether anything changed.
    pub fn sync_exclusions(&mut self, draw_features: &[Feature]) -> bool {
        let mut rings = Vec::new();
        for feature in draw_features {
            match &feature.geometry {
                Geometry::Polygon(poly) => rings.extend(poly.first().cloned()),
                Geometry::MultiPolygon(polys) => {
                    rings.extend(polys.iter().filter_map(|p| p.first().cloned()))
                }
                _ => {}
            }
        }
        rings.retain(|r: &Vec<LngLat>| r.len() >= 3);
        if rings == self.exclude_polygons {
            return false;
        }
        debug!(polygons = rings.len(), "exclusion polygons resynced");
        self.exclude_polygons = rings;
        true
    }

    pub fn exclude_polygons_wire(&self) -> Vec<Vec<[f64; 2]>> {
        self.exclude_polygons
            .iter()
            .map(|ring| ring.iter().map(|p| p.as_array()).collect())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IsochroneSettings {
    pub profile: Profile,
    max_range: u32,
    interval: u32,
    pub denoise: f64,
    pub generalize: f64,
}

impl Default for IsochroneSettings {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            max_range: 10,
            interval: 10,
            denoise: 0.1,
            generalize: 0.0,
        }
    }
}

impl IsochroneSettings {
    pub fn max_range(&self) -> u32 {
        self.max_range
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    /// Sets the range and pulls the interval down with it if needed.
    pub fn set_max_range(&mut self, minutes: u32) {
        self.max_range = minutes.clamp(1, MAX_ISO_RANGE);
        self.interval = self.interval.clamp(1, self.max_range);
    }

    /// Clamps into `[1, max_range]`; `interval == max_range` is allowed.
    pub fn set_interval(&mut self, minutes: u32) {
        self.interval = minutes.clamp(1, self.max_range);
    }

    /// One contour every `interval` minutes. The last one is the largest
    /// multiple of `interval` not above `max_range`, so a remainder is dropped.
    pub fn contours(&self) -> Vec<Contour> {
        (1..=self.max_range / self.interval)
            .map(|i| Contour {
                time: (i * self.interval) as f64,
                color: CONTOUR_RAMP[(i as usize - 1) % CONTOUR_RAMP.len()].to_string(),
            })
            .collect()
    }
}
