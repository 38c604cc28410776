//! Isochrone results: the service's FeatureCollection plus display labels.

use crate::geojson::{Feature, FeatureCollection};
use foundation::bounds::GeoBounds;
use foundation::coords::LatLng;
use serde_json::Value;
use tracing::debug;

/// Point features with this `type` are the submitted locations, not results.
pub const INPUT_LOCATION_TYPE: &str = "input";

#[derive(Debug, Clone, PartialEq)]
pub struct IsochroneResult {
    pub collection: FeatureCollection,
    pub raw: Value,
}

impl IsochroneResult {
    pub fn polygons(&self) -> impl Iterator<Item = &Feature> + '_ {
        self.collection
            .features
            .iter()
            .filter(|f| f.geometry.is_polygonal())
    }

    /// Snapped result locations; the echoed input locations are left out.
    pub fn locations(&self) -> impl Iterator<Item = &Feature> + '_ {
        self.collection.features.iter().filter(|f| {
            f.geometry.is_punctual() && f.property_str("type") != Some(INPUT_LOCATION_TYPE)
        })
    }

    pub fn bounds(&self) -> Option<GeoBounds> {
        let mut points = Vec::new();
        for feature in self.polygons() {
            feature
                .geometry
                .for_each_position(|p| points.push(LatLng::from(p)));
        }
        GeoBounds::from_points(points)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IsochroneOutcome {
    Found(IsochroneResult),
    NoResult { reason: String },
}

impl IsochroneOutcome {
    pub fn result(&self) -> Option<&IsochroneResult> {
        match self {
            IsochroneOutcome::Found(r) => Some(r),
            IsochroneOutcome::NoResult { .. } => None,
        }
    }
}

/// Normalizes an `/isochrone` response. Features pass through unchanged
/// except for the added `label` and `area_label` properties.
pub fn normalize_isochrone(raw: Value) -> IsochroneOutcome {
    let mut collection = match FeatureCollection::from_geojson_value(&raw) {
        Ok(fc) => fc,
        Err(e) => {
            return IsochroneOutcome::NoResult {
                reason: e.to_string(),
            };
        }
    };
    for feature in &mut collection.features {
        attach_display_properties(feature);
    }
    debug!(features = collection.features.len(), "isochrone normalized");
    IsochroneOutcome::Found(IsochroneResult { collection, raw })
}

pub fn normalize_isochrone_str(body: &str) -> IsochroneOutcome {
    match serde_json::from_str(body) {
        Ok(v) => normalize_isochrone(v),
        Err(e) => IsochroneOutcome::NoResult {
            reason: format!("invalid JSON: {e}"),
        },
    }
}

fn attach_display_properties(feature: &mut Feature) {
    if let Some(contour) = feature.property_f64("contour") {
        let unit = match feature.property_str("metric") {
            Some("distance") => "km",
            _ => "min",
        };
        let label = format!("{} {unit}", trim_number(contour));
        feature
            .properties
            .insert("label".to_string(), Value::String(label));
    }
    if let Some(area) = feature.property_f64("area") {
        feature.properties.insert(
            "area_label".to_string(),
            Value::String(format!("{area:.2} km²")),
        );
    }
}

fn trim_number(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}
