//! Downloadable result files.

use crate::geojson::{Feature, Geometry};
use crate::isochrone::IsochroneResult;
use crate::route::RouteResult;
use foundation::coords::to_lng_lat;
use serde_json::Value;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExportKind {
    Directions,
    Isochrones,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    GeoJson,
}

impl ExportKind {
    fn slug(self) -> &'static str {
        match self {
            ExportKind::Directions => "directions",
            ExportKind::Isochrones => "isochrones",
        }
    }
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::GeoJson => "geojson",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::GeoJson => "application/geo+json",
        }
    }
}

/// `valhalla-directions_1700000000000.geojson`
pub fn export_filename(kind: ExportKind, format: ExportFormat, timestamp_ms: u64) -> String {
    format!(
        "valhalla-{}_{timestamp_ms}.{}",
        kind.slug(),
        format.extension()
    )
}

/// The raw response, pretty-printed.
pub fn to_pretty_json(raw: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(raw)
}

/// A route as a single `LineString` feature with its summary as properties.
pub fn route_feature(route: &RouteResult) -> Feature {
    let mut feature = Feature::new(Geometry::LineString(to_lng_lat(&route.decoded_geometry)))
        .with_property("type", route.kind.as_str());
    if let Ok(Value::Object(summary)) = serde_json::to_value(route.summary()) {
        feature.properties.extend(summary);
    }
    feature
}

pub fn route_geojson(route: &RouteResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&route_feature(route).to_geojson_value())
}

pub fn isochrone_geojson(result: &IsochroneResult) -> Result<String, serde_json::Error> {
    result.collection.to_geojson_string_pretty()
}
