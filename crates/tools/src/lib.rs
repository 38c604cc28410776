//! Offline inspection of saved routing-service responses.
//!
//! Every command takes response bodies as strings and returns the text to
//! print, so the binary is only argument parsing and file I/O.

use compute::heightgraph::{HeightgraphDataset, sample_shape};
use formats::api::HeightResponse;
use formats::display::{format_duration, format_length};
use formats::export::{ExportFormat, isochrone_geojson, route_geojson, to_pretty_json};
use formats::isochrone::{IsochroneOutcome, normalize_isochrone};
use formats::normalize::Normalized;
use formats::permalink::{PermalinkError, PermalinkParams};
use formats::polyline::{self, DecodeError};
use formats::route::{RouteOutcome, RouteResult, normalize_route};
use layers::narrative::maneuver_rows;
use serde_json::{Value, json};

#[derive(Debug)]
pub enum ToolError {
    Json(String),
    Decode(DecodeError),
    Permalink(PermalinkError),
    /// The response did not contain what the command needs.
    NoResult(String),
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolError::Json(e) => write!(f, "invalid JSON: {e}"),
            ToolError::Decode(e) => write!(f, "{e}"),
            ToolError::Permalink(e) => write!(f, "{e}"),
            ToolError::NoResult(reason) => write!(f, "no result: {reason}"),
        }
    }
}

impl std::error::Error for ToolError {}

impl From<serde_json::Error> for ToolError {
    fn from(e: serde_json::Error) -> Self {
        ToolError::Json(e.to_string())
    }
}

impl From<DecodeError> for ToolError {
    fn from(e: DecodeError) -> Self {
        ToolError::Decode(e)
    }
}

impl From<PermalinkError> for ToolError {
    fn from(e: PermalinkError) -> Self {
        ToolError::Permalink(e)
    }
}

/// `[[lat, lng], ...]` of an encoded shape.
pub fn decode(shape: &str, precision: u32) -> Result<String, ToolError> {
    let points: Vec<[f64; 2]> = polyline::decode(shape.trim(), precision)?
        .into_iter()
        .map(|p| p.as_array())
        .collect();
    Ok(serde_json::to_string(&points)?)
}

fn main_route(body: &str) -> Result<(RouteOutcome, Value), ToolError> {
    let raw: Value = serde_json::from_str(body)?;
    Ok((normalize_route(raw.clone()), raw))
}

fn found(outcome: &RouteOutcome) -> Result<&formats::route::RouteSet, ToolError> {
    match outcome {
        RouteOutcome::Found(set) => Ok(set),
        RouteOutcome::NoRoute { reason } => Err(ToolError::NoResult(reason.clone())),
        RouteOutcome::IntegrityError(e) => Err(ToolError::NoResult(e.to_string())),
    }
}

fn route_summary(route: &RouteResult) -> Value {
    let s = route.summary();
    json!({
        "type": route.kind.as_str(),
        "points": route.decoded_geometry.len(),
        "legs": route.trip.legs.len(),
        "leg_start_indices": route.leg_start_indices,
        "length": format_length(s.length),
        "time": format_duration(s.time),
    })
}

/// Outcome of normalizing a `/route` or `/isochrone` response.
pub fn normalize(body: &str) -> Result<String, ToolError> {
    let out = match formats::normalize::normalize(serde_json::from_str(body)?) {
        Normalized::Isochrone(IsochroneOutcome::Found(result)) => json!({
            "outcome": "found",
            "polygons": result.polygons().count(),
            "locations": result.locations().count(),
        }),
        Normalized::Isochrone(IsochroneOutcome::NoResult { reason }) => {
            json!({ "outcome": "no_result", "reason": reason })
        }
        Normalized::Route(RouteOutcome::Found(set)) => json!({
            "outcome": "found",
            "routes": set.routes().map(route_summary).collect::<Vec<_>>(),
        }),
        Normalized::Route(RouteOutcome::NoRoute { reason }) => {
            json!({ "outcome": "no_route", "reason": reason })
        }
        Normalized::Route(RouteOutcome::IntegrityError(e)) => {
            json!({ "outcome": "integrity_error", "error": e.to_string() })
        }
    };
    Ok(serde_json::to_string_pretty(&out)?)
}

/// Maneuver list of the main route, one line per maneuver.
pub fn narrative(body: &str) -> Result<String, ToolError> {
    let (outcome, _) = main_route(body)?;
    let set = found(&outcome)?;
    let lines: Vec<String> = maneuver_rows(&set.main)
        .into_iter()
        .map(|row| match (row.length, row.time) {
            (Some(l), Some(t)) => format!("{}\t{l}\t{t}", row.instruction),
            _ => row.instruction,
        })
        .collect();
    Ok(lines.join("\n"))
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    Directions,
    Isochrones,
}

/// File contents the web front would offer for download.
pub fn export(body: &str, target: ExportTarget, format: ExportFormat) -> Result<String, ToolError> {
    match target {
        ExportTarget::Directions => {
            let (outcome, raw) = main_route(body)?;
            let set = found(&outcome)?;
            match format {
                ExportFormat::Json => Ok(to_pretty_json(&raw)?),
                ExportFormat::GeoJson => Ok(route_geojson(&set.main)?),
            }
        }
        ExportTarget::Isochrones => {
            let raw: Value = serde_json::from_str(body)?;
            let outcome = normalize_isochrone(raw);
            let result = outcome
                .result()
                .ok_or_else(|| ToolError::NoResult("isochrone response has no features".into()))?;
            match format {
                ExportFormat::Json => Ok(to_pretty_json(&result.raw)?),
                ExportFormat::GeoJson => Ok(isochrone_geojson(result)?),
            }
        }
    }
}

/// Elevation profile of the main route. `height_body` answers a `/height`
/// request for the route shape reduced to `max_points`.
pub fn heightgraph(
    route_body: &str,
    height_body: &str,
    max_points: usize,
) -> Result<String, ToolError> {
    let (outcome, _) = main_route(route_body)?;
    let set = found(&outcome)?;
    let shape = sample_shape(&set.main.decoded_geometry, max_points);
    let heights: HeightResponse = serde_json::from_str(height_body)?;
    let dataset = HeightgraphDataset::build(&shape, &heights.elevations())
        .map_err(|e| ToolError::NoResult(e.to_string()))?;
    let (min, max) = dataset.elevation_range().unwrap_or((0.0, 0.0));
    let runs: Vec<Value> = dataset
        .runs
        .iter()
        .map(|r| {
            json!({
                "level": r.bucket.level(),
                "from_m": dataset.samples[r.start].distance.round(),
                "to_m": dataset.samples[r.end].distance.round(),
            })
        })
        .collect();
    Ok(serde_json::to_string_pretty(&json!({
        "samples": dataset.samples.len(),
        "length": format_length(dataset.total_distance() / 1000.0),
        "incline": dataset.incline_total.round(),
        "decline": dataset.decline_total.round(),
        "min_elevation": min,
        "max_elevation": max,
        "runs": runs,
    }))?)
}

/// Parsed permalink parameters; with `rebase`, the same parameters on another
/// base URL.
pub fn permalink(url: &str, rebase: Option<&str>) -> Result<String, ToolError> {
    let params = PermalinkParams::from_url(url)?;
    if let Some(base) = rebase {
        return Ok(params.to_url(base)?);
    }
    let waypoints: Vec<[f64; 2]> = params.waypoints.iter().map(|p| p.as_array()).collect();
    Ok(serde_json::to_string_pretty(&json!({
        "profile": params.profile.map(|p| p.as_str()),
        "waypoints": waypoints,
        "range": params.range,
        "interval": params.interval,
        "denoise": params.denoise,
        "generalize": params.generalize,
        "style": params.style,
    }))?)
}

#[cfg(test)]
mod tests {
    use super::{ExportTarget, ToolError, decode, export, heightgraph, narrative, normalize, permalink};
    use formats::export::ExportFormat;
    use formats::polyline::{SERVICE_PRECISION, encode};
    use foundation::coords::LatLng;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn points() -> Vec<LatLng> {
        vec![
            LatLng::new(52.5, 13.4),
            LatLng::new(52.51, 13.41),
            LatLng::new(52.52, 13.42),
        ]
    }

    fn route_body() -> String {
        json!({"trip": {
            "status": 0,
            "summary": {"length": 2.5, "time": 3725.0},
            "legs": [{
                "shape": encode(&points(), SERVICE_PRECISION),
                "maneuvers": [
                    {"type": 1, "instruction": "Head north.", "length": 2.5, "time": 3725.0,
                     "begin_shape_index": 0, "end_shape_index": 2},
                    {"type": 4, "instruction": "You have arrived.", "length": 0.0, "time": 0.0,
                     "begin_shape_index": 2, "end_shape_index": 2}
                ]
            }]
        }})
        .to_string()
    }

    #[test]
    fn decodes_shape() {
        let out = decode(&encode(&points()[..1], SERVICE_PRECISION), SERVICE_PRECISION).unwrap();
        assert_eq!(out, "[[52.5,13.4]]");
        assert!(matches!(decode("_p~i", 6), Err(ToolError::Decode(_))));
    }

    #[test]
    fn normalizes_route() {
        let out: Value = serde_json::from_str(&normalize(&route_body()).unwrap()).unwrap();
        assert_eq!(out["outcome"], json!("found"));
        assert_eq!(out["routes"][0]["points"], json!(3));
        assert_eq!(out["routes"][0]["time"], json!("1h 2min 5s"));
        assert_eq!(out["routes"][0]["length"], json!("2.50km"));
    }

    #[test]
    fn reports_missing_route() {
        let out: Value = serde_json::from_str(&normalize(r#"{"error":"x"}"#).unwrap()).unwrap();
        assert_eq!(out["outcome"], json!("no_route"));
    }

    #[test]
    fn narrative_omits_arrival_metrics() {
        let out = narrative(&route_body()).unwrap();
        assert_eq!(out, "Head north.\t2.50km\t1h 2min 5s\nYou have arrived.");
    }

    #[test]
    fn exports_linestring() {
        let out = export(&route_body(), ExportTarget::Directions, ExportFormat::GeoJson).unwrap();
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["geometry"]["type"], json!("LineString"));
        assert_eq!(v["geometry"]["coordinates"][0], json!([13.4, 52.5]));
    }

    #[test]
    fn heightgraph_totals() {
        let out = heightgraph(&route_body(), r#"{"height":[30,45,40]}"#, 1000).unwrap();
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["samples"], json!(3));
        assert_eq!(v["incline"], json!(15.0));
        assert_eq!(v["decline"], json!(5.0));
    }

    #[test]
    fn heightgraph_rejects_short_profile() {
        assert!(matches!(
            heightgraph(&route_body(), r#"{"height":[30]}"#, 1000),
            Err(ToolError::NoResult(_))
        ));
    }

    #[test]
    fn permalink_rebases() {
        let url = "https://a.example/?profile=car&wps=13.4,52.5,13.42,52.52";
        let out = permalink(url, Some("https://b.example/")).unwrap();
        assert_eq!(out, "https://b.example/?profile=car&wps=13.4%2C52.5%2C13.42%2C52.52");
        let parsed: Value = serde_json::from_str(&permalink(url, None).unwrap()).unwrap();
        assert_eq!(parsed["waypoints"][1], json!([52.52, 13.42]));
    }
}
