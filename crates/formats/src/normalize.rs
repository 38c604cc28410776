use crate::isochrone::{IsochroneOutcome, normalize_isochrone};
use crate::route::{RouteOutcome, normalize_route};
use serde_json::Value;

/// A normalized response of either service.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Route(RouteOutcome),
    Isochrone(IsochroneOutcome),
}

/// Normalizes a response without knowing which endpoint produced it. A
/// FeatureCollection is an isochrone; anything else is treated as directions.
pub fn normalize(raw: Value) -> Normalized {
    let is_collection = raw.get("type").and_then(Value::as_str) == Some("FeatureCollection");
    if is_collection {
        Normalized::Isochrone(normalize_isochrone(raw))
    } else {
        Normalized::Route(normalize_route(raw))
    }
}
