//! Directions results: decoded, offset-corrected and ready to render.

use crate::api::{Maneuver, RouteResponse, Summary, Trip};
use crate::polyline::{self, SERVICE_PRECISION};
use foundation::bounds::GeoBounds;
use foundation::coords::LatLng;
use serde_json::Value;
use tracing::{debug, warn};

/// Which route of a result set a value refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RouteKind {
    Main,
    Alternate(usize),
}

impl RouteKind {
    /// Index used on the JS side: `-1` for the main route.
    pub fn to_raw(self) -> i32 {
        match self {
            RouteKind::Main => -1,
            RouteKind::Alternate(i) => i as i32,
        }
    }

    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            -1 => Some(RouteKind::Main),
            i if i >= 0 => Some(RouteKind::Alternate(i as usize)),
            _ => None,
        }
    }

    pub fn is_main(self) -> bool {
        self == RouteKind::Main
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RouteKind::Main => "main",
            RouteKind::Alternate(_) => "alternate",
        }
    }
}

impl std::fmt::Display for RouteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteKind::Main => write!(f, "main route"),
            RouteKind::Alternate(i) => write!(f, "alternate {i}"),
        }
    }
}

/// Trip data that passed decoding but breaks an invariant downstream code
/// indexes by.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeError {
    /// A trip is present but its geometry has fewer than two points.
    DegenerateGeometry { kind: RouteKind, points: usize },
    /// A maneuver points outside its own leg's shape.
    ManeuverOutOfRange {
        kind: RouteKind,
        leg: usize,
        maneuver: usize,
        end_shape_index: usize,
        leg_points: usize,
    },
}

impl std::fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormalizeError::DegenerateGeometry { kind, points } => {
                write!(f, "{kind} has {points} geometry point(s), need at least 2")
            }
            NormalizeError::ManeuverOutOfRange {
                kind,
                leg,
                maneuver,
                end_shape_index,
                leg_points,
            } => write!(
                f,
                "{kind} leg {leg} maneuver {maneuver} ends at shape index {end_shape_index}, \
                 but the leg has {leg_points} point(s)"
            ),
        }
    }
}

impl std::error::Error for NormalizeError {}

/// One computed route with its decoded geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    pub kind: RouteKind,
    pub trip: Trip,
    /// All legs concatenated, `[lat, lng]`. The point shared by two adjacent
    /// legs appears once.
    pub decoded_geometry: Vec<LatLng>,
    /// Offset of each leg's first point within `decoded_geometry`.
    pub leg_start_indices: Vec<usize>,
}

impl RouteResult {
    pub fn summary(&self) -> &Summary {
        &self.trip.summary
    }

    pub fn point_count(&self) -> usize {
        self.decoded_geometry.len()
    }

    /// Absolute `[begin, end]` geometry indices of a maneuver.
    pub fn maneuver_range(&self, leg: usize, maneuver: usize) -> Option<(usize, usize)> {
        let offset = *self.leg_start_indices.get(leg)?;
        let m = self.trip.legs.get(leg)?.maneuvers.get(maneuver)?;
        Some((offset + m.begin_shape_index, offset + m.end_shape_index))
    }

    /// Every maneuver with its leg index and absolute geometry range.
    pub fn maneuvers(&self) -> impl Iterator<Item = (usize, &Maneuver, (usize, usize))> + '_ {
        self.trip
            .legs
            .iter()
            .zip(&self.leg_start_indices)
            .enumerate()
            .flat_map(|(leg_index, (leg, &offset))| {
                leg.maneuvers.iter().map(move |m| {
                    (
                        leg_index,
                        m,
                        (offset + m.begin_shape_index, offset + m.end_shape_index),
                    )
                })
            })
    }

    pub fn bounds(&self) -> Option<GeoBounds> {
        GeoBounds::from_points(self.decoded_geometry.iter().copied())
    }
}

/// A main route plus its alternates, replaced wholesale on every fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSet {
    pub main: RouteResult,
    pub alternates: Vec<RouteResult>,
    /// The response exactly as received, for the JSON export.
    pub raw: Value,
}

impl RouteSet {
    pub fn get(&self, kind: RouteKind) -> Option<&RouteResult> {
        match kind {
            RouteKind::Main => Some(&self.main),
            RouteKind::Alternate(i) => self.alternates.get(i),
        }
    }

    /// Main first, then alternates in service order.
    pub fn routes(&self) -> impl Iterator<Item = &RouteResult> + '_ {
        std::iter::once(&self.main).chain(self.alternates.iter())
    }

    pub fn kinds(&self) -> impl Iterator<Item = RouteKind> + '_ {
        self.routes().map(|r| r.kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Found(RouteSet),
    /// No usable trip: missing, malformed, errored or undecodable. Shown as
    /// "No route found".
    NoRoute { reason: String },
    /// A trip decoded but cannot be indexed safely. Recoverable: the caller
    /// reports it instead of drawing an empty map.
    IntegrityError(NormalizeError),
}

impl RouteOutcome {
    pub fn route_set(&self) -> Option<&RouteSet> {
        match self {
            RouteOutcome::Found(set) => Some(set),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, RouteOutcome::Found(_))
    }
}

enum TripFailure {
    NoRoute(String),
    Integrity(NormalizeError),
}

/// Normalizes a `/route` response. Never panics and never fails: every
/// problem is folded into the outcome.
pub fn normalize_route(raw: Value) -> RouteOutcome {
    let response: RouteResponse = match serde_json::from_value(raw.clone()) {
        Ok(r) => r,
        Err(e) => {
            return RouteOutcome::NoRoute {
                reason: format!("unexpected response shape: {e}"),
            };
        }
    };
    let Some(trip_value) = response.trip else {
        return RouteOutcome::NoRoute {
            reason: "response has no trip".to_string(),
        };
    };

    let main = match normalize_trip(trip_value, RouteKind::Main) {
        Ok(r) => r,
        Err(TripFailure::NoRoute(reason)) => return RouteOutcome::NoRoute { reason },
        Err(TripFailure::Integrity(e)) => {
            warn!(error = %e, "route failed integrity check");
            return RouteOutcome::IntegrityError(e);
        }
    };

    let mut alternates = Vec::with_capacity(response.alternates.len());
    for alt in response.alternates {
        let kind = RouteKind::Alternate(alternates.len());
        let Some(trip_value) = alt.get("trip").cloned() else {
            warn!(%kind, "alternate without trip skipped");
            continue;
        };
        match normalize_trip(trip_value, kind) {
            Ok(r) => alternates.push(r),
            Err(TripFailure::NoRoute(reason)) => warn!(%kind, %reason, "alternate skipped"),
            Err(TripFailure::Integrity(e)) => warn!(%kind, error = %e, "alternate skipped"),
        }
    }

    debug!(
        points = main.decoded_geometry.len(),
        legs = main.trip.legs.len(),
        alternates = alternates.len(),
        "route normalized"
    );
    RouteOutcome::Found(RouteSet {
        main,
        alternates,
        raw,
    })
}

/// Parses and normalizes a `/route` body.
pub fn normalize_route_str(body: &str) -> RouteOutcome {
    match serde_json::from_str(body) {
        Ok(v) => normalize_route(v),
        Err(e) => RouteOutcome::NoRoute {
            reason: format!("invalid JSON: {e}"),
        },
    }
}

fn normalize_trip(value: Value, kind: RouteKind) -> Result<RouteResult, TripFailure> {
    let trip: Trip = serde_json::from_value(value)
        .map_err(|e| TripFailure::NoRoute(format!("malformed trip: {e}")))?;
    if trip.status != 0 {
        return Err(TripFailure::NoRoute(format!(
            "trip status {}: {}",
            trip.status, trip.status_message
        )));
    }

    let mut geometry: Vec<LatLng> = Vec::new();
    let mut starts = Vec::with_capacity(trip.legs.len());

    for (leg_index, leg) in trip.legs.iter().enumerate() {
        let points = polyline::decode(&leg.shape, SERVICE_PRECISION)
            .map_err(|e| TripFailure::NoRoute(format!("leg {leg_index}: {e}")))?;

        for (maneuver, m) in leg.maneuvers.iter().enumerate() {
            if m.end_shape_index >= points.len() || m.begin_shape_index > m.end_shape_index {
                return Err(TripFailure::Integrity(NormalizeError::ManeuverOutOfRange {
                    kind,
                    leg: leg_index,
                    maneuver,
                    end_shape_index: m.end_shape_index,
                    leg_points: points.len(),
                }));
            }
        }

        // Adjacent legs share their junction point.
        let shares_junction = matches!(
            (geometry.last(), points.first()),
            (Some(last), Some(first)) if last == first
        );
        if shares_junction {
            starts.push(geometry.len() - 1);
            geometry.extend_from_slice(&points[1..]);
        } else {
            starts.push(geometry.len());
            geometry.extend(points);
        }
    }

    if geometry.len() < 2 {
        return Err(TripFailure::Integrity(NormalizeError::DegenerateGeometry {
            kind,
            points: geometry.len(),
        }));
    }

    Ok(RouteResult {
        kind,
        trip,
        decoded_geometry: geometry,
        leg_start_indices: starts,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{NormalizeError, RouteKind, RouteOutcome, normalize_route, normalize_route_str};
    use crate::polyline::{SERVICE_PRECISION, encode};
    use foundation::coords::LatLng;
    use serde_json::{Value, json};

    pub(crate) fn line(points: &[(f64, f64)]) -> Vec<LatLng> {
        points.iter().map(|&(lat, lng)| LatLng::new(lat, lng)).collect()
    }

    /// A leg whose single "continue" maneuver spans the whole shape, followed by
    /// an arrival maneuver on the last point.
    pub(crate) fn leg_json(points: &[LatLng]) -> Value {
        let last = points.len().saturating_sub(1);
        json!({
            "shape": encode(points, SERVICE_PRECISION),
            "summary": {"length": 1.0, "time": 60.0},
            "maneuvers": [
                {"type": 1, "instruction": "Drive north.", "length": 1.0, "time": 60.0,
                 "begin_shape_index": 0, "end_shape_index": last},
                {"type": 4, "instruction": "You have arrived.", "length": 0.0, "time": 0.0,
                 "begin_shape_index": last, "end_shape_index": last}
            ]
        })
    }

    pub(crate) fn trip_json(legs: Vec<Value>) -> Value {
        json!({
            "status": 0,
            "status_message": "Found route between points",
            "units": "kilometers",
            "language": "en-US",
            "summary": {"length": 2.0, "time": 120.0, "has_toll": false},
            "legs": legs
        })
    }

    fn three_leg_response() -> Value {
        let a = line(&[(52.0, 13.0), (52.1, 13.0), (52.2, 13.0)]);
        let b = line(&[(52.2, 13.0), (52.2, 13.1)]);
        let c = line(&[(52.2, 13.1), (52.3, 13.1), (52.3, 13.2), (52.4, 13.2)]);
        json!({"trip": trip_json(vec![leg_json(&a), leg_json(&b), leg_json(&c)])})
    }

    #[test]
    fn concatenates_legs_and_offsets_maneuvers() {
        let RouteOutcome::Found(set) = normalize_route(three_leg_response()) else {
            panic!("expected a route");
        };
        let main = &set.main;
        assert_eq!(main.kind, RouteKind::Main);
        // 3 + 2 + 4 points minus two shared junctions.
        assert_eq!(main.point_count(), 7);
        assert_eq!(main.leg_start_indices, vec![0, 2, 3]);
        assert_eq!(main.maneuver_range(2, 0), Some((3, 6)));
        assert_eq!(main.decoded_geometry[3], LatLng::new(52.2, 13.1));
    }

    #[test]
    fn leg_offsets_follow_previous_leg_end() {
        let RouteOutcome::Found(set) = normalize_route(three_leg_response()) else {
            panic!("expected a route");
        };
        let main = &set.main;
        assert!(main.trip.legs.len() >= 2);
        for i in 0..main.trip.legs.len() - 1 {
            let last = main.trip.legs[i].maneuvers.last().unwrap();
            assert_eq!(
                main.leg_start_indices[i + 1],
                main.leg_start_indices[i] + last.end_shape_index
            );
            // Leg i+1 begins exactly where leg i's last maneuver ends.
            assert_eq!(
                main.maneuver_range(i, main.trip.legs[i].maneuvers.len() - 1)
                    .map(|r| r.1),
                Some(main.leg_start_indices[i + 1])
            );
        }
        let first_leg_end = main.trip.legs[0].maneuvers.last().unwrap().end_shape_index;
        assert_eq!(main.leg_start_indices[1], first_leg_end);
    }

    #[test]
    fn missing_trip_is_no_route() {
        let out = normalize_route(json!({"error_code": 442, "error": "No path could be found"}));
        assert!(matches!(out, RouteOutcome::NoRoute { .. }));
    }

    #[test]
    fn malformed_trip_is_no_route() {
        let out = normalize_route(json!({"trip": {"legs": "nope"}}));
        assert!(matches!(out, RouteOutcome::NoRoute { .. }));
        assert!(matches!(
            normalize_route_str("{not json"),
            RouteOutcome::NoRoute { .. }
        ));
    }

    #[test]
    fn undecodable_shape_is_no_route() {
        let leg = json!({"shape": "_p~iF", "maneuvers": []});
        let out = normalize_route(json!({"trip": trip_json(vec![leg])}));
        let RouteOutcome::NoRoute { reason } = out else {
            panic!("expected no route");
        };
        assert!(reason.contains("leg 0"), "{reason}");
    }

    #[test]
    fn errored_status_is_no_route() {
        let mut trip = trip_json(vec![leg_json(&line(&[(0.0, 0.0), (0.1, 0.1)]))]);
        trip["status"] = json!(171);
        assert!(matches!(
            normalize_route(json!({ "trip": trip })),
            RouteOutcome::NoRoute { .. }
        ));
    }

    #[test]
    fn empty_geometry_is_integrity_error() {
        let leg = json!({"shape": "", "maneuvers": []});
        let out = normalize_route(json!({"trip": trip_json(vec![leg])}));
        assert_eq!(
            out,
            RouteOutcome::IntegrityError(NormalizeError::DegenerateGeometry {
                kind: RouteKind::Main,
                points: 0
            })
        );
    }

    #[test]
    fn maneuver_past_leg_end_is_integrity_error() {
        let mut leg = leg_json(&line(&[(0.0, 0.0), (0.1, 0.1)]));
        leg["maneuvers"][0]["end_shape_index"] = json!(9);
        let out = normalize_route(json!({"trip": trip_json(vec![leg])}));
        assert!(matches!(
            out,
            RouteOutcome::IntegrityError(NormalizeError::ManeuverOutOfRange { leg: 0, maneuver: 0, .. })
        ));
    }

    #[test]
    fn alternates_are_normalized_independently() {
        let main = line(&[(0.0, 0.0), (0.1, 0.1)]);
        let alt = line(&[(0.0, 0.0), (0.05, 0.0), (0.1, 0.1)]);
        let raw = json!({
            "trip": trip_json(vec![leg_json(&main)]),
            "alternates": [
                {"trip": trip_json(vec![leg_json(&alt)])},
                {"trip": {"legs": 3}}
            ]
        });
        let RouteOutcome::Found(set) = normalize_route(raw.clone()) else {
            panic!("expected a route");
        };
        assert_eq!(set.alternates.len(), 1);
        assert_eq!(set.alternates[0].kind, RouteKind::Alternate(0));
        assert_eq!(set.alternates[0].point_count(), 3);
        assert_eq!(set.kinds().count(), 2);
        assert_eq!(set.raw, raw);
    }

    #[test]
    fn raw_route_kind_round_trips() {
        for kind in [RouteKind::Main, RouteKind::Alternate(0), RouteKind::Alternate(3)] {
            assert_eq!(RouteKind::from_raw(kind.to_raw()), Some(kind));
        }
        assert_eq!(RouteKind::from_raw(-2), None);
    }
}
