//! Wire types for the routing service responses.
//!
//! Only the fields the front-end reads are modelled; everything is defaulted
//! so that partial or older responses still deserialize.

use foundation::coords::{LatLng, LngLat};
use serde::{Deserialize, Serialize};

/// Maneuver types that describe arriving at a location.
pub const ARRIVAL_MANEUVER_TYPES: [u32; 3] = [4, 5, 6];

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    /// Kilometers (or miles, following `Trip::units`).
    #[serde(default)]
    pub length: f64,
    /// Seconds.
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub has_toll: bool,
    #[serde(default)]
    pub has_ferry: bool,
    #[serde(default)]
    pub has_highway: bool,
    #[serde(default)]
    pub has_time_restrictions: bool,
    #[serde(default)]
    pub min_lat: f64,
    #[serde(default)]
    pub min_lon: f64,
    #[serde(default)]
    pub max_lat: f64,
    #[serde(default)]
    pub max_lon: f64,
    #[serde(default)]
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Maneuver {
    #[serde(rename = "type", default)]
    pub maneuver_type: u32,
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub begin_shape_index: usize,
    #[serde(default)]
    pub end_shape_index: usize,
    #[serde(default)]
    pub toll: bool,
    #[serde(default)]
    pub ferry: bool,
    #[serde(default)]
    pub rough: bool,
    #[serde(default)]
    pub street_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_mode: Option<String>,
}

impl Maneuver {
    pub fn is_arrival(&self) -> bool {
        ARRIVAL_MANEUVER_TYPES.contains(&self.maneuver_type)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Leg {
    #[serde(default)]
    pub maneuvers: Vec<Maneuver>,
    #[serde(default)]
    pub summary: Summary,
    /// Encoded at [`crate::polyline::SERVICE_PRECISION`].
    #[serde(default)]
    pub shape: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TripLocation {
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub location_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trip {
    #[serde(default)]
    pub locations: Vec<TripLocation>,
    pub legs: Vec<Leg>,
    #[serde(default)]
    pub summary: Summary,
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub status_message: String,
    #[serde(default)]
    pub units: String,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AlternateResponse {
    pub trip: Trip,
}

/// `POST /route` response.
///
/// `trip` is deliberately kept as raw JSON: a malformed trip must become a
/// "no route" outcome, not a deserialization failure of the whole response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RouteResponse {
    #[serde(default)]
    pub trip: Option<serde_json::Value>,
    #[serde(default)]
    pub alternates: Vec<serde_json::Value>,
}

/// Error body returned by the routing service for non-2xx responses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServiceErrorBody {
    #[serde(default)]
    pub error_code: i64,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub status_code: i64,
    #[serde(default)]
    pub status: String,
}

/// `POST /height` response. Either `height` or `range_height` is present,
/// depending on the `range` flag of the request. Missing samples are `null`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct HeightResponse {
    #[serde(default)]
    pub height: Vec<Option<f64>>,
    #[serde(default)]
    pub range_height: Vec<[Option<f64>; 2]>,
}

impl HeightResponse {
    /// Elevation samples in request order; missing samples become `None`.
    pub fn elevations(&self) -> Vec<Option<f64>> {
        if !self.range_height.is_empty() {
            return self.range_height.iter().map(|pair| pair[1]).collect();
        }
        self.height.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LocateEdge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub way_id: Option<u64>,
    #[serde(default)]
    pub correlated_lat: f64,
    #[serde(default)]
    pub correlated_lon: f64,
    #[serde(default)]
    pub side_of_street: String,
    #[serde(default)]
    pub percent_along: f64,
}

/// One element of the `POST /locate` response array.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LocateResult {
    #[serde(default)]
    pub input_lat: f64,
    #[serde(default)]
    pub input_lon: f64,
    #[serde(default)]
    pub edges: Option<Vec<LocateEdge>>,
}

impl LocateResult {
    pub fn edges(&self) -> &[LocateEdge] {
        self.edges.as_deref().unwrap_or(&[])
    }
}

/// `GET /status` response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub tileset_last_modified: i64,
    #[serde(default)]
    pub version: String,
}

/// A geocoding hit, as stored per waypoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Position of this hit within the result list it came from.
    pub address_index: usize,
    /// Where the marker is drawn.
    pub display_lng_lat: [f64; 2],
    /// The raw position the service returned (or the clicked point).
    pub source_lng_lat: [f64; 2],
    #[serde(default)]
    pub selected: bool,
}

impl GeocodeResult {
    /// A synthetic hit for a raw map position (context menu, drag, locate-me).
    pub fn from_position(position: LatLng) -> Self {
        let lng_lat = LngLat::from(position).as_array();
        Self {
            title: position.label(6),
            description: String::new(),
            address_index: 0,
            display_lng_lat: lng_lat,
            source_lng_lat: lng_lat,
            selected: true,
        }
    }

    pub fn display_position(&self) -> LatLng {
        LatLng::from(LngLat::from_array(self.display_lng_lat))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum NominatimReverse {
    Place(NominatimPlace),
    Error { error: String },
}

/// Parses a forward-geocoding (search) response. Entries with unparsable
/// coordinates are skipped; the remaining hits keep consecutive indices.
pub fn parse_geocode_search(body: &str) -> Result<Vec<GeocodeResult>, serde_json::Error> {
    let places: Vec<NominatimPlace> = serde_json::from_str(body)?;
    let mut out = Vec::with_capacity(places.len());
    for place in places {
        let Some(position) = place_position(&place) else {
            continue;
        };
        let lng_lat = LngLat::from(position).as_array();
        out.push(GeocodeResult {
            title: place.display_name,
            description: String::new(),
            address_index: out.len(),
            display_lng_lat: lng_lat,
            source_lng_lat: lng_lat,
            selected: false,
        });
    }
    Ok(out)
}

/// Parses a reverse-geocoding response for the clicked `position`.
///
/// The marker stays at the clicked position even when the service resolves an
/// address; when the service has nothing, the coordinate itself is the title.
pub fn parse_geocode_reverse(
    body: &str,
    position: LatLng,
) -> Result<Vec<GeocodeResult>, serde_json::Error> {
    let parsed: NominatimReverse = serde_json::from_str(body)?;
    let clicked = LngLat::from(position).as_array();
    let result = match parsed {
        NominatimReverse::Place(place) => {
            let source = place_position(&place)
                .map(|p| LngLat::from(p).as_array())
                .unwrap_or(clicked);
            GeocodeResult {
                title: place.display_name,
                description: position.label(6),
                address_index: 0,
                display_lng_lat: clicked,
                source_lng_lat: source,
                selected: true,
            }
        }
        NominatimReverse::Error { .. } => GeocodeResult::from_position(position),
    };
    Ok(vec![result])
}

fn place_position(place: &NominatimPlace) -> Option<LatLng> {
    let lat = place.lat.trim().parse::<f64>().ok()?;
    let lng = place.lon.trim().parse::<f64>().ok()?;
    let p = LatLng::new(lat, lng);
    p.is_valid().then_some(p)
}

#[cfg(test)]
mod tests {
    use super::{
        HeightResponse, LocateResult, Maneuver, StatusResponse, parse_geocode_reverse,
        parse_geocode_search,
    };
    use foundation::coords::LatLng;

    #[test]
    fn arrival_types_are_flagged() {
        for (t, arrival) in [(1, false), (4, true), (5, true), (6, true), (10, false)] {
            let m = Maneuver {
                maneuver_type: t,
                ..Maneuver::default()
            };
            assert_eq!(m.is_arrival(), arrival, "type {t}");
        }
    }

    #[test]
    fn height_response_supports_both_shapes() {
        let plain: HeightResponse = serde_json::from_str(r#"{"height":[10,null,12]}"#).unwrap();
        assert_eq!(plain.elevations(), vec![Some(10.0), None, Some(12.0)]);

        let range: HeightResponse =
            serde_json::from_str(r#"{"range_height":[[0,100],[35.5,103]]}"#).unwrap();
        assert_eq!(range.elevations(), vec![Some(100.0), Some(103.0)]);
    }

    #[test]
    fn locate_tolerates_null_edges() {
        let r: Vec<LocateResult> =
            serde_json::from_str(r#"[{"input_lat":1.0,"input_lon":2.0,"edges":null}]"#).unwrap();
        assert!(r[0].edges().is_empty());
    }

    #[test]
    fn status_parses_timestamp() {
        let s: StatusResponse =
            serde_json::from_str(r#"{"version":"3.4.0","tileset_last_modified":1700000000}"#)
                .unwrap();
        assert_eq!(s.tileset_last_modified, 1_700_000_000);
    }

    #[test]
    fn search_skips_bad_coordinates() {
        let body = r#"[
            {"lat":"52.5","lon":"13.4","display_name":"Berlin"},
            {"lat":"oops","lon":"13.4","display_name":"Broken"},
            {"lat":"48.1","lon":"11.5","display_name":"Munich"}
        ]"#;
        let hits = parse_geocode_search(body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].title, "Munich");
        assert_eq!(hits[1].address_index, 1);
        assert_eq!(hits[0].display_lng_lat, [13.4, 52.5]);
    }

    #[test]
    fn reverse_falls_back_to_coordinates() {
        let p = LatLng::new(1.0, 2.0);
        let hits = parse_geocode_reverse(r#"{"error":"Unable to geocode"}"#, p).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "1.000000, 2.000000");
        assert!(hits[0].selected);
        assert_eq!(hits[0].display_position(), p);
    }

    #[test]
    fn reverse_keeps_marker_at_click() {
        let p = LatLng::new(52.5, 13.4);
        let body = r#"{"lat":"52.5001","lon":"13.4002","display_name":"Unter den Linden"}"#;
        let hits = parse_geocode_reverse(body, p).unwrap();
        assert_eq!(hits[0].title, "Unter den Linden");
        assert_eq!(hits[0].display_lng_lat, [13.4, 52.5]);
        assert_eq!(hits[0].source_lng_lat, [13.4002, 52.5001]);
    }
}
