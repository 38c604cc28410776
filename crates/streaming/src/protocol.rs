//! Request bodies and endpoint URLs of the routing and geocoding services.
//!
//! The routing service takes JSON bodies over `POST`; `/status` is a plain
//! `GET`. Geocoding goes to a separate Nominatim-style endpoint.

use foundation::coords::LatLng;
use formats::profile::Profile;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Endpoint {
    Route,
    Isochrone,
    Height,
    Locate,
    Status,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Route => "route",
            Endpoint::Isochrone => "isochrone",
            Endpoint::Height => "height",
            Endpoint::Locate => "locate",
            Endpoint::Status => "status",
        }
    }

    pub fn method(self) -> &'static str {
        match self {
            Endpoint::Status => "GET",
            _ => "POST",
        }
    }
}

/// `{base}/{path}` regardless of whether `base` ends with a slash.
pub fn endpoint_url(base: &str, endpoint: Endpoint) -> String {
    format!("{}/{}", base.trim_end_matches('/'), endpoint.path())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub location_type: Option<String>,
}

impl From<LatLng> for Location {
    fn from(p: LatLng) -> Self {
        Self {
            lat: p.lat,
            lon: p.lng,
            location_type: None,
        }
    }
}

/// Departure / arrival time constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateTime {
    /// 0 = now, 1 = depart at, 2 = arrive by.
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteRequest {
    pub locations: Vec<Location>,
    pub costing: &'static str,
    pub costing_options: Value,
    pub units: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub alternates: u32,
    pub id: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime>,
    /// Rings of `[lng, lat]` pairs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude_polygons: Vec<Vec<[f64; 2]>>,
}

impl RouteRequest {
    pub fn new(profile: Profile, waypoints: &[LatLng]) -> Self {
        Self {
            locations: waypoints.iter().copied().map(Location::from).collect(),
            costing: profile.costing(),
            costing_options: Value::Object(Default::default()),
            units: "kilometers",
            language: None,
            alternates: 0,
            id: "valhalla_directions",
            date_time: None,
            exclude_polygons: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contour {
    /// Minutes.
    pub time: f64,
    /// Hex colour without the leading `#`.
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IsochroneRequest {
    pub locations: Vec<Location>,
    pub costing: &'static str,
    pub costing_options: Value,
    pub contours: Vec<Contour>,
    pub polygons: bool,
    pub denoise: f64,
    pub generalize: f64,
    pub show_locations: bool,
    pub id: &'static str,
}

impl IsochroneRequest {
    pub fn new(profile: Profile, center: LatLng, contours: Vec<Contour>) -> Self {
        Self {
            locations: vec![Location::from(center)],
            costing: profile.costing(),
            costing_options: Value::Object(Default::default()),
            contours,
            polygons: true,
            denoise: 0.1,
            generalize: 0.0,
            show_locations: true,
            id: "valhalla_isochrones",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapePoint {
    pub lat: f64,
    pub lon: f64,
}

impl From<LatLng> for ShapePoint {
    fn from(p: LatLng) -> Self {
        Self {
            lat: p.lat,
            lon: p.lng,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightRequest {
    pub range: bool,
    pub shape: Vec<ShapePoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl HeightRequest {
    pub fn new(range: bool, shape: &[LatLng]) -> Self {
        Self {
            range,
            shape: shape.iter().copied().map(ShapePoint::from).collect(),
            id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocateRequest {
    pub locations: Vec<Location>,
    pub costing: &'static str,
    pub verbose: bool,
    pub id: &'static str,
}

impl LocateRequest {
    pub fn new(profile: Profile, point: LatLng) -> Self {
        Self {
            locations: vec![Location::from(point)],
            costing: profile.costing(),
            verbose: true,
            id: "valhalla_locate",
        }
    }
}

/// Forward geocoding URL (search as you type).
pub fn search_url(geocoder_base: &str, query: &str, limit: u32) -> Result<String, url::ParseError> {
    let mut url = Url::parse(geocoder_base)?.join("search")?;
    url.query_pairs_mut()
        .append_pair("q", query)
        .append_pair("format", "json")
        .append_pair("limit", &limit.to_string());
    Ok(url.into())
}

/// Reverse geocoding URL for a clicked or dragged position.
pub fn reverse_url(geocoder_base: &str, position: LatLng) -> Result<String, url::ParseError> {
    let mut url = Url::parse(geocoder_base)?.join("reverse")?;
    url.query_pairs_mut()
        .append_pair("lat", &position.lat.to_string())
        .append_pair("lon", &position.lng.to_string())
        .append_pair("format", "json");
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::{
        Contour, Endpoint, HeightRequest, IsochroneRequest, LocateRequest, RouteRequest,
        endpoint_url, reverse_url, search_url,
    };
    use foundation::coords::LatLng;
    use formats::profile::Profile;
    use serde_json::json;

    #[test]
    fn joins_endpoints() {
        assert_eq!(
            endpoint_url("https://valhalla1.openstreetmap.de/", Endpoint::Route),
            "https://valhalla1.openstreetmap.de/route"
        );
        assert_eq!(endpoint_url("http://x", Endpoint::Status), "http://x/status");
        assert_eq!(Endpoint::Status.method(), "GET");
    }

    #[test]
    fn route_body_uses_lat_lon_and_skips_empty_parts() {
        let req = RouteRequest::new(Profile::Car, &[LatLng::new(52.5, 13.4)]);
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["costing"], "auto");
        assert_eq!(v["locations"][0], json!({"lat": 52.5, "lon": 13.4}));
        assert!(v.get("exclude_polygons").is_none());
        assert!(v.get("date_time").is_none());
    }

    #[test]
    fn isochrone_body_carries_contours() {
        let req = IsochroneRequest::new(
            Profile::Pedestrian,
            LatLng::new(1.0, 2.0),
            vec![Contour {
                time: 10.0,
                color: "ff0000".to_string(),
            }],
        );
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["contours"][0]["time"], 10.0);
        assert_eq!(v["polygons"], true);
    }

    #[test]
    fn height_and_locate_bodies() {
        let h = HeightRequest::new(true, &[LatLng::new(1.0, 2.0)]);
        assert_eq!(
            serde_json::to_value(&h).unwrap(),
            json!({"range": true, "shape": [{"lat": 1.0, "lon": 2.0}]})
        );
        let l = LocateRequest::new(Profile::Bicycle, LatLng::new(1.0, 2.0));
        assert_eq!(serde_json::to_value(&l).unwrap()["verbose"], true);
    }

    #[test]
    fn geocoder_urls_are_encoded() {
        let s = search_url("https://nominatim.openstreetmap.org/", "Unter den Linden", 5).unwrap();
        assert_eq!(
            s,
            "https://nominatim.openstreetmap.org/search?q=Unter+den+Linden&format=json&limit=5"
        );
        let r = reverse_url("https://nominatim.openstreetmap.org", LatLng::new(52.5, 13.4)).unwrap();
        assert_eq!(
            r,
            "https://nominatim.openstreetmap.org/reverse?lat=52.5&lon=13.4&format=json"
        );
    }
}
