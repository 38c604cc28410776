//! Minimal GeoJSON feature model in map order (`[lng, lat]`).
//!
//! Parsing walks `serde_json::Value` by hand so that a bad feature reports its
//! index, and so that foreign members in `properties` survive untouched.

use foundation::coords::LngLat;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(LngLat),
    MultiPoint(Vec<LngLat>),
    LineString(Vec<LngLat>),
    MultiLineString(Vec<Vec<LngLat>>),
    Polygon(Vec<Vec<LngLat>>),
    MultiPolygon(Vec<Vec<Vec<LngLat>>>),
}

impl Geometry {
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::LineString(_) => "LineString",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    pub fn is_polygonal(&self) -> bool {
        matches!(self, Geometry::Polygon(_) | Geometry::MultiPolygon(_))
    }

    pub fn is_punctual(&self) -> bool {
        matches!(self, Geometry::Point(_) | Geometry::MultiPoint(_))
    }

    /// Visits every vertex, in document order.
    pub fn for_each_position(&self, mut f: impl FnMut(LngLat)) {
        match self {
            Geometry::Point(p) => f(*p),
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => ps.iter().copied().for_each(f),
            Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => {
                lines.iter().flatten().copied().for_each(f)
            }
            Geometry::MultiPolygon(polys) => polys.iter().flatten().flatten().copied().for_each(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<String>,
    pub properties: Map<String, Value>,
    pub geometry: Geometry,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            id: None,
            properties: Map::new(),
            geometry,
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    pub fn property_f64(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(Value::as_f64)
    }

    pub fn to_geojson_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), Value::String("Feature".to_string()));
        if let Some(id) = &self.id {
            obj.insert("id".to_string(), Value::String(id.clone()));
        }
        obj.insert(
            "properties".to_string(),
            Value::Object(self.properties.clone()),
        );
        obj.insert("geometry".to_string(), geometry_to_value(&self.geometry));
        Value::Object(obj)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeoJsonError {
    Json(String),
    NotAFeatureCollection,
    InvalidFeature { index: usize, reason: String },
}

impl std::fmt::Display for GeoJsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeoJsonError::Json(e) => write!(f, "JSON parse error: {e}"),
            GeoJsonError::NotAFeatureCollection => {
                write!(f, "expected GeoJSON FeatureCollection")
            }
            GeoJsonError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
        }
    }
}

impl std::error::Error for GeoJsonError {}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn from_geojson_str(payload: &str) -> Result<Self, GeoJsonError> {
        let value: Value =
            serde_json::from_str(payload).map_err(|e| GeoJsonError::Json(e.to_string()))?;
        Self::from_geojson_value(&value)
    }

    pub fn from_geojson_value(value: &Value) -> Result<Self, GeoJsonError> {
        let obj = value.as_object().ok_or(GeoJsonError::NotAFeatureCollection)?;
        if obj.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
            return Err(GeoJsonError::NotAFeatureCollection);
        }
        let raw = obj
            .get("features")
            .and_then(Value::as_array)
            .ok_or(GeoJsonError::NotAFeatureCollection)?;

        let mut features = Vec::with_capacity(raw.len());
        for (index, item) in raw.iter().enumerate() {
            let feature =
                parse_feature(item).map_err(|reason| GeoJsonError::InvalidFeature { index, reason })?;
            features.push(feature);
        }
        Ok(Self { features })
    }

    pub fn to_geojson_value(&self) -> Value {
        let mut root = Map::new();
        root.insert(
            "type".to_string(),
            Value::String("FeatureCollection".to_string()),
        );
        root.insert(
            "features".to_string(),
            Value::Array(self.features.iter().map(Feature::to_geojson_value).collect()),
        );
        Value::Object(root)
    }

    pub fn to_geojson_string_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_geojson_value())
    }
}

fn parse_feature(value: &Value) -> Result<Feature, String> {
    let obj = value
        .as_object()
        .ok_or("feature must be an object".to_string())?;
    match obj.get("type").and_then(Value::as_str) {
        Some("Feature") => {}
        Some(other) => return Err(format!("unexpected feature type: {other}")),
        None => return Err("feature missing type".to_string()),
    }

    let id = match obj.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    let properties = obj
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let geometry = parse_geometry(
        obj.get("geometry")
            .ok_or("feature missing geometry".to_string())?,
    )?;

    Ok(Feature {
        id,
        properties,
        geometry,
    })
}

fn parse_geometry(value: &Value) -> Result<Geometry, String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or("geometry missing type".to_string())?;
    let coords = obj
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;

    match ty {
        "Point" => Ok(Geometry::Point(parse_position(coords)?)),
        "MultiPoint" => Ok(Geometry::MultiPoint(parse_positions(coords)?)),
        "LineString" => Ok(Geometry::LineString(parse_positions(coords)?)),
        "MultiLineString" => Ok(Geometry::MultiLineString(parse_nested(coords)?)),
        "Polygon" => Ok(Geometry::Polygon(parse_nested(coords)?)),
        "MultiPolygon" => {
            let polys = coords
                .as_array()
                .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
            polys.iter().map(parse_nested).collect::<Result<_, _>>().map(Geometry::MultiPolygon)
        }
        other => Err(format!("unsupported geometry type: {other}")),
    }
}

fn parse_position(coords: &Value) -> Result<LngLat, String> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("position must have [lng, lat]".to_string());
    }
    let lng = arr[0].as_f64().ok_or("lng must be a number".to_string())?;
    let lat = arr[1].as_f64().ok_or("lat must be a number".to_string())?;
    Ok(LngLat::new(lng, lat))
}

fn parse_positions(coords: &Value) -> Result<Vec<LngLat>, String> {
    coords
        .as_array()
        .ok_or("coordinates must be an array".to_string())?
        .iter()
        .map(parse_position)
        .collect()
}

fn parse_nested(coords: &Value) -> Result<Vec<Vec<LngLat>>, String> {
    coords
        .as_array()
        .ok_or("coordinates must be an array of arrays".to_string())?
        .iter()
        .map(parse_positions)
        .collect()
}

fn position_value(p: &LngLat) -> Value {
    Value::Array(vec![Value::from(p.lng), Value::from(p.lat)])
}

fn positions_value(ps: &[LngLat]) -> Value {
    Value::Array(ps.iter().map(position_value).collect())
}

fn nested_value(rings: &[Vec<LngLat>]) -> Value {
    Value::Array(rings.iter().map(|r| positions_value(r)).collect())
}

fn geometry_to_value(geom: &Geometry) -> Value {
    let coordinates = match geom {
        Geometry::Point(p) => position_value(p),
        Geometry::MultiPoint(ps) | Geometry::LineString(ps) => positions_value(ps),
        Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => nested_value(lines),
        Geometry::MultiPolygon(polys) => {
            Value::Array(polys.iter().map(|p| nested_value(p)).collect())
        }
    };
    let mut obj = Map::new();
    obj.insert(
        "type".to_string(),
        Value::String(geom.type_name().to_string()),
    );
    obj.insert("coordinates".to_string(), coordinates);
    Value::Object(obj)
}
