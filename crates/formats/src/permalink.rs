//! Shareable URL query parameters.
//!
//! `wps` is a flat comma list of `lng,lat` pairs. A pair that does not parse
//! or is out of range is dropped on its own; the others still load.

use crate::profile::Profile;
use foundation::coords::{LatLng, LngLat};
use std::borrow::Cow;
use tracing::warn;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub enum PermalinkError {
    InvalidUrl(String),
}

impl std::fmt::Display for PermalinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermalinkError::InvalidUrl(e) => write!(f, "invalid permalink URL: {e}"),
        }
    }
}

impl std::error::Error for PermalinkError {}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PermalinkParams {
    pub profile: Option<Profile>,
    pub waypoints: Vec<LatLng>,
    pub range: Option<u32>,
    pub interval: Option<u32>,
    pub denoise: Option<f64>,
    pub generalize: Option<f64>,
    pub style: Option<String>,
}

impl PermalinkParams {
    pub fn from_url(url: &str) -> Result<Self, PermalinkError> {
        let parsed = Url::parse(url).map_err(|e| PermalinkError::InvalidUrl(e.to_string()))?;
        Ok(Self::from_pairs(parsed.query_pairs()))
    }

    /// Parses a bare query string, with or without the leading `?`.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()))
    }

    fn from_pairs<'a>(pairs: impl Iterator<Item = (Cow<'a, str>, Cow<'a, str>)>) -> Self {
        let mut out = Self::default();
        for (key, value) in pairs {
            match key.as_ref() {
                "profile" => out.profile = parse_or_warn(&key, &value),
                "wps" => out.waypoints = parse_waypoints(&value),
                "range" => out.range = parse_or_warn(&key, &value),
                "interval" => out.interval = parse_or_warn(&key, &value),
                "denoise" => out.denoise = parse_or_warn(&key, &value),
                "generalize" => out.generalize = parse_or_warn(&key, &value),
                "style" if !value.is_empty() => out.style = Some(value.into_owned()),
                _ => {}
            }
        }
        out
    }

    pub fn to_query(&self) -> String {
        let mut ser = url::form_urlencoded::Serializer::new(String::new());
        if let Some(p) = self.profile {
            ser.append_pair("profile", p.as_str());
        }
        if !self.waypoints.is_empty() {
            let flat: Vec<String> = self
                .waypoints
                .iter()
                .flat_map(|p| {
                    let [lng, lat] = LngLat::from(*p).as_array();
                    [lng.to_string(), lat.to_string()]
                })
                .collect();
            ser.append_pair("wps", &flat.join(","));
        }
        if let Some(v) = self.range {
            ser.append_pair("range", &v.to_string());
        }
        if let Some(v) = self.interval {
            ser.append_pair("interval", &v.to_string());
        }
        if let Some(v) = self.denoise {
            ser.append_pair("denoise", &v.to_string());
        }
        if let Some(v) = self.generalize {
            ser.append_pair("generalize", &v.to_string());
        }
        if let Some(s) = &self.style {
            ser.append_pair("style", s);
        }
        ser.finish()
    }

    /// `base` with its query replaced by these parameters.
    pub fn to_url(&self, base: &str) -> Result<String, PermalinkError> {
        let mut url = Url::parse(base).map_err(|e| PermalinkError::InvalidUrl(e.to_string()))?;
        let query = self.to_query();
        url.set_query((!query.is_empty()).then_some(query.as_str()));
        Ok(url.into())
    }
}

fn parse_or_warn<T: std::str::FromStr>(key: &str, value: &str) -> Option<T> {
    match value.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value, "ignoring unparsable permalink parameter");
            None
        }
    }
}

fn parse_waypoints(value: &str) -> Vec<LatLng> {
    let parts: Vec<&str> = value.split(',').collect();
    let mut out = Vec::with_capacity(parts.len() / 2);
    for (pair_index, pair) in parts.chunks(2).enumerate() {
        let parsed = match pair {
            [lng, lat] => lng
                .trim()
                .parse::<f64>()
                .ok()
                .zip(lat.trim().parse::<f64>().ok())
                .map(|(lng, lat)| LatLng::from(LngLat::new(lng, lat))),
            _ => None,
        };
        match parsed {
            Some(p) if p.is_valid() => out.push(p),
            _ => warn!(pair_index, "skipping invalid waypoint in permalink"),
        }
    }
    out
}
