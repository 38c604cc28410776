use foundation::coords::LatLng;
use serde::{Deserialize, Serialize};

use crate::preferences::Preferences;

pub const DEFAULT_BASE_URL: &str = "https://valhalla1.openstreetmap.de";
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";

/// Application configuration. Every field has a default, so a partial JSON
/// object deserializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub geocoder_url: String,
    pub settings_debounce_ms: f64,
    pub search_debounce_ms: f64,
    /// `[lat, lng]`.
    pub default_center: [f64; 2],
    pub default_zoom: f64,
    pub mobile_breakpoint_px: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            geocoder_url: DEFAULT_GEOCODER_URL.to_string(),
            settings_debounce_ms: 300.0,
            search_debounce_ms: 400.0,
            default_center: [52.51831, 13.393707],
            default_zoom: 10.0,
            mobile_breakpoint_px: 550.0,
        }
    }
}

impl AppConfig {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Overlays what the user saved (custom server) on top of `self`.
    pub fn with_persisted(mut self, prefs: &Preferences) -> Self {
        if let Some(url) = prefs.server_url.as_deref() {
            let url = url.trim_end_matches('/');
            if url.starts_with("http://") || url.starts_with("https://") {
                self.base_url = url.to_string();
            } else {
                tracing::warn!(url, "ignoring persisted server url without http(s) scheme");
            }
        }
        self
    }

    pub fn default_center(&self) -> LatLng {
        LatLng::from_array(self.default_center)
    }

    /// Camera to open with: the persisted one if any, else the default.
    pub fn initial_view(&self, prefs: &Preferences) -> (LatLng, f64) {
        match prefs.last_view {
            Some(view) => (view.center(), view.zoom_level),
            None => (self.default_center(), self.default_zoom),
        }
    }
}
