//! Best-effort browser preferences.
//!
//! Every key is read on its own. A missing, empty or unparsable value falls
//! back to the default and logs a warning; it never fails the whole load.

use foundation::coords::LatLng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{KEY_PREFIX, PreferenceStore, StorageError};

pub const DEFAULT_STYLE: &str = "shortbread";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PreferenceKey {
    LastCenter,
    Style,
    CustomStyle,
    ServerUrl,
    DirectionsLanguage,
}

impl PreferenceKey {
    pub const ALL: [PreferenceKey; 5] = [
        PreferenceKey::LastCenter,
        PreferenceKey::Style,
        PreferenceKey::CustomStyle,
        PreferenceKey::ServerUrl,
        PreferenceKey::DirectionsLanguage,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PreferenceKey::LastCenter => "last_center",
            PreferenceKey::Style => "style",
            PreferenceKey::CustomStyle => "custom_style",
            PreferenceKey::ServerUrl => "server_url",
            PreferenceKey::DirectionsLanguage => "directions_language",
        }
    }

    pub fn storage_key(self) -> String {
        format!("{KEY_PREFIX}.{}", self.name())
    }
}

/// Last map camera, as stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoredView {
    /// `[lat, lng]`.
    pub center: [f64; 2],
    pub zoom_level: f64,
}

impl StoredView {
    pub fn new(center: LatLng, zoom_level: f64) -> Self {
        Self {
            center: center.as_array(),
            zoom_level,
        }
    }

    pub fn center(&self) -> LatLng {
        LatLng::from_array(self.center)
    }

    fn is_valid(&self) -> bool {
        self.center().is_valid() && self.zoom_level.is_finite() && self.zoom_level >= 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    pub last_view: Option<StoredView>,
    pub style: String,
    pub custom_style: Option<Value>,
    pub server_url: Option<String>,
    pub directions_language: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            last_view: None,
            style: DEFAULT_STYLE.to_string(),
            custom_style: None,
            server_url: None,
            directions_language: None,
        }
    }
}

impl Preferences {
    /// Loads every key independently from `store`.
    pub fn load(store: &dyn PreferenceStore) -> Self {
        let mut out = Self::default();

        if let Some(raw) = read(store, PreferenceKey::LastCenter) {
            match serde_json::from_str::<StoredView>(&raw) {
                Ok(view) if view.is_valid() => out.last_view = Some(view),
                Ok(_) => corrupt(PreferenceKey::LastCenter, "out of range"),
                Err(e) => corrupt(PreferenceKey::LastCenter, &e.to_string()),
            }
        }
        if let Some(raw) = read(store, PreferenceKey::Style) {
            out.style = raw;
        }
        if let Some(raw) = read(store, PreferenceKey::CustomStyle) {
            match serde_json::from_str::<Value>(&raw) {
                Ok(v @ Value::Object(_)) => out.custom_style = Some(v),
                Ok(_) => corrupt(PreferenceKey::CustomStyle, "not a JSON object"),
                Err(e) => corrupt(PreferenceKey::CustomStyle, &e.to_string()),
            }
        }
        if let Some(raw) = read(store, PreferenceKey::ServerUrl) {
            out.server_url = Some(raw);
        }
        if let Some(raw) = read(store, PreferenceKey::DirectionsLanguage) {
            out.directions_language = Some(raw);
        }
        out
    }

    pub fn save_view(
        store: &mut dyn PreferenceStore,
        view: StoredView,
    ) -> Result<(), StorageError> {
        let raw = serde_json::to_string(&view).map_err(|e| StorageError::Io(e.to_string()))?;
        store.set(&PreferenceKey::LastCenter.storage_key(), &raw)
    }

    pub fn save_style(store: &mut dyn PreferenceStore, style: &str) -> Result<(), StorageError> {
        store.set(&PreferenceKey::Style.storage_key(), style)
    }

    pub fn save_custom_style(
        store: &mut dyn PreferenceStore,
        style: &Value,
    ) -> Result<(), StorageError> {
        let raw = serde_json::to_string(style).map_err(|e| StorageError::Io(e.to_string()))?;
        store.set(&PreferenceKey::CustomStyle.storage_key(), &raw)
    }

    /// `None` forgets the custom server and reverts to the default.
    pub fn save_server_url(
        store: &mut dyn PreferenceStore,
        url: Option<&str>,
    ) -> Result<(), StorageError> {
        let key = PreferenceKey::ServerUrl.storage_key();
        match url {
            Some(url) => store.set(&key, url),
            None => store.remove(&key),
        }
    }

    pub fn save_directions_language(
        store: &mut dyn PreferenceStore,
        language: &str,
    ) -> Result<(), StorageError> {
        store.set(&PreferenceKey::DirectionsLanguage.storage_key(), language)
    }
}

/// Non-empty trimmed value for `key`, or `None` with a warning on read errors.
fn read(store: &dyn PreferenceStore, key: PreferenceKey) -> Option<String> {
    match store.get(&key.storage_key()) {
        Ok(Some(raw)) => {
            let raw = raw.trim();
            (!raw.is_empty()).then(|| raw.to_string())
        }
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(key = key.name(), error = %e, "preference unreadable, using default");
            None
        }
    }
}

fn corrupt(key: PreferenceKey, reason: &str) {
    tracing::warn!(key = key.name(), reason, "preference corrupt, using default");
}
