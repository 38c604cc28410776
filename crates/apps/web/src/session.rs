//! Orchestration between the application state and the outside world.
//!
//! A `Session` owns the state, turns actions into follow-up requests, and
//! applies responses. It never performs I/O itself: every outward step is an
//! [`Effect`] for the wasm layer to carry out, and every response comes back
//! through [`Session::handle_response`] with the token it was sent under.

use std::collections::BTreeMap;

use catalog::config::AppConfig;
use compute::heightgraph::{ElevationFetchGuard, HeightgraphDataset, sample_shape};
use compute::viewport::{FitResult, PanelLayout, fit_bounds};
use foundation::coords::LatLng;
use foundation::time::Millis;
use formats::api::{
    HeightResponse, LocateEdge, LocateResult, StatusResponse, parse_geocode_reverse,
    parse_geocode_search,
};
use formats::display::format_duration;
use formats::export::{
    ExportFormat, ExportKind, export_filename, isochrone_geojson, route_geojson, to_pretty_json,
};
use formats::isochrone::{IsochroneOutcome, normalize_isochrone};
use formats::permalink::{PermalinkError, PermalinkParams};
use formats::route::{RouteOutcome, normalize_route};
use layers::reconcile::{RenderLayers, reconcile_state};
use runtime::debounce::Debouncer;
use runtime::event_bus::CommandBus;
use scene::actions::{Action, FetchTarget, Followup};
use scene::state::{AppState, GeocodeTarget, Tab};
use serde_json::Value;
use streaming::error::ServiceError;
use streaming::protocol::{
    Endpoint, HeightRequest, LocateRequest, endpoint_url, reverse_url, search_url,
};
use streaming::request::{RequestKind, RequestSlot, RequestToken};
use streaming::tracker::{Completion, RequestTracker};
use tracing::{debug, warn};

use crate::map_controller::{ControllerEffect, MapController, MenuChoice, PointerEvent};

/// Elevation lookup for the info popup.
pub const HEIGHT_POPUP_SLOT: RequestSlot = RequestSlot::new(RequestKind::Height, 0);
/// Elevation profile of the main route.
pub const HEIGHT_GRAPH_SLOT: RequestSlot = RequestSlot::new(RequestKind::Height, 1);

/// Upper bound on points sent to `/height` for one profile.
pub const MAX_PROFILE_POINTS: usize = 1000;
pub const SEARCH_LIMIT: u32 = 5;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Send {
        token: RequestToken,
        request: HttpRequest,
    },
    Notify(Notification),
    FitBounds(FitResult),
    Controller(ControllerEffect),
    /// Derived layers may have changed.
    Redraw,
}

/// Everything that flows through the command channel. Debounced commands
/// carry their full parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Apply(Action),
    Fetch(FetchTarget),
    Search { target: GeocodeTarget, query: String },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum DebounceKey {
    Fetch(FetchTarget),
    Search(GeocodeTarget),
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeolocationError {
    PermissionDenied,
    Other(String),
}

impl GeolocationError {
    /// `GeolocationPositionError.code` 1 is a denied permission.
    pub fn from_code(code: u16, message: String) -> Self {
        if code == 1 {
            GeolocationError::PermissionDenied
        } else {
            GeolocationError::Other(message)
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            GeolocationError::PermissionDenied => {
                "Location access was denied. Please check your browser settings and allow location access for this site."
            }
            GeolocationError::Other(_) => "Could not determine your location. Please try again.",
        }
    }
}

impl std::fmt::Display for GeolocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeolocationError::PermissionDenied => write!(f, "geolocation permission denied"),
            GeolocationError::Other(msg) => write!(f, "geolocation failed: {msg}"),
        }
    }
}

impl std::error::Error for GeolocationError {}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportError {
    NothingToExport,
    Json(String),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::NothingToExport => write!(f, "no result to export"),
            ExportError::Json(e) => write!(f, "export serialization failed: {e}"),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<serde_json::Error> for ExportError {
    fn from(e: serde_json::Error) -> Self {
        ExportError::Json(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub filename: String,
    pub mime_type: &'static str,
    pub contents: String,
}

/// Contents of the left-click popup. Elevation and snapped edges arrive
/// independently.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatePopup {
    pub position: LatLng,
    pub elevation: Option<f64>,
    pub edges: Vec<LocateEdge>,
}

impl LocatePopup {
    fn new(position: LatLng) -> Self {
        Self {
            position,
            elevation: None,
            edges: Vec::new(),
        }
    }

    /// `"52.517037, 13.388860"`, then the same in `[lng, lat]` order.
    pub fn coordinate_labels(&self) -> (String, String) {
        let p = self.position;
        (
            format!("{:.6}, {:.6}", p.lat, p.lng),
            format!("{:.6}, {:.6}", p.lng, p.lat),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
struct HeightgraphView {
    /// Directions identity the profile is valid for. Moves forward when a
    /// new result keeps the same main geometry.
    identity: u64,
    /// Sampled main-route shape the elevations belong to.
    shape: Vec<LatLng>,
    dataset: HeightgraphDataset,
    hover: Option<LatLng>,
}

#[derive(Debug, Clone, PartialEq)]
enum PendingContext {
    Geocode { target: GeocodeTarget, position: Option<LatLng> },
    Heightgraph { identity: u64, shape: Vec<LatLng> },
}

pub struct Session {
    pub state: AppState,
    pub config: AppConfig,
    controller: MapController,
    tracker: RequestTracker,
    debouncer: Debouncer<DebounceKey, Command>,
    bus: CommandBus<Command>,
    pending: BTreeMap<RequestSlot, PendingContext>,
    popup: Option<LocatePopup>,
    heightgraph: Option<HeightgraphView>,
    elevation_guard: ElevationFetchGuard,
    tileset_last_modified: Option<i64>,
    layout: PanelLayout,
}

impl Session {
    pub fn new(config: AppConfig) -> Self {
        let mut layout = PanelLayout::new(1280.0, true);
        layout.mobile_breakpoint = config.mobile_breakpoint_px;
        Self {
            state: AppState::new(),
            config,
            controller: MapController::new(),
            tracker: RequestTracker::new(),
            debouncer: Debouncer::new(),
            bus: CommandBus::new(),
            pending: BTreeMap::new(),
            popup: None,
            heightgraph: None,
            elevation_guard: ElevationFetchGuard::default(),
            tileset_last_modified: None,
            layout,
        }
    }

    pub fn set_layout(&mut self, viewport_width: f64, panel_open: bool) {
        self.layout.viewport_width = viewport_width;
        self.layout.panel_open = panel_open;
    }

    pub fn dispatch(&mut self, action: Action, now: Millis) -> Vec<Effect> {
        self.bus.dispatch(now, Command::Apply(action));
        self.run(now)
    }

    /// Releases debounced commands whose window has passed.
    pub fn tick(&mut self, now: Millis) -> Vec<Effect> {
        let released = self.debouncer.poll(now);
        if released.is_empty() {
            return Vec::new();
        }
        self.bus.extend(now, released);
        self.run(now)
    }

    pub fn next_deadline(&self) -> Option<Millis> {
        self.debouncer.next_deadline()
    }

    /// Drops pending debounced work; nothing fires after this.
    pub fn teardown(&mut self) {
        self.debouncer.clear();
        self.bus.drain();
    }

    pub fn render_layers(&self) -> RenderLayers {
        reconcile_state(&self.state)
    }

    pub fn is_loading(&self, kind: RequestKind) -> bool {
        self.tracker.is_loading(kind)
    }

    pub fn is_slot_loading(&self, slot: RequestSlot) -> bool {
        self.tracker.is_slot_loading(slot)
    }

    fn run(&mut self, now: Millis) -> Vec<Effect> {
        let mut out = Vec::new();
        while !self.bus.is_empty() {
            for envelope in self.bus.drain() {
                match envelope.command {
                    Command::Apply(action) => match self.state.apply(action) {
                        Ok(followups) => {
                            for f in followups {
                                self.followup(f, now, &mut out);
                            }
                            out.push(Effect::Redraw);
                        }
                        Err(e) => warn!(error = ?e, "action rejected"),
                    },
                    Command::Fetch(target) => out.extend(self.start_fetch(target)),
                    Command::Search { target, query } => {
                        out.extend(self.start_search(target, &query))
                    }
                }
            }
        }
        out
    }

    fn followup(&mut self, followup: Followup, now: Millis, out: &mut Vec<Effect>) {
        match followup {
            Followup::Fetch {
                target,
                debounced: true,
            } => self.debouncer.submit(
                DebounceKey::Fetch(target),
                Command::Fetch(target),
                now,
                self.config.settings_debounce_ms,
            ),
            Followup::Fetch {
                target,
                debounced: false,
            } => {
                // A discrete edit supersedes any slider burst still waiting.
                self.debouncer.cancel(&DebounceKey::Fetch(target));
                self.bus.dispatch(now, Command::Fetch(target));
            }
            Followup::ReverseGeocode { target, position } => {
                out.extend(self.start_reverse_geocode(target, position))
            }
            Followup::Search { target, query } => self.debouncer.submit(
                DebounceKey::Search(target),
                Command::Search { target, query },
                now,
                self.config.search_debounce_ms,
            ),
        }
    }

    fn send(&mut self, slot: RequestSlot, request: HttpRequest) -> Effect {
        let token = self.tracker.begin(slot);
        debug!(?slot, url = %request.url, "request");
        Effect::Send { token, request }
    }

    fn post<T: serde::Serialize>(
        &mut self,
        slot: RequestSlot,
        endpoint: Endpoint,
        body: &T,
    ) -> Option<Effect> {
        match serde_json::to_string(body) {
            Ok(body) => {
                let request = HttpRequest {
                    method: Method::Post,
                    url: endpoint_url(&self.config.base_url, endpoint),
                    body: Some(body),
                };
                Some(self.send(slot, request))
            }
            Err(e) => {
                warn!(?endpoint, error = %e, "request body not serializable");
                None
            }
        }
    }

    fn start_fetch(&mut self, target: FetchTarget) -> Option<Effect> {
        match target {
            FetchTarget::Directions => {
                let body = self.state.route_request()?;
                self.post(RequestSlot::single(RequestKind::Route), Endpoint::Route, &body)
            }
            FetchTarget::Isochrones => {
                let body = self.state.isochrone_request()?;
                self.post(
                    RequestSlot::single(RequestKind::Isochrone),
                    Endpoint::Isochrone,
                    &body,
                )
            }
        }
    }

    fn start_reverse_geocode(&mut self, target: GeocodeTarget, position: LatLng) -> Option<Effect> {
        let url = match reverse_url(&self.config.geocoder_url, position) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "bad geocoder url");
                return None;
            }
        };
        let slot = RequestSlot::new(RequestKind::ReverseGeocode, geocode_index(target));
        self.pending.insert(
            slot,
            PendingContext::Geocode {
                target,
                position: Some(position),
            },
        );
        Some(self.send(
            slot,
            HttpRequest {
                method: Method::Get,
                url,
                body: None,
            },
        ))
    }

    fn start_search(&mut self, target: GeocodeTarget, query: &str) -> Option<Effect> {
        let url = match search_url(&self.config.geocoder_url, query, SEARCH_LIMIT) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "bad geocoder url");
                return None;
            }
        };
        let slot = RequestSlot::new(RequestKind::Search, geocode_index(target));
        self.pending.insert(
            slot,
            PendingContext::Geocode {
                target,
                position: None,
            },
        );
        Some(self.send(
            slot,
            HttpRequest {
                method: Method::Get,
                url,
                body: None,
            },
        ))
    }

    pub fn request_status(&mut self) -> Effect {
        let request = HttpRequest {
            method: Method::Get,
            url: endpoint_url(&self.config.base_url, Endpoint::Status),
            body: None,
        };
        self.send(RequestSlot::single(RequestKind::Status), request)
    }

    // Pointer input.

    pub fn pointer(&mut self, event: PointerEvent) -> Vec<Effect> {
        let effects = self.controller.handle(event);
        self.controller_effects(effects)
    }

    pub fn choose_menu(&mut self, choice: MenuChoice, now: Millis) -> Vec<Effect> {
        let Some((action, effects)) = self.controller.choose(choice) else {
            return Vec::new();
        };
        let mut out = self.controller_effects(effects);
        out.extend(self.dispatch(action, now));
        out
    }

    pub fn set_draw_mode(&mut self, active: bool) -> Vec<Effect> {
        let effects = self.controller.set_draw_mode(active);
        self.controller_effects(effects)
    }

    pub fn controller(&self) -> &MapController {
        &self.controller
    }

    fn controller_effects(&mut self, effects: Vec<ControllerEffect>) -> Vec<Effect> {
        let mut out = Vec::new();
        for effect in effects {
            match effect {
                ControllerEffect::OpenInfoPopup { position } => {
                    out.extend(self.open_popup(position));
                }
                ControllerEffect::CloseInfoPopup => self.close_popup(),
                ControllerEffect::OpenContextMenu { .. } | ControllerEffect::CloseContextMenu => {}
            }
            out.push(Effect::Controller(effect));
        }
        out
    }

    fn open_popup(&mut self, position: LatLng) -> Vec<Effect> {
        self.popup = Some(LocatePopup::new(position));
        let height = HeightRequest::new(false, &[position]);
        let locate = LocateRequest::new(self.state.directions_settings.profile, position);
        let mut out = Vec::new();
        out.extend(self.post(HEIGHT_POPUP_SLOT, Endpoint::Height, &height));
        out.extend(self.post(
            RequestSlot::single(RequestKind::Locate),
            Endpoint::Locate,
            &locate,
        ));
        out
    }

    fn close_popup(&mut self) {
        self.popup = None;
        self.tracker.invalidate(HEIGHT_POPUP_SLOT);
        self.tracker
            .invalidate(RequestSlot::single(RequestKind::Locate));
    }

    pub fn popup(&self) -> Option<&LocatePopup> {
        self.popup.as_ref()
    }

    pub fn is_popup_height_loading(&self) -> bool {
        self.tracker.is_slot_loading(HEIGHT_POPUP_SLOT)
    }

    pub fn is_popup_locate_loading(&self) -> bool {
        self.tracker.is_loading(RequestKind::Locate)
    }

    // Height profile.

    /// Requests the elevation profile of the main route, unless the same
    /// payload was already sent.
    pub fn open_heightgraph(&mut self) -> Option<Effect> {
        let identity = self.state.directions.identity;
        let shape = self.profile_shape()?;
        if !self.elevation_guard.should_fetch(&shape) {
            self.carry_heightgraph(&shape);
            return None;
        }
        let body = HeightRequest::new(true, &shape);
        self.pending.insert(
            HEIGHT_GRAPH_SLOT,
            PendingContext::Heightgraph { identity, shape },
        );
        self.post(HEIGHT_GRAPH_SLOT, Endpoint::Height, &body)
    }

    /// Main route geometry reduced to what a `/height` request carries.
    fn profile_shape(&self) -> Option<Vec<LatLng>> {
        let geometry = &self.state.directions.route_set()?.main.decoded_geometry;
        Some(sample_shape(geometry, MAX_PROFILE_POINTS))
    }

    /// Keeps a built profile valid across results whose main geometry did
    /// not change.
    fn carry_heightgraph(&mut self, shape: &[LatLng]) {
        let identity = self.state.directions.identity;
        if let Some(view) = self.heightgraph.as_mut() {
            if view.shape == shape {
                view.identity = identity;
            }
        }
    }

    /// Profile of the current main route, if one has been built for it.
    pub fn heightgraph(&self) -> Option<&HeightgraphDataset> {
        self.heightgraph
            .as_ref()
            .filter(|v| v.identity == self.state.directions.identity)
            .map(|v| &v.dataset)
    }

    /// Chart hover reports a distance; the map marker goes to the sample at
    /// that distance. `None` clears the marker.
    pub fn hover_heightgraph(&mut self, distance: Option<f64>) -> Option<LatLng> {
        let identity = self.state.directions.identity;
        let view = self.heightgraph.as_mut().filter(|v| v.identity == identity)?;
        view.hover = distance.and_then(|d| view.dataset.position_at(d));
        view.hover
    }

    pub fn heightgraph_hover(&self) -> Option<LatLng> {
        self.heightgraph
            .as_ref()
            .filter(|v| v.identity == self.state.directions.identity)
            .and_then(|v| v.hover)
    }

    // Responses.

    /// Applies a finished request. `result` is `(status, body)`, or the
    /// network error text. Stale responses are dropped without a trace.
    pub fn handle_response(
        &mut self,
        token: RequestToken,
        result: Result<(u16, String), String>,
        now: Millis,
    ) -> Vec<Effect> {
        if self.tracker.complete(token) == Completion::Stale {
            return Vec::new();
        }
        let context = self.pending.remove(&token.slot);
        let body = match result {
            Err(e) => Err(ServiceError::Network(e)),
            Ok((status, body)) => ServiceError::check(status, &body).map(|()| body),
        };

        match token.slot.kind {
            RequestKind::Route => self.on_route(body, now),
            RequestKind::Isochrone => self.on_isochrone(body, now),
            RequestKind::ReverseGeocode | RequestKind::Search => {
                self.on_geocode(token.slot.kind, context, body, now)
            }
            RequestKind::Height if token.slot == HEIGHT_GRAPH_SLOT => {
                self.on_profile(context, body)
            }
            RequestKind::Height => self.on_popup_height(body),
            RequestKind::Locate => self.on_locate(body),
            RequestKind::Status => self.on_status(body),
        }
    }

    fn on_route(&mut self, body: Result<String, ServiceError>, now: Millis) -> Vec<Effect> {
        let value = match body.and_then(|b| parse_value(&b)) {
            Ok(v) => v,
            // The previous result stays on the map.
            Err(e) => return vec![notify_service_error(&e)],
        };
        let outcome = normalize_route(value);
        let mut out = Vec::new();
        match &outcome {
            RouteOutcome::Found(set) => {
                let sets: Vec<Vec<LatLng>> =
                    set.routes().map(|r| r.decoded_geometry.clone()).collect();
                out.extend(fit_bounds(&sets, self.layout).map(Effect::FitBounds));
            }
            RouteOutcome::NoRoute { reason } => {
                debug!(%reason, "no route");
                out.push(Effect::Notify(Notification::info("No route found")));
            }
            RouteOutcome::IntegrityError(e) => {
                warn!(error = %e, "route data inconsistent");
                out.push(Effect::Notify(Notification::error(format!(
                    "The route could not be displayed: {e}"
                ))));
            }
        }
        let mut effects = self.dispatch(Action::SetRouteOutcome(outcome), now);
        if let Some(shape) = self.profile_shape() {
            self.carry_heightgraph(&shape);
        }
        effects.extend(out);
        effects
    }

    fn on_isochrone(&mut self, body: Result<String, ServiceError>, now: Millis) -> Vec<Effect> {
        let value = match body.and_then(|b| parse_value(&b)) {
            Ok(v) => v,
            Err(e) => return vec![notify_service_error(&e)],
        };
        let outcome = normalize_isochrone(value);
        let mut out = Vec::new();
        match &outcome {
            IsochroneOutcome::Found(result) => {
                if let Some(b) = result.bounds() {
                    let corners = vec![b.south_west, b.north_east];
                    out.extend(fit_bounds(&[corners], self.layout).map(Effect::FitBounds));
                }
            }
            IsochroneOutcome::NoResult { reason } => {
                debug!(%reason, "no isochrone");
                out.push(Effect::Notify(Notification::info("No isochrone found")));
            }
        }
        let mut effects = self.dispatch(Action::SetIsochroneOutcome(outcome), now);
        effects.extend(out);
        effects
    }

    fn on_geocode(
        &mut self,
        kind: RequestKind,
        context: Option<PendingContext>,
        body: Result<String, ServiceError>,
        now: Millis,
    ) -> Vec<Effect> {
        let Some(PendingContext::Geocode { target, position }) = context else {
            return Vec::new();
        };
        let body = match body {
            Ok(b) => b,
            Err(e) => {
                // The slot keeps its coordinate title.
                warn!(error = %e, "geocoding failed");
                return Vec::new();
            }
        };
        let action = match (kind, position) {
            (RequestKind::ReverseGeocode, Some(position)) => {
                match parse_geocode_reverse(&body, position) {
                    Ok(results) => Action::ApplyReverseGeocode { target, results },
                    Err(e) => {
                        warn!(error = %e, "unreadable reverse geocode");
                        return Vec::new();
                    }
                }
            }
            _ => match parse_geocode_search(&body) {
                Ok(results) => Action::ApplySearchResults { target, results },
                Err(e) => {
                    warn!(error = %e, "unreadable search result");
                    return Vec::new();
                }
            },
        };
        self.dispatch(action, now)
    }

    fn on_profile(
        &mut self,
        context: Option<PendingContext>,
        body: Result<String, ServiceError>,
    ) -> Vec<Effect> {
        let Some(PendingContext::Heightgraph { identity, shape }) = context else {
            return Vec::new();
        };
        let parsed = body.and_then(|b| {
            serde_json::from_str::<HeightResponse>(&b).map_err(ServiceError::from)
        });
        let response = match parsed {
            Ok(r) => r,
            Err(e) => {
                // Allow a retry with the same payload.
                self.elevation_guard.reset();
                return vec![notify_service_error(&e)];
            }
        };
        let current = self.state.directions.identity;
        if identity != current && self.profile_shape().as_deref() != Some(&shape[..]) {
            return Vec::new();
        }
        match HeightgraphDataset::build(&shape, &response.elevations()) {
            Ok(dataset) => {
                self.heightgraph = Some(HeightgraphView {
                    identity: current,
                    shape,
                    dataset,
                    hover: None,
                });
                vec![Effect::Redraw]
            }
            Err(e) => {
                self.elevation_guard.reset();
                warn!(error = %e, "elevation profile rejected");
                vec![Effect::Notify(Notification::error(
                    "The elevation service returned an incomplete profile.",
                ))]
            }
        }
    }

    fn on_popup_height(&mut self, body: Result<String, ServiceError>) -> Vec<Effect> {
        let Some(popup) = self.popup.as_mut() else {
            return Vec::new();
        };
        match body.and_then(|b| serde_json::from_str::<HeightResponse>(&b).map_err(ServiceError::from)) {
            Ok(r) => popup.elevation = r.elevations().into_iter().flatten().next(),
            Err(e) => warn!(error = %e, "elevation lookup failed"),
        }
        vec![Effect::Redraw]
    }

    fn on_locate(&mut self, body: Result<String, ServiceError>) -> Vec<Effect> {
        let Some(popup) = self.popup.as_mut() else {
            return Vec::new();
        };
        match body.and_then(|b| {
            serde_json::from_str::<Vec<LocateResult>>(&b).map_err(ServiceError::from)
        }) {
            Ok(results) => {
                popup.edges = results
                    .iter()
                    .flat_map(|r| r.edges().iter().cloned())
                    .collect();
            }
            Err(e) => warn!(error = %e, "locate failed"),
        }
        vec![Effect::Redraw]
    }

    fn on_status(&mut self, body: Result<String, ServiceError>) -> Vec<Effect> {
        match body.and_then(|b| serde_json::from_str::<StatusResponse>(&b).map_err(ServiceError::from)) {
            Ok(status) if status.tileset_last_modified > 0 => {
                self.tileset_last_modified = Some(status.tileset_last_modified);
                vec![Effect::Redraw]
            }
            Ok(_) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "status unavailable");
                Vec::new()
            }
        }
    }

    /// Age of the routing tiles, e.g. `"2d 3h"`-style text, given the current
    /// unix time in seconds.
    pub fn tileset_age(&self, now_unix_s: i64) -> Option<String> {
        let modified = self.tileset_last_modified?;
        let age = (now_unix_s - modified).max(0) as f64;
        Some(format_duration(age))
    }

    // Browser geolocation.

    pub fn geolocated(&mut self, position: LatLng, now: Millis) -> Vec<Effect> {
        let action = match self.state.tab {
            Tab::Directions => Action::DirectionsFrom(position),
            Tab::Isochrones => Action::SetIsoCenter(position),
        };
        self.dispatch(action, now)
    }

    pub fn geolocation_failed(&mut self, err: GeolocationError) -> Vec<Effect> {
        warn!(error = %err, "geolocation");
        vec![Effect::Notify(Notification::error(err.user_message()))]
    }

    // Permalink and export.

    pub fn permalink(&self, base: &str, style: Option<String>) -> Result<String, PermalinkError> {
        self.state.permalink(style).to_url(base)
    }

    pub fn load_permalink(&mut self, url: &str, now: Millis) -> Result<Vec<Effect>, PermalinkError> {
        let params = PermalinkParams::from_url(url)?;
        let mut out = Vec::new();
        if params.range.is_some() || params.interval.is_some() {
            out.extend(self.dispatch(Action::SetTab(Tab::Isochrones), now));
        }
        out.extend(self.dispatch(Action::ApplyPermalink(params), now));
        Ok(out)
    }

    pub fn export(
        &self,
        kind: ExportKind,
        format: ExportFormat,
        timestamp_ms: u64,
    ) -> Result<ExportFile, ExportError> {
        let contents = match kind {
            ExportKind::Directions => {
                let set = self
                    .state
                    .directions
                    .route_set()
                    .ok_or(ExportError::NothingToExport)?;
                match format {
                    ExportFormat::Json => to_pretty_json(&set.raw)?,
                    ExportFormat::GeoJson => route_geojson(&set.main)?,
                }
            }
            ExportKind::Isochrones => {
                let result = self
                    .state
                    .isochrones
                    .result()
                    .ok_or(ExportError::NothingToExport)?;
                match format {
                    ExportFormat::Json => to_pretty_json(&result.raw)?,
                    ExportFormat::GeoJson => isochrone_geojson(result)?,
                }
            }
        };
        Ok(ExportFile {
            filename: export_filename(kind, format, timestamp_ms),
            mime_type: format.mime_type(),
            contents,
        })
    }
}

fn parse_value(body: &str) -> Result<Value, ServiceError> {
    Ok(serde_json::from_str(body)?)
}

fn notify_service_error(e: &ServiceError) -> Effect {
    warn!(error = %e, "request failed");
    Effect::Notify(Notification::error(e.user_message()))
}

/// Request slot index of a geocode target. Waypoint ids are small counters.
fn geocode_index(target: GeocodeTarget) -> u32 {
    match target {
        GeocodeTarget::Waypoint(id) => u32::try_from(id.0).unwrap_or(u32::MAX - 1),
        GeocodeTarget::IsoCenter => u32::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Effect, GeolocationError, HEIGHT_GRAPH_SLOT, HEIGHT_POPUP_SLOT, Level, Method, Session,
    };
    use crate::map_controller::{MenuChoice, PointerEvent};
    use catalog::config::AppConfig;
    use foundation::coords::LatLng;
    use foundation::screen::ScreenPoint;
    use foundation::time::Millis;
    use formats::export::{ExportFormat, ExportKind};
    use formats::polyline::{SERVICE_PRECISION, encode};
    use formats::route::RouteKind;
    use scene::actions::Action;
    use scene::highlight::HighlightSegment;
    use scene::state::GeocodeTarget;
    use serde_json::json;
    use streaming::request::{RequestKind, RequestToken};

    fn t(ms: f64) -> Millis {
        Millis(ms)
    }

    fn sends(effects: &[Effect]) -> Vec<(RequestToken, Method, String)> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Send { token, request } => {
                    Some((*token, request.method, request.url.clone()))
                }
                _ => None,
            })
            .collect()
    }

    fn send_of(effects: &[Effect], kind: RequestKind) -> RequestToken {
        sends(effects)
            .into_iter()
            .find(|(token, ..)| token.slot.kind == kind)
            .map(|(token, ..)| token)
            .unwrap_or_else(|| panic!("no {kind:?} request in {effects:?}"))
    }

    fn route_body(points: &[LatLng]) -> String {
        let last = points.len() - 1;
        json!({"trip": {
            "status": 0,
            "summary": {"length": 1.2, "time": 300.0},
            "legs": [{
                "shape": encode(points, SERVICE_PRECISION),
                "maneuvers": [
                    {"type": 1, "instruction": "Go.", "length": 1.2, "time": 300.0,
                     "begin_shape_index": 0, "end_shape_index": last},
                    {"type": 4, "instruction": "Arrive.", "length": 0.0, "time": 0.0,
                     "begin_shape_index": last, "end_shape_index": last}
                ]
            }]
        }})
        .to_string()
    }

    fn line() -> Vec<LatLng> {
        vec![
            LatLng::new(52.50, 13.40),
            LatLng::new(52.51, 13.41),
            LatLng::new(52.52, 13.42),
        ]
    }

    /// Two waypoints placed, route requested and answered.
    fn routed_session() -> Session {
        let mut s = Session::new(AppConfig::default());
        s.dispatch(Action::DirectionsFrom(LatLng::new(52.50, 13.40)), t(0.0));
        let effects = s.dispatch(Action::DirectionsTo(LatLng::new(52.52, 13.42)), t(10.0));
        let token = send_of(&effects, RequestKind::Route);
        s.handle_response(token, Ok((200, route_body(&line()))), t(50.0));
        s
    }

    #[test]
    fn context_menu_placement_requests_route_and_geocode() {
        let mut s = Session::new(AppConfig::default());
        let first = s.dispatch(Action::DirectionsFrom(LatLng::new(1.0, 2.0)), t(0.0));
        assert_eq!(sends(&first).len(), 1);
        assert_eq!(sends(&first)[0].0.slot.kind, RequestKind::ReverseGeocode);

        let second = s.dispatch(Action::DirectionsTo(LatLng::new(3.0, 4.0)), t(1.0));
        let route = sends(&second)
            .into_iter()
            .find(|(tk, ..)| tk.slot.kind == RequestKind::Route)
            .unwrap();
        assert_eq!(route.1, Method::Post);
        assert_eq!(route.2, "https://valhalla1.openstreetmap.de/route");
        assert!(s.is_loading(RequestKind::Route));
    }

    #[test]
    fn route_response_is_stored_and_fitted() {
        let s = routed_session();
        assert!(s.state.directions.route_set().is_some());
        assert!(!s.is_loading(RequestKind::Route));
        assert_eq!(s.render_layers().route_lines.len(), 2);
    }

    #[test]
    fn route_response_fits_bounds() {
        let mut s = Session::new(AppConfig::default());
        s.dispatch(Action::DirectionsFrom(LatLng::new(52.50, 13.40)), t(0.0));
        let effects = s.dispatch(Action::DirectionsTo(LatLng::new(52.52, 13.42)), t(1.0));
        let token = send_of(&effects, RequestKind::Route);
        let out = s.handle_response(token, Ok((200, route_body(&line()))), t(2.0));
        let fit = out
            .iter()
            .find_map(|e| match e {
                Effect::FitBounds(f) => Some(*f),
                _ => None,
            })
            .unwrap();
        assert_eq!(fit.bounds.south_west, LatLng::new(52.50, 13.40));
        assert_eq!(fit.max_zoom, 18);
    }

    #[test]
    fn stale_route_response_is_dropped() {
        let mut s = Session::new(AppConfig::default());
        s.dispatch(Action::DirectionsFrom(LatLng::new(52.50, 13.40)), t(0.0));
        let a = send_of(
            &s.dispatch(Action::DirectionsTo(LatLng::new(52.52, 13.42)), t(1.0)),
            RequestKind::Route,
        );
        let b = send_of(
            &s.dispatch(Action::DirectionsTo(LatLng::new(52.53, 13.43)), t(2.0)),
            RequestKind::Route,
        );
        // Newer answer first, then the older one straggles in.
        s.handle_response(b, Ok((200, route_body(&line()))), t(3.0));
        let identity = s.state.directions.identity;
        let late = s.handle_response(a, Ok((200, route_body(&line()[..2]))), t(4.0));
        assert!(late.is_empty());
        assert_eq!(s.state.directions.identity, identity);
        assert_eq!(s.state.directions.route_set().unwrap().main.point_count(), 3);
    }

    #[test]
    fn failed_fetch_keeps_previous_result() {
        let mut s = routed_session();
        let effects = s.dispatch(Action::DirectionsTo(LatLng::new(52.53, 13.43)), t(100.0));
        let token = send_of(&effects, RequestKind::Route);
        let out = s.handle_response(token, Err("offline".to_string()), t(120.0));
        assert!(matches!(&out[..], [Effect::Notify(n)] if n.level == Level::Error));
        assert!(s.state.directions.route_set().is_some());
        assert!(!s.is_loading(RequestKind::Route));
    }

    #[test]
    fn service_error_without_trip_reports_no_route() {
        let mut s = Session::new(AppConfig::default());
        s.dispatch(Action::DirectionsFrom(LatLng::new(1.0, 1.0)), t(0.0));
        let token = send_of(
            &s.dispatch(Action::DirectionsTo(LatLng::new(2.0, 2.0)), t(1.0)),
            RequestKind::Route,
        );
        let out = s.handle_response(token, Ok((200, "{}".to_string())), t(2.0));
        assert!(out
            .iter()
            .any(|e| matches!(e, Effect::Notify(n) if n.message == "No route found")));
        assert!(s.state.directions.route_set().is_none());
    }

    #[test]
    fn slider_bursts_are_debounced() {
        let mut s = routed_session();
        assert!(sends(&s.dispatch(Action::SetAlternates(1), t(100.0))).is_empty());
        assert!(sends(&s.dispatch(Action::SetAlternates(2), t(200.0))).is_empty());
        assert!(s.tick(t(450.0)).is_empty());
        let out = s.tick(t(500.0));
        assert_eq!(sends(&out).len(), 1);
        assert!(s.next_deadline().is_none());
    }

    #[test]
    fn discrete_edit_cancels_pending_debounce() {
        let mut s = routed_session();
        s.dispatch(Action::SetAlternates(1), t(100.0));
        let out = s.dispatch(Action::ReorderWaypoints { from: 0, to: 1 }, t(150.0));
        assert_eq!(sends(&out).len(), 1);
        assert!(s.tick(t(1000.0)).is_empty());
    }

    #[test]
    fn search_as_you_type_waits_for_the_last_keystroke() {
        let mut s = Session::new(AppConfig::default());
        let target = GeocodeTarget::IsoCenter;
        for (i, text) in ["Ber", "Berl", "Berlin"].iter().enumerate() {
            let out = s.dispatch(
                Action::SetUserInput {
                    target,
                    text: text.to_string(),
                },
                t(i as f64 * 100.0),
            );
            assert!(sends(&out).is_empty());
        }
        let out = s.tick(t(600.0));
        let (_, method, url) = &sends(&out)[0];
        assert_eq!(*method, Method::Get);
        assert!(url.contains("q=Berlin"));
    }

    #[test]
    fn teardown_clears_timers() {
        let mut s = routed_session();
        s.dispatch(Action::SetAlternates(1), t(100.0));
        s.teardown();
        assert!(s.tick(t(10_000.0)).is_empty());
    }

    #[test]
    fn info_popup_tracks_two_loading_flags() {
        let mut s = Session::new(AppConfig::default());
        let out = s.pointer(PointerEvent::LeftClick {
            screen: ScreenPoint::new(5.0, 5.0),
            position: LatLng::new(52.5, 13.4),
        });
        let height = send_of(&out, RequestKind::Height);
        let locate = send_of(&out, RequestKind::Locate);
        assert_eq!(height.slot, HEIGHT_POPUP_SLOT);
        assert!(s.is_popup_height_loading());
        assert!(s.is_popup_locate_loading());

        s.handle_response(height, Ok((200, r#"{"height":[34.0]}"#.to_string())), t(1.0));
        assert!(!s.is_popup_height_loading());
        assert!(s.is_popup_locate_loading());
        assert_eq!(s.popup().unwrap().elevation, Some(34.0));

        let body = r#"[{"input_lat":52.5,"input_lon":13.4,"edges":[{"way_id":7,"correlated_lat":52.5,"correlated_lon":13.4,"side_of_street":"left","percent_along":0.5}]}]"#;
        s.handle_response(locate, Ok((200, body.to_string())), t(2.0));
        assert_eq!(s.popup().unwrap().edges.len(), 1);
        assert_eq!(
            s.popup().unwrap().coordinate_labels().0,
            "52.500000, 13.400000"
        );
    }

    #[test]
    fn closing_popup_discards_late_lookups() {
        let mut s = Session::new(AppConfig::default());
        let click = PointerEvent::LeftClick {
            screen: ScreenPoint::new(5.0, 5.0),
            position: LatLng::new(52.5, 13.4),
        };
        let out = s.pointer(click);
        let height = send_of(&out, RequestKind::Height);
        s.pointer(click);
        assert!(s.popup().is_none());
        assert!(s
            .handle_response(height, Ok((200, r#"{"height":[1.0]}"#.to_string())), t(1.0))
            .is_empty());
    }

    #[test]
    fn context_menu_choice_dispatches_action() {
        let mut s = Session::new(AppConfig::default());
        s.pointer(PointerEvent::RightClick {
            screen: ScreenPoint::new(5.0, 5.0),
            position: LatLng::new(52.5, 13.4),
        });
        s.choose_menu(MenuChoice::DirectionsFrom, t(0.0));
        assert_eq!(
            s.state.waypoints.get(0).unwrap().position(),
            Some(LatLng::new(52.5, 13.4))
        );
    }

    #[test]
    fn heightgraph_fetch_is_guarded_and_hover_maps_back() {
        let mut s = routed_session();
        let effect = s.open_heightgraph().unwrap();
        let Effect::Send { token, .. } = effect else {
            panic!("expected a request");
        };
        assert_eq!(token.slot, HEIGHT_GRAPH_SLOT);
        // Same route, same payload: no second request.
        assert!(s.open_heightgraph().is_none());

        let body = r#"{"range_height":[[0,30],[1300,40],[2600,35]]}"#;
        s.handle_response(token, Ok((200, body.to_string())), t(5.0));
        let ds = s.heightgraph().unwrap();
        assert_eq!(ds.samples.len(), 3);
        assert_eq!(ds.incline_total, 10.0);
        let d = ds.samples[1].distance;
        assert_eq!(s.hover_heightgraph(Some(d + 1.0)), Some(line()[1]));
        assert_eq!(s.heightgraph_hover(), Some(line()[1]));
        assert_eq!(s.hover_heightgraph(None), None);
    }

    #[test]
    fn heightgraph_is_dropped_when_the_route_changes() {
        let mut s = routed_session();
        let Some(Effect::Send { token, .. }) = s.open_heightgraph() else {
            panic!("expected a request");
        };
        s.handle_response(
            token,
            Ok((200, r#"{"height":[1.0,2.0,3.0]}"#.to_string())),
            t(5.0),
        );
        assert!(s.heightgraph().is_some());
        let token = send_of(
            &s.dispatch(Action::DirectionsTo(LatLng::new(52.6, 13.5)), t(10.0)),
            RequestKind::Route,
        );
        let mut longer = line();
        longer.push(LatLng::new(52.6, 13.5));
        s.handle_response(token, Ok((200, route_body(&longer))), t(11.0));
        assert!(s.heightgraph().is_none());
        // New geometry, new payload.
        assert!(s.open_heightgraph().is_some());
    }

    #[test]
    fn heightgraph_survives_refetch_of_the_same_route() {
        let mut s = routed_session();
        let Some(Effect::Send { token, .. }) = s.open_heightgraph() else {
            panic!("expected a request");
        };
        s.handle_response(
            token,
            Ok((200, r#"{"height":[1.0,2.0,3.0]}"#.to_string())),
            t(5.0),
        );
        let token = send_of(
            &s.dispatch(Action::SetLanguage(Some("de-DE".to_string())), t(10.0)),
            RequestKind::Route,
        );
        s.handle_response(token, Ok((200, route_body(&line()))), t(11.0));

        assert!(s.heightgraph().is_some());
        // Reopening needs no request and still shows the profile.
        assert!(s.open_heightgraph().is_none());
        assert_eq!(s.heightgraph().map(|d| d.samples.len()), Some(3));
    }

    #[test]
    fn profile_answer_outliving_a_same_route_refetch_is_kept() {
        let mut s = routed_session();
        let Some(Effect::Send { token, .. }) = s.open_heightgraph() else {
            panic!("expected a request");
        };
        let route = send_of(
            &s.dispatch(Action::SetLanguage(Some("de-DE".to_string())), t(10.0)),
            RequestKind::Route,
        );
        s.handle_response(route, Ok((200, route_body(&line()))), t(11.0));
        s.handle_response(
            token,
            Ok((200, r#"{"height":[1.0,2.0,3.0]}"#.to_string())),
            t(12.0),
        );
        assert!(s.heightgraph().is_some());
    }

    #[test]
    fn highlight_survives_until_next_result() {
        let mut s = routed_session();
        s.dispatch(
            Action::SetHighlight(Some(HighlightSegment::new(RouteKind::Main, 0, 1))),
            t(60.0),
        );
        assert_eq!(
            s.render_layers().highlight_line.unwrap().coordinates.len(),
            2
        );
    }

    #[test]
    fn geolocation_messages_differ() {
        let mut s = Session::new(AppConfig::default());
        let denied = s.geolocation_failed(GeolocationError::from_code(1, String::new()));
        let other = s.geolocation_failed(GeolocationError::from_code(3, "timeout".to_string()));
        assert_ne!(denied, other);
        assert!(matches!(&denied[..], [Effect::Notify(n)] if n.message.contains("browser settings")));
    }

    #[test]
    fn geolocation_sets_first_waypoint() {
        let mut s = Session::new(AppConfig::default());
        s.geolocated(LatLng::new(1.0, 2.0), t(0.0));
        assert_eq!(
            s.state.waypoints.get(0).unwrap().position(),
            Some(LatLng::new(1.0, 2.0))
        );
    }

    #[test]
    fn status_reports_tileset_age() {
        let mut s = Session::new(AppConfig::default());
        let Effect::Send { token, request } = s.request_status() else {
            panic!("expected a request");
        };
        assert_eq!(request.method, Method::Get);
        assert!(request.url.ends_with("/status"));
        s.handle_response(
            token,
            Ok((200, r#"{"tileset_last_modified":1000}"#.to_string())),
            t(0.0),
        );
        assert_eq!(s.tileset_age(1000 + 3600).as_deref(), Some("1h"));
    }

    #[test]
    fn export_needs_a_result() {
        let s = Session::new(AppConfig::default());
        assert!(s
            .export(ExportKind::Directions, ExportFormat::Json, 1)
            .is_err());
        let s = routed_session();
        let file = s
            .export(ExportKind::Directions, ExportFormat::GeoJson, 1_700_000_000_000)
            .unwrap();
        assert_eq!(file.filename, "valhalla-directions_1700000000000.geojson");
        assert!(file.contents.contains("LineString"));
    }

    #[test]
    fn permalink_round_trip() {
        let s = routed_session();
        let url = s.permalink("https://example.org/", None).unwrap();
        let mut fresh = Session::new(AppConfig::default());
        let out = fresh.load_permalink(&url, t(0.0)).unwrap();
        assert_eq!(fresh.state.waypoints.positions(), s.state.waypoints.positions());
        assert_eq!(sends(&out).iter().filter(|(tk, ..)| tk.slot.kind == RequestKind::Route).count(), 1);
    }
}
