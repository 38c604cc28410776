use gloo_net::http::{Request, RequestBuilder};
use std::cell::RefCell;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_futures::spawn_local;

use catalog::{
    AppConfig, InMemoryPreferenceStore, LocalStoragePreferenceStore, PreferenceStore, Preferences,
    StoredView,
};
use compute::chart::{ChartDimensions, ChartLayout, ResizeEdge, ResizeState};
use foundation::coords::LatLng;
use foundation::screen::ScreenPoint;
use foundation::time::Millis;
use formats::export::{ExportFormat, ExportKind};
use formats::profile::Profile;
use formats::route::RouteKind;
use runtime::clock::Clock;
use scene::actions::Action;
use scene::highlight::HighlightSegment;
use scene::state::{GeocodeTarget, Tab};
use scene::waypoints::WaypointId;
use serde_json::{Value, json};
use streaming::request::RequestToken;

pub mod map_controller;
pub mod render;
pub mod session;

use map_controller::{ControllerEffect, MenuChoice, PointerEvent};
use session::{Effect, GeolocationError, HttpRequest, Method, Notification, Session};

// Guard to prevent double-initialization of global state (relevant during hot reload).
static INITIALIZED: AtomicBool = AtomicBool::new(false);
static PANIC_HOOK_SET: OnceLock<()> = OnceLock::new();

/// Wall clock for debounce windows.
struct BrowserClock;

impl Clock for BrowserClock {
    fn now(&self) -> Millis {
        Millis(js_sys::Date::now())
    }
}

fn now() -> Millis {
    BrowserClock.now()
}

enum BrowserStore {
    Local(LocalStoragePreferenceStore),
    Memory(InMemoryPreferenceStore),
}

impl BrowserStore {
    fn new() -> Self {
        match LocalStoragePreferenceStore::new() {
            Ok(s) => BrowserStore::Local(s),
            Err(e) => {
                log(&format!("preferences kept in memory only: {e}"));
                BrowserStore::Memory(InMemoryPreferenceStore::new())
            }
        }
    }

    fn as_dyn(&self) -> &dyn PreferenceStore {
        match self {
            BrowserStore::Local(s) => s,
            BrowserStore::Memory(s) => s,
        }
    }

    fn as_dyn_mut(&mut self) -> &mut dyn PreferenceStore {
        match self {
            BrowserStore::Local(s) => s,
            BrowserStore::Memory(s) => s,
        }
    }
}

/// Things the page picks up with `take_updates`.
#[derive(Default)]
struct Outbox {
    notifications: Vec<Notification>,
    controller: Vec<ControllerEffect>,
    fit: Option<compute::viewport::FitResult>,
    dirty: bool,
}

struct WebApp {
    session: Session,
    store: BrowserStore,
    preferences: Preferences,
    outbox: Outbox,
    chart: ResizeState,
}

thread_local! {
    static STATE: RefCell<Option<WebApp>> = const { RefCell::new(None) };
}

/// Safe TLS access helper that returns a default on teardown instead of panicking.
fn with_state<F, R>(f: F) -> R
where
    F: FnOnce(&RefCell<Option<WebApp>>) -> R,
    R: Default,
{
    STATE.try_with(f).unwrap_or_default()
}

/// Runs `f` against the initialized app.
fn with_app<F, R>(f: F) -> Result<R, JsValue>
where
    F: FnOnce(&mut WebApp) -> R,
{
    let out = with_state(|state| state.borrow_mut().as_mut().map(f));
    out.ok_or_else(|| JsValue::from_str("init_app has not been called"))
}

fn init_panic_hook() {
    PANIC_HOOK_SET.get_or_init(|| {
        console_error_panic_hook::set_once();
    });
}

fn log(msg: &str) {
    web_sys::console::log_1(&JsValue::from_str(msg));
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    // Avoid double-initialization (can happen during hot-reload edge cases).
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }
    init_panic_hook();
    Ok(())
}

/// Builds the app from an optional JSON config and the persisted preferences.
#[wasm_bindgen]
pub fn init_app(config_json: Option<String>) -> Result<(), JsValue> {
    let config = match config_json.as_deref() {
        Some(raw) => AppConfig::from_json(raw).map_err(js_err)?,
        None => AppConfig::default(),
    };
    let store = BrowserStore::new();
    let preferences = Preferences::load(store.as_dyn());
    let config = config.with_persisted(&preferences);
    let app = WebApp {
        session: Session::new(config),
        store,
        preferences,
        outbox: Outbox::default(),
        chart: ResizeState::new(600.0, 200.0),
    };
    with_state(|state| *state.borrow_mut() = Some(app));
    Ok(())
}

/// Tears down pending timers; nothing fires afterwards.
#[wasm_bindgen]
pub fn teardown() {
    with_state(|state| {
        if let Some(mut app) = state.borrow_mut().take() {
            app.session.teardown();
        }
    });
}

// Effect execution.

fn run_effects(effects: Vec<Effect>) {
    let mut sends = Vec::new();
    let _ = with_app(|app| {
        for effect in effects {
            match effect {
                Effect::Send { token, request } => sends.push((token, request)),
                Effect::Notify(n) => app.outbox.notifications.push(n),
                Effect::FitBounds(fit) => app.outbox.fit = Some(fit),
                Effect::Controller(c) => app.outbox.controller.push(c),
                Effect::Redraw => app.outbox.dirty = true,
            }
        }
    });
    for (token, request) in sends {
        send(token, request);
    }
    schedule_tick();
}

fn send(token: RequestToken, request: HttpRequest) {
    spawn_local(async move {
        let result = perform(&request).await;
        if let Err(e) = &result {
            log(&format!("{} {} failed: {e}", request.method.as_str(), request.url));
        }
        let effects = with_app(|app| app.session.handle_response(token, result, now()))
            .unwrap_or_default();
        run_effects(effects);
    });
}

async fn perform(request: &HttpRequest) -> Result<(u16, String), String> {
    let builder: RequestBuilder = match request.method {
        Method::Get => Request::get(&request.url),
        Method::Post => Request::post(&request.url).header("Content-Type", "application/json"),
    };
    let resp = match &request.body {
        Some(body) => builder
            .body(body.clone())
            .map_err(|e| e.to_string())?
            .send()
            .await,
        None => builder.send().await,
    }
    .map_err(|e| e.to_string())?;
    let status = resp.status();
    let text = resp.text().await.map_err(|e| e.to_string())?;
    Ok((status, text))
}

/// Sleeps until the next debounce deadline, then releases what is due.
fn schedule_tick() {
    let Ok(Some(deadline)) = with_app(|app| app.session.next_deadline()) else {
        return;
    };
    let delay = deadline.elapsed_since(now()).ceil() as i32;
    spawn_local(async move {
        sleep_ms(delay).await;
        let effects = with_app(|app| app.session.tick(now())).unwrap_or_default();
        if !effects.is_empty() {
            run_effects(effects);
        }
    });
}

async fn sleep_ms(ms: i32) {
    let promise = js_sys::Promise::new(&mut |resolve, _| {
        if let Some(window) = web_sys::window() {
            let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms);
        }
    });
    let _ = JsFuture::from(promise).await;
}

fn dispatch(action: Action) -> Result<(), JsValue> {
    let effects = with_app(|app| app.session.dispatch(action, now()))?;
    run_effects(effects);
    Ok(())
}

fn geocode_target(target: &str) -> Result<GeocodeTarget, JsValue> {
    if target == "iso" {
        return Ok(GeocodeTarget::IsoCenter);
    }
    target
        .parse::<u64>()
        .map(|id| GeocodeTarget::Waypoint(WaypointId(id)))
        .map_err(|_| JsValue::from_str(&format!("unknown geocode target: {target}")))
}

// Map interaction.

#[wasm_bindgen]
pub fn map_click(x: f64, y: f64, lat: f64, lng: f64) -> Result<(), JsValue> {
    pointer(PointerEvent::LeftClick {
        screen: ScreenPoint::new(x, y),
        position: LatLng::new(lat, lng),
    })
}

#[wasm_bindgen]
pub fn map_context_menu(x: f64, y: f64, lat: f64, lng: f64) -> Result<(), JsValue> {
    pointer(PointerEvent::RightClick {
        screen: ScreenPoint::new(x, y),
        position: LatLng::new(lat, lng),
    })
}

#[wasm_bindgen]
pub fn map_touch_start(x: f64, y: f64, lat: f64, lng: f64) -> Result<(), JsValue> {
    pointer(PointerEvent::TouchStart {
        screen: ScreenPoint::new(x, y),
        position: LatLng::new(lat, lng),
        at: now(),
    })
}

#[wasm_bindgen]
pub fn map_touch_end(x: f64, y: f64) -> Result<(), JsValue> {
    pointer(PointerEvent::TouchEnd {
        screen: ScreenPoint::new(x, y),
        at: now(),
    })
}

#[wasm_bindgen]
pub fn close_popup() -> Result<(), JsValue> {
    pointer(PointerEvent::Close)
}

fn pointer(event: PointerEvent) -> Result<(), JsValue> {
    let effects = with_app(|app| app.session.pointer(event))?;
    run_effects(effects);
    Ok(())
}

#[wasm_bindgen]
pub fn choose_menu(choice: &str) -> Result<(), JsValue> {
    let choice = match choice {
        "directions_from" => MenuChoice::DirectionsFrom,
        "add_via" => MenuChoice::AddVia,
        "directions_to" => MenuChoice::DirectionsTo,
        "set_center" => MenuChoice::SetCenter,
        other => return Err(JsValue::from_str(&format!("unknown menu entry: {other}"))),
    };
    let effects = with_app(|app| app.session.choose_menu(choice, now()))?;
    run_effects(effects);
    Ok(())
}

#[wasm_bindgen]
pub fn set_draw_mode(active: bool) -> Result<(), JsValue> {
    let effects = with_app(|app| app.session.set_draw_mode(active))?;
    run_effects(effects);
    Ok(())
}

/// Menu entries for the current tab as `[{id, label}]` JSON.
#[wasm_bindgen]
pub fn context_menu_entries() -> Result<String, JsValue> {
    with_app(|app| {
        let entries: Vec<Value> = MenuChoice::for_tab(app.session.state.tab)
            .iter()
            .map(|c| {
                let id = match c {
                    MenuChoice::DirectionsFrom => "directions_from",
                    MenuChoice::AddVia => "add_via",
                    MenuChoice::DirectionsTo => "directions_to",
                    MenuChoice::SetCenter => "set_center",
                };
                json!({ "id": id, "label": c.label() })
            })
            .collect();
        Value::Array(entries).to_string()
    })
}

#[wasm_bindgen]
pub fn set_layout(viewport_width: f64, panel_open: bool) -> Result<(), JsValue> {
    with_app(|app| app.session.set_layout(viewport_width, panel_open))
}

// Waypoints and geocoding.

#[wasm_bindgen]
pub fn marker_drag_end(target: &str, lat: f64, lng: f64) -> Result<(), JsValue> {
    dispatch(Action::MarkerDragEnd {
        target: geocode_target(target)?,
        position: LatLng::new(lat, lng),
    })
}

#[wasm_bindgen]
pub fn set_user_input(target: &str, text: String) -> Result<(), JsValue> {
    dispatch(Action::SetUserInput {
        target: geocode_target(target)?,
        text,
    })
}

#[wasm_bindgen]
pub fn select_geocode_result(target: &str, address_index: usize) -> Result<(), JsValue> {
    dispatch(Action::SelectGeocodeResult {
        target: geocode_target(target)?,
        address_index,
    })
}

#[wasm_bindgen]
pub fn add_waypoint() -> Result<(), JsValue> {
    dispatch(Action::AddWaypoint)
}

#[wasm_bindgen]
pub fn remove_waypoint(index: usize) -> Result<(), JsValue> {
    dispatch(Action::RemoveWaypoint(index))
}

#[wasm_bindgen]
pub fn reorder_waypoints(from: usize, to: usize) -> Result<(), JsValue> {
    dispatch(Action::ReorderWaypoints { from, to })
}

#[wasm_bindgen]
pub fn clear_waypoints() -> Result<(), JsValue> {
    dispatch(Action::ClearWaypoints)
}

// Settings.

#[wasm_bindgen]
pub fn set_tab(tab: &str) -> Result<(), JsValue> {
    let tab = match tab {
        "isochrones" => Tab::Isochrones,
        _ => Tab::Directions,
    };
    dispatch(Action::SetTab(tab))
}

#[wasm_bindgen]
pub fn set_profile(profile: &str) -> Result<(), JsValue> {
    let profile: Profile = profile.parse().map_err(js_err)?;
    dispatch(Action::SetProfile(profile))
}

/// `value_json` is any JSON value, e.g. `0.5` or `true`.
#[wasm_bindgen]
pub fn set_costing_option(key: String, value_json: &str) -> Result<(), JsValue> {
    let value: Value = serde_json::from_str(value_json).map_err(js_err)?;
    dispatch(Action::SetCostingOption { key, value })
}

#[wasm_bindgen]
pub fn set_alternates(n: u32) -> Result<(), JsValue> {
    dispatch(Action::SetAlternates(n))
}

#[wasm_bindgen]
pub fn set_language(language: Option<String>) -> Result<(), JsValue> {
    if let Some(lang) = language.as_deref() {
        with_app(|app| {
            if let Err(e) = Preferences::save_directions_language(app.store.as_dyn_mut(), lang) {
                log(&format!("language not saved: {e}"));
            }
        })?;
    }
    dispatch(Action::SetLanguage(language))
}

#[wasm_bindgen]
pub fn set_iso_range(minutes: u32) -> Result<(), JsValue> {
    dispatch(Action::SetIsoRange(minutes))
}

#[wasm_bindgen]
pub fn set_iso_interval(minutes: u32) -> Result<(), JsValue> {
    dispatch(Action::SetIsoInterval(minutes))
}

#[wasm_bindgen]
pub fn set_iso_denoise(v: f64) -> Result<(), JsValue> {
    dispatch(Action::SetIsoDenoise(v))
}

#[wasm_bindgen]
pub fn set_iso_generalize(v: f64) -> Result<(), JsValue> {
    dispatch(Action::SetIsoGeneralize(v))
}

/// Exclusion polygons drawn on the map, as a GeoJSON FeatureCollection.
#[wasm_bindgen]
pub fn sync_exclusions(collection_json: &str) -> Result<(), JsValue> {
    let fc = formats::geojson::FeatureCollection::from_geojson_str(collection_json)
        .map_err(js_err)?;
    dispatch(Action::SyncExclusions(fc.features))
}

// Results.

#[wasm_bindgen]
pub fn toggle_route(alternate: i32) -> Result<(), JsValue> {
    let kind = RouteKind::from_raw(alternate)
        .ok_or_else(|| JsValue::from_str(&format!("bad route index {alternate}")))?;
    dispatch(Action::ToggleRoute(kind))
}

#[wasm_bindgen]
pub fn toggle_isochrone() -> Result<(), JsValue> {
    dispatch(Action::ToggleIsochrone)
}

/// `alternate` is `-1` for the main route. Invalid input clears the highlight.
#[wasm_bindgen]
pub fn set_highlight(start_index: i32, end_index: i32, alternate: i32) -> Result<(), JsValue> {
    dispatch(Action::SetHighlight(HighlightSegment::from_raw(
        start_index,
        end_index,
        alternate,
    )))
}

#[wasm_bindgen]
pub fn clear_highlight() -> Result<(), JsValue> {
    dispatch(Action::SetHighlight(None))
}

/// Map sources and markers as JSON (see `render::map_document`).
#[wasm_bindgen]
pub fn map_document() -> Result<String, JsValue> {
    with_app(|app| {
        render::map_document(&app.session.render_layers(), app.session.heightgraph_hover())
            .to_string()
    })
}

#[wasm_bindgen]
pub fn waypoint_panel() -> Result<String, JsValue> {
    with_app(|app| render::waypoint_panel(&app.session.state).to_string())
}

#[wasm_bindgen]
pub fn directions_panel() -> Result<String, JsValue> {
    with_app(|app| render::directions_panel(&app.session.state).to_string())
}

/// Drains notifications, camera fits and popup changes since the last call.
#[wasm_bindgen]
pub fn take_updates() -> Result<JsValue, JsValue> {
    let outbox = with_app(|app| std::mem::take(&mut app.outbox))?;
    let out = js_sys::Object::new();

    let notifications = js_sys::Array::new();
    for n in &outbox.notifications {
        let item = js_sys::Object::new();
        let level = match n.level {
            session::Level::Info => "info",
            session::Level::Error => "error",
        };
        js_sys::Reflect::set(&item, &JsValue::from_str("level"), &JsValue::from_str(level))?;
        js_sys::Reflect::set(
            &item,
            &JsValue::from_str("message"),
            &JsValue::from_str(&n.message),
        )?;
        notifications.push(&item);
    }
    js_sys::Reflect::set(&out, &JsValue::from_str("notifications"), &notifications)?;

    if let Some(fit) = outbox.fit {
        let b = fit.bounds;
        let value = json!({
            "bounds": [
                [b.south_west.lng, b.south_west.lat],
                [b.north_east.lng, b.north_east.lat],
            ],
            "max_zoom": fit.max_zoom,
            "padding": {
                "top": fit.padding.top,
                "right": fit.padding.right,
                "bottom": fit.padding.bottom,
                "left": fit.padding.left,
            },
        });
        js_sys::Reflect::set(
            &out,
            &JsValue::from_str("fit"),
            &JsValue::from_str(&value.to_string()),
        )?;
    }

    let controller = js_sys::Array::new();
    for c in &outbox.controller {
        let value = match c {
            ControllerEffect::OpenInfoPopup { position } => {
                json!({ "open": "info", "position": [position.lng, position.lat] })
            }
            ControllerEffect::OpenContextMenu { position, screen } => json!({
                "open": "menu",
                "position": [position.lng, position.lat],
                "screen": [screen.x, screen.y],
            }),
            ControllerEffect::CloseInfoPopup => json!({ "close": "info" }),
            ControllerEffect::CloseContextMenu => json!({ "close": "menu" }),
        };
        controller.push(&JsValue::from_str(&value.to_string()));
    }
    js_sys::Reflect::set(&out, &JsValue::from_str("popups"), &controller)?;
    js_sys::Reflect::set(
        &out,
        &JsValue::from_str("redraw"),
        &JsValue::from_bool(outbox.dirty),
    )?;
    Ok(out.into())
}

/// Contents of the info popup, or `null` when closed.
#[wasm_bindgen]
pub fn popup_json() -> Result<String, JsValue> {
    with_app(|app| {
        let Some(popup) = app.session.popup() else {
            return "null".to_string();
        };
        let (lat_lng, lng_lat) = popup.coordinate_labels();
        let edges: Vec<Value> = popup
            .edges
            .iter()
            .map(|e| {
                json!({
                    "way_id": e.way_id,
                    "position": [e.correlated_lon, e.correlated_lat],
                    "side_of_street": e.side_of_street,
                    "percent_along": e.percent_along,
                })
            })
            .collect();
        json!({
            "lat_lng": lat_lng,
            "lng_lat": lng_lat,
            "elevation": popup.elevation,
            "elevation_loading": app.session.is_popup_height_loading(),
            "locate_loading": app.session.is_popup_locate_loading(),
            "edges": edges,
        })
        .to_string()
    })
}

#[wasm_bindgen]
pub fn is_loading(kind: &str) -> Result<bool, JsValue> {
    use streaming::request::RequestKind;
    let kind = match kind {
        "route" => RequestKind::Route,
        "isochrone" => RequestKind::Isochrone,
        "search" => RequestKind::Search,
        "reverse" => RequestKind::ReverseGeocode,
        other => return Err(JsValue::from_str(&format!("unknown request kind: {other}"))),
    };
    with_app(|app| app.session.is_loading(kind))
}

// Elevation chart.

#[wasm_bindgen]
pub fn open_heightgraph() -> Result<(), JsValue> {
    let effect = with_app(|app| app.session.open_heightgraph())?;
    run_effects(effect.into_iter().collect());
    Ok(())
}

fn chart_layout(app: &WebApp) -> Option<(ChartLayout, &compute::heightgraph::HeightgraphDataset)> {
    let (width, height) = app.chart.override_size.unwrap_or((app.chart.width, app.chart.height));
    let dataset = app.session.heightgraph()?;
    Some((ChartLayout::build(dataset, ChartDimensions::new(width, height)), dataset))
}

#[wasm_bindgen]
pub fn heightgraph_json() -> Result<String, JsValue> {
    with_app(|app| match chart_layout(app) {
        Some((layout, dataset)) => render::chart_document(dataset, &layout).to_string(),
        None => "null".to_string(),
    })
}

/// Hover at chart pixel `x`; returns the marker position in chart pixels.
#[wasm_bindgen]
pub fn heightgraph_hover(x_px: f64) -> Result<Option<Vec<f64>>, JsValue> {
    with_app(|app| {
        let (distance, marker) = {
            let (layout, dataset) = chart_layout(app)?;
            let sample = layout.hover_at(dataset, x_px)?;
            let marker = layout.marker_for(sample);
            (sample.distance, marker)
        };
        app.session.hover_heightgraph(Some(distance));
        app.outbox.dirty = true;
        Some(vec![marker.x, marker.y])
    })
}

#[wasm_bindgen]
pub fn heightgraph_leave() -> Result<(), JsValue> {
    with_app(|app| {
        app.session.hover_heightgraph(None);
        app.outbox.dirty = true;
    })
}

#[wasm_bindgen]
pub fn heightgraph_resize_start(edge: &str, x: f64, y: f64) -> Result<(), JsValue> {
    let edge = match edge {
        "w" => ResizeEdge::West,
        "n" => ResizeEdge::North,
        "nw" => ResizeEdge::NorthWest,
        other => return Err(JsValue::from_str(&format!("unknown resize edge: {other}"))),
    };
    with_app(|app| app.chart.start(edge, ScreenPoint::new(x, y)))
}

#[wasm_bindgen]
pub fn heightgraph_resize_move(x: f64, y: f64) -> Result<bool, JsValue> {
    with_app(|app| app.chart.drag(ScreenPoint::new(x, y)))
}

#[wasm_bindgen]
pub fn heightgraph_resize_stop() -> Result<(), JsValue> {
    with_app(|app| app.chart.stop())
}

#[wasm_bindgen]
pub fn heightgraph_set_size(width: f64, height: f64) -> Result<(), JsValue> {
    with_app(|app| {
        app.chart.width = width;
        app.chart.height = height;
    })
}

// Geolocation, status, permalink, export.

#[wasm_bindgen]
pub fn geolocated(lat: f64, lng: f64) -> Result<(), JsValue> {
    let effects = with_app(|app| app.session.geolocated(LatLng::new(lat, lng), now()))?;
    run_effects(effects);
    Ok(())
}

/// `code` is `GeolocationPositionError.code`.
#[wasm_bindgen]
pub fn geolocation_failed(code: u16, message: String) -> Result<(), JsValue> {
    let err = GeolocationError::from_code(code, message);
    let effects = with_app(|app| app.session.geolocation_failed(err))?;
    run_effects(effects);
    Ok(())
}

#[wasm_bindgen]
pub fn request_status() -> Result<(), JsValue> {
    let effect = with_app(|app| app.session.request_status())?;
    run_effects(vec![effect]);
    Ok(())
}

#[wasm_bindgen]
pub fn tileset_age() -> Result<Option<String>, JsValue> {
    let now_s = (js_sys::Date::now() / 1000.0) as i64;
    with_app(|app| app.session.tileset_age(now_s))
}

#[wasm_bindgen]
pub fn permalink_url(base: &str) -> Result<String, JsValue> {
    with_app(|app| {
        let style = Some(app.preferences.style.clone());
        app.session.permalink(base, style)
    })?
    .map_err(js_err)
}

#[wasm_bindgen]
pub fn load_permalink(url: &str) -> Result<(), JsValue> {
    let effects = with_app(|app| app.session.load_permalink(url, now()))?.map_err(js_err)?;
    run_effects(effects);
    Ok(())
}

/// `{filename, mime_type, contents}` for a download link.
#[wasm_bindgen]
pub fn export_result(kind: &str, format: &str) -> Result<JsValue, JsValue> {
    let kind = match kind {
        "isochrones" => ExportKind::Isochrones,
        _ => ExportKind::Directions,
    };
    let format = match format {
        "geojson" => ExportFormat::GeoJson,
        _ => ExportFormat::Json,
    };
    let ts = js_sys::Date::now() as u64;
    let file = with_app(|app| app.session.export(kind, format, ts))?.map_err(js_err)?;
    let out = js_sys::Object::new();
    js_sys::Reflect::set(
        &out,
        &JsValue::from_str("filename"),
        &JsValue::from_str(&file.filename),
    )?;
    js_sys::Reflect::set(
        &out,
        &JsValue::from_str("mime_type"),
        &JsValue::from_str(file.mime_type),
    )?;
    js_sys::Reflect::set(
        &out,
        &JsValue::from_str("contents"),
        &JsValue::from_str(&file.contents),
    )?;
    Ok(out.into())
}

// Preferences.

/// `[lat, lng, zoom]` to open the map with.
#[wasm_bindgen]
pub fn initial_view() -> Result<Vec<f64>, JsValue> {
    with_app(|app| {
        let (center, zoom) = app.session.config.initial_view(&app.preferences);
        vec![center.lat, center.lng, zoom]
    })
}

#[wasm_bindgen]
pub fn save_view(lat: f64, lng: f64, zoom: f64) -> Result<(), JsValue> {
    with_app(|app| {
        let view = StoredView::new(LatLng::new(lat, lng), zoom);
        app.preferences.last_view = Some(view);
        Preferences::save_view(app.store.as_dyn_mut(), view)
    })?
    .map_err(js_err)
}

#[wasm_bindgen]
pub fn style() -> Result<String, JsValue> {
    with_app(|app| app.preferences.style.clone())
}

#[wasm_bindgen]
pub fn set_style(style: String) -> Result<(), JsValue> {
    with_app(|app| {
        let saved = Preferences::save_style(app.store.as_dyn_mut(), &style);
        app.preferences.style = style;
        saved
    })?
    .map_err(js_err)
}

#[wasm_bindgen]
pub fn set_custom_style(style_json: &str) -> Result<(), JsValue> {
    let value: Value = serde_json::from_str(style_json).map_err(js_err)?;
    with_app(|app| {
        let saved = Preferences::save_custom_style(app.store.as_dyn_mut(), &value);
        app.preferences.custom_style = Some(value);
        saved
    })?
    .map_err(js_err)
}

/// `None` reverts to the configured default server.
#[wasm_bindgen]
pub fn set_server_url(url: Option<String>) -> Result<(), JsValue> {
    with_app(|app| {
        let saved = Preferences::save_server_url(app.store.as_dyn_mut(), url.as_deref());
        app.preferences.server_url = url;
        let base = AppConfig {
            base_url: catalog::DEFAULT_BASE_URL.to_string(),
            ..app.session.config.clone()
        };
        app.session.config = base.with_persisted(&app.preferences);
        saved
    })?
    .map_err(js_err)
}
