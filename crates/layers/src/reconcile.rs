//! Derives the full set of map layers from the stores.
//!
//! `reconcile` is pure: same inputs, same layers. It is rerun whenever a
//! result identity, the show state, the highlight or a selected geocode result
//! changes, and the map adapter diffs the output against what it has drawn.

use foundation::coords::{LngLat, to_lng_lat};
use formats::geojson::{Feature, Geometry};
use formats::isochrone::IsochroneResult;
use formats::route::{RouteKind, RouteResult, RouteSet};
use scene::highlight::HighlightSegment;
use scene::show::ShowState;
use scene::state::AppState;
use scene::waypoints::{Waypoint, Waypoints};

use crate::layer::{Layer, LayerId};
use crate::symbology::{LayerStyle, highlight_style, route_line_style, route_outline_style};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LinePass {
    /// Wide contrasting stroke, drawn first.
    Outline,
    Line,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteLine {
    pub kind: RouteKind,
    pub pass: LinePass,
    pub style: LayerStyle,
    /// `LineString` in map order with `color`, `type`, `alternate` and
    /// `summary` properties.
    pub feature: Feature,
}

impl Layer for RouteLine {
    fn id(&self) -> LayerId {
        match self.pass {
            LinePass::Outline => LayerId::ROUTE_OUTLINE,
            LinePass::Line => LayerId::ROUTE_LINE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HighlightLine {
    pub route: RouteKind,
    pub style: LayerStyle,
    pub coordinates: Vec<LngLat>,
}

impl Layer for HighlightLine {
    fn id(&self) -> LayerId {
        LayerId::HIGHLIGHT
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MarkerKind {
    Waypoint { index: usize },
    IsoCenter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Stable across renders: `waypoint-{index}` or `iso-center`.
    pub key: String,
    pub kind: MarkerKind,
    /// 1-based number shown on waypoint pins.
    pub label: Option<String>,
    pub title: String,
    pub position: LngLat,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderLayers {
    /// Outline/line pairs, bottom to top. The main route's pair is last.
    pub route_lines: Vec<RouteLine>,
    /// Absent (not empty) when nothing is highlighted.
    pub highlight_line: Option<HighlightLine>,
    pub iso_polygons: Vec<Feature>,
    pub iso_points: Vec<Feature>,
    pub markers: Vec<Marker>,
}

/// Everything the reconciler reads, borrowed from wherever it lives.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileInput<'a> {
    pub routes: Option<&'a RouteSet>,
    pub show: &'a ShowState,
    pub highlight: Option<HighlightSegment>,
    pub isochrone: Option<&'a IsochroneResult>,
    pub isochrone_shown: bool,
    pub waypoints: &'a Waypoints,
    pub iso_center: &'a Waypoint,
}

impl<'a> ReconcileInput<'a> {
    pub fn from_state(state: &'a AppState) -> Self {
        Self {
            routes: state.directions.route_set(),
            show: &state.directions.show,
            highlight: state.highlight,
            isochrone: state.isochrones.result(),
            isochrone_shown: state.isochrones.show.is_shown(),
            waypoints: &state.waypoints,
            iso_center: &state.iso_center,
        }
    }
}

pub fn reconcile(input: &ReconcileInput<'_>) -> RenderLayers {
    RenderLayers {
        route_lines: input
            .routes
            .map(|set| route_lines(set, input.show))
            .unwrap_or_default(),
        highlight_line: input
            .routes
            .zip(input.highlight)
            .and_then(|(set, h)| highlight_line(set, h)),
        iso_polygons: iso_layer(input, |r| r.polygons().cloned().collect()),
        iso_points: iso_layer(input, |r| r.locations().cloned().collect()),
        markers: markers(input.waypoints, input.iso_center),
    }
}

pub fn reconcile_state(state: &AppState) -> RenderLayers {
    reconcile(&ReconcileInput::from_state(state))
}

fn route_lines(set: &RouteSet, show: &ShowState) -> Vec<RouteLine> {
    let mut out = Vec::new();
    // Alternates first so the main pair ends up on top.
    for route in set.alternates.iter().chain(std::iter::once(&set.main)) {
        if !show.is_shown(route.kind) {
            continue;
        }
        let feature = route_feature(route);
        out.push(RouteLine {
            kind: route.kind,
            pass: LinePass::Outline,
            style: route_outline_style(),
            feature: feature.clone(),
        });
        out.push(RouteLine {
            kind: route.kind,
            pass: LinePass::Line,
            style: route_line_style(route.kind),
            feature,
        });
    }
    out
}

fn route_feature(route: &RouteResult) -> Feature {
    let style = route_line_style(route.kind);
    let summary = serde_json::to_value(route.summary()).unwrap_or_default();
    Feature::new(Geometry::LineString(to_lng_lat(&route.decoded_geometry)))
        .with_property("color", style.css_color())
        .with_property("type", route.kind.as_str())
        .with_property("alternate", route.kind.to_raw())
        .with_property("summary", summary)
}

fn highlight_line(set: &RouteSet, h: HighlightSegment) -> Option<HighlightLine> {
    if !h.resolves_in(set) {
        return None;
    }
    let route = set.get(h.route)?;
    let slice = route.decoded_geometry.get(h.start_index..=h.end_index)?;
    Some(HighlightLine {
        route: h.route,
        style: highlight_style(),
        coordinates: to_lng_lat(slice),
    })
}

fn iso_layer(
    input: &ReconcileInput<'_>,
    select: impl Fn(&IsochroneResult) -> Vec<Feature>,
) -> Vec<Feature> {
    match input.isochrone {
        Some(r) if input.isochrone_shown => select(r),
        _ => Vec::new(),
    }
}

fn markers(waypoints: &Waypoints, iso_center: &Waypoint) -> Vec<Marker> {
    let mut out = Vec::new();
    for (index, wp) in waypoints.iter().enumerate() {
        let Some(selected) = wp.selected() else {
            continue;
        };
        out.push(Marker {
            key: format!("waypoint-{index}"),
            kind: MarkerKind::Waypoint { index },
            label: Some((index + 1).to_string()),
            title: selected.title.clone(),
            position: LngLat::from_array(selected.display_lng_lat),
        });
    }
    if let Some(selected) = iso_center.selected() {
        out.push(Marker {
            key: "iso-center".to_string(),
            kind: MarkerKind::IsoCenter,
            label: None,
            title: selected.title.clone(),
            position: LngLat::from_array(selected.display_lng_lat),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{LinePass, MarkerKind, ReconcileInput, reconcile, reconcile_state};
    use crate::layer::{Layer, LayerId};
    use foundation::coords::{LatLng, LngLat};
    use formats::isochrone::{IsochroneOutcome, normalize_isochrone};
    use formats::polyline::{SERVICE_PRECISION, encode};
    use formats::route::{RouteKind, RouteOutcome, RouteSet, normalize_route};
    use pretty_assertions::assert_eq;
    use scene::actions::Action;
    use scene::highlight::HighlightSegment;
    use scene::show::ShowState;
    use scene::state::AppState;
    use serde_json::{Value, json};

    fn leg(points: &[LatLng]) -> Value {
        let last = points.len() - 1;
        json!({
            "shape": encode(points, SERVICE_PRECISION),
            "maneuvers": [{"type": 1, "begin_shape_index": 0, "end_shape_index": last}]
        })
    }

    fn trip(points: &[LatLng], length: f64) -> Value {
        json!({"status": 0, "summary": {"length": length, "time": 100.0}, "legs": [leg(points)]})
    }

    fn four_points() -> Vec<LatLng> {
        vec![
            LatLng::new(52.0, 13.0),
            LatLng::new(52.1, 13.1),
            LatLng::new(52.2, 13.2),
            LatLng::new(52.3, 13.3),
        ]
    }

    fn route_set(alternates: usize) -> RouteSet {
        let main = four_points();
        let alts: Vec<Value> = (0..alternates)
            .map(|i| {
                let pts = vec![LatLng::new(52.0, 13.0), LatLng::new(52.0 + i as f64, 14.0)];
                json!({"trip": trip(&pts, 3.0)})
            })
            .collect();
        let raw = json!({"trip": trip(&main, 2.0), "alternates": alts});
        match normalize_route(raw) {
            RouteOutcome::Found(set) => set,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    fn state_with(set: RouteSet) -> AppState {
        let mut s = AppState::new();
        s.apply(Action::SetRouteOutcome(RouteOutcome::Found(set)))
            .unwrap();
        s
    }

    #[test]
    fn highlight_slices_inclusive_in_map_order() {
        let mut s = state_with(route_set(0));
        s.highlight = HighlightSegment::from_raw(1, 2, -1);
        let layers = reconcile_state(&s);
        let h = layers.highlight_line.unwrap();
        assert_eq!(
            h.coordinates,
            vec![LngLat::new(13.1, 52.1), LngLat::new(13.2, 52.2)]
        );
        assert_eq!(h.id(), LayerId::HIGHLIGHT);
    }

    #[test]
    fn highlight_point_count_matches_span() {
        let set = route_set(0);
        let n = set.main.decoded_geometry.len();
        for start in 0..n {
            for end in start..n {
                let show = ShowState::for_routes(&set);
                let s = AppState::new();
                let input = ReconcileInput {
                    routes: Some(&set),
                    show: &show,
                    highlight: Some(HighlightSegment::new(RouteKind::Main, start, end)),
                    isochrone: None,
                    isochrone_shown: false,
                    waypoints: &s.waypoints,
                    iso_center: &s.iso_center,
                };
                let h = reconcile(&input).highlight_line.unwrap();
                assert_eq!(h.coordinates.len(), end - start + 1);
            }
        }
    }

    #[test]
    fn invalid_highlight_emits_nothing() {
        let mut s = state_with(route_set(1));
        for h in [
            HighlightSegment::new(RouteKind::Main, 2, 9),
            HighlightSegment::new(RouteKind::Main, 3, 1),
            HighlightSegment::new(RouteKind::Alternate(5), 0, 1),
        ] {
            s.highlight = Some(h);
            assert_eq!(reconcile_state(&s).highlight_line, None, "{h:?}");
        }
        s.highlight = Some(HighlightSegment::new(RouteKind::Alternate(0), 0, 1));
        assert!(reconcile_state(&s).highlight_line.is_some());
    }

    #[test]
    fn main_route_pair_is_drawn_last() {
        let s = state_with(route_set(2));
        let lines = reconcile_state(&s).route_lines;
        assert_eq!(lines.len(), 6);
        let order: Vec<(RouteKind, LinePass)> = lines.iter().map(|l| (l.kind, l.pass)).collect();
        assert_eq!(
            order,
            vec![
                (RouteKind::Alternate(0), LinePass::Outline),
                (RouteKind::Alternate(0), LinePass::Line),
                (RouteKind::Alternate(1), LinePass::Outline),
                (RouteKind::Alternate(1), LinePass::Line),
                (RouteKind::Main, LinePass::Outline),
                (RouteKind::Main, LinePass::Line),
            ]
        );
        let main = &lines[5].feature;
        assert_eq!(main.property_str("type"), Some("main"));
        assert_eq!(main.properties["summary"]["length"], 2.0);
        assert_eq!(lines[4].id(), LayerId::ROUTE_OUTLINE);
    }

    #[test]
    fn toggle_twice_restores_layers() {
        let mut s = state_with(route_set(1));
        let before = reconcile_state(&s);
        s.apply(Action::ToggleRoute(RouteKind::Alternate(0))).unwrap();
        let hidden = reconcile_state(&s);
        assert_eq!(hidden.route_lines.len(), 2);
        assert!(hidden.route_lines.iter().all(|l| l.kind == RouteKind::Main));
        s.apply(Action::ToggleRoute(RouteKind::Alternate(0))).unwrap();
        assert_eq!(reconcile_state(&s), before);
    }

    #[test]
    fn isochrone_input_points_are_filtered() {
        let raw = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"contour": 10, "area": 5},
                 "geometry": {"type": "Polygon", "coordinates": [[[13.0, 52.0], [13.1, 52.0], [13.1, 52.1], [13.0, 52.0]]]}},
                {"type": "Feature", "properties": {"type": "input"},
                 "geometry": {"type": "Point", "coordinates": [13.05, 52.05]}}
            ]
        });
        let mut s = AppState::new();
        s.apply(Action::SetIsochroneOutcome(normalize_isochrone(raw)))
            .unwrap();
        let layers = reconcile_state(&s);
        assert_eq!(layers.iso_polygons.len(), 1);
        assert_eq!(layers.iso_points.len(), 0);

        s.apply(Action::ToggleIsochrone).unwrap();
        assert!(reconcile_state(&s).iso_polygons.is_empty());
    }

    #[test]
    fn failed_isochrone_draws_nothing() {
        let mut s = AppState::new();
        s.apply(Action::SetIsochroneOutcome(IsochroneOutcome::NoResult {
            reason: "x".to_string(),
        }))
        .unwrap();
        assert!(reconcile_state(&s).iso_polygons.is_empty());
    }

    #[test]
    fn markers_have_stable_keys() {
        let mut s = AppState::new();
        s.apply(Action::DirectionsTo(LatLng::new(1.0, 2.0))).unwrap();
        s.apply(Action::SetIsoCenter(LatLng::new(3.0, 4.0))).unwrap();
        let markers = reconcile_state(&s).markers;
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].key, "waypoint-1");
        assert_eq!(markers[0].label.as_deref(), Some("2"));
        assert_eq!(markers[0].kind, MarkerKind::Waypoint { index: 1 });
        assert_eq!(markers[0].position, LngLat::new(2.0, 1.0));
        assert_eq!(markers[1].key, "iso-center");
        assert_eq!(reconcile_state(&s).markers, markers);
    }

    #[test]
    fn empty_state_renders_nothing() {
        assert_eq!(reconcile_state(&AppState::new()), super::RenderLayers::default());
    }
}
