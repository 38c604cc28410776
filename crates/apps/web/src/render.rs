//! JSON documents handed to the host page: map sources, the directions panel
//! and the height chart. The page applies them to the map library verbatim.

use compute::chart::ChartLayout;
use compute::heightgraph::HeightgraphDataset;
use foundation::coords::{LatLng, LngLat};
use formats::display::format_length;
use formats::geojson::{Feature, FeatureCollection, Geometry};
use layers::layer::{Layer, LayerId};
use layers::narrative::{maneuver_rows, summary_views};
use layers::reconcile::{LinePass, MarkerKind, RenderLayers};
use layers::symbology::LayerStyle;
use scene::state::AppState;
use scene::waypoints::Waypoint;
use serde_json::{Map, Value, json};

fn style_json(style: &LayerStyle) -> Value {
    json!({
        "visible": style.visible,
        "color": style.css_color(),
        "opacity": style.opacity(),
        "width": style.width,
    })
}

fn collection(features: Vec<Feature>) -> Value {
    FeatureCollection::new(features).to_geojson_value()
}

/// One entry per map source. Every known source is always present so the
/// page can clear layers by applying an empty collection.
pub fn map_document(layers: &RenderLayers, hover: Option<LatLng>) -> Value {
    let mut sources = Map::new();

    for pass in [LinePass::Outline, LinePass::Line] {
        let lines: Vec<_> = layers.route_lines.iter().filter(|l| l.pass == pass).collect();
        let id = match pass {
            LinePass::Outline => LayerId::ROUTE_OUTLINE,
            LinePass::Line => LayerId::ROUTE_LINE,
        };
        let features = lines
            .iter()
            .map(|l| {
                l.feature
                    .clone()
                    .with_property("line_color", l.style.css_color())
                    .with_property("line_width", f64::from(l.style.width))
                    .with_property("line_opacity", f64::from(l.style.opacity()))
            })
            .collect();
        sources.insert(id.as_str().to_string(), collection(features));
    }

    let (highlight, highlight_style) = match &layers.highlight_line {
        Some(h) => (
            vec![
                Feature::new(Geometry::LineString(h.coordinates.clone()))
                    .with_property("type", h.route.as_str()),
            ],
            Some(style_json(&h.style)),
        ),
        None => (Vec::new(), None),
    };
    let highlight_id = layers
        .highlight_line
        .as_ref()
        .map(|h| h.id())
        .unwrap_or(LayerId::HIGHLIGHT);
    sources.insert(highlight_id.as_str().to_string(), collection(highlight));

    sources.insert(
        LayerId::ISO_POLYGONS.as_str().to_string(),
        collection(layers.iso_polygons.clone()),
    );
    sources.insert(
        LayerId::ISO_POINTS.as_str().to_string(),
        collection(layers.iso_points.clone()),
    );

    let hover_features = hover
        .map(|p| vec![Feature::new(Geometry::Point(LngLat::from(p)))])
        .unwrap_or_default();
    sources.insert(
        LayerId::HEIGHTGRAPH_HOVER.as_str().to_string(),
        collection(hover_features),
    );

    let markers: Vec<Value> = layers
        .markers
        .iter()
        .map(|m| {
            let kind = match m.kind {
                MarkerKind::Waypoint { .. } => "waypoint",
                MarkerKind::IsoCenter => "iso-center",
            };
            json!({
                "key": m.key,
                "kind": kind,
                "label": m.label,
                "title": m.title,
                "position": m.position.as_array(),
            })
        })
        .collect();

    json!({
        "sources": Value::Object(sources),
        "highlight_style": highlight_style,
        "markers": markers,
    })
}

/// Route summaries and maneuver rows of every computed route.
pub fn directions_panel(state: &AppState) -> Value {
    let Some(set) = state.directions.route_set() else {
        return json!({ "routes": [] });
    };
    let routes: Vec<Value> = set
        .routes()
        .zip(summary_views(set))
        .map(|(route, summary)| {
            let rows: Vec<Value> = maneuver_rows(route)
                .into_iter()
                .map(|row| {
                    json!({
                        "leg": row.leg,
                        "type": row.maneuver_type,
                        "instruction": row.instruction,
                        "length": row.length,
                        "time": row.time,
                        "toll": row.toll,
                        "ferry": row.ferry,
                        "highlight": [
                            row.highlight.start_index,
                            row.highlight.end_index,
                            row.highlight.route.to_raw(),
                        ],
                    })
                })
                .collect();
            json!({
                "alternate": summary.kind.to_raw(),
                "title": summary.title,
                "length": summary.length,
                "time": summary.time,
                "has_toll": summary.has_toll,
                "has_ferry": summary.has_ferry,
                "has_highway": summary.has_highway,
                "shown": state.directions.show.is_shown(summary.kind),
                "maneuvers": rows,
            })
        })
        .collect();
    json!({ "routes": routes })
}

fn slot_json(target: String, slot: &Waypoint) -> Value {
    let results: Vec<Value> = slot
        .geocode_results
        .iter()
        .map(|r| {
            json!({
                "title": r.title,
                "description": r.description,
                "address_index": r.address_index,
                "selected": r.selected,
            })
        })
        .collect();
    json!({
        "target": target,
        "user_input": slot.user_input,
        "results": results,
    })
}

/// Input slots of the panel. `target` is what geocoding calls take back.
pub fn waypoint_panel(state: &AppState) -> Value {
    let waypoints: Vec<Value> = state
        .waypoints
        .iter()
        .map(|w| slot_json(w.id.0.to_string(), w))
        .collect();
    json!({
        "waypoints": waypoints,
        "iso_center": slot_json("iso".to_string(), &state.iso_center),
    })
}

/// Area bands in pixel space plus the headline totals.
pub fn chart_document(dataset: &HeightgraphDataset, layout: &ChartLayout) -> Value {
    let bands: Vec<Value> = layout
        .bands
        .iter()
        .map(|b| {
            let outline: Vec<[f64; 2]> = b.outline.iter().map(|p| [p.x, p.y]).collect();
            json!({ "level": b.bucket.level(), "color": b.color, "outline": outline })
        })
        .collect();
    let (min, max) = dataset.elevation_range().unwrap_or((0.0, 0.0));
    json!({
        "width": layout.dims.width,
        "height": layout.dims.height,
        "bands": bands,
        "total_length": format_length(dataset.total_distance() / 1000.0),
        "incline": dataset.incline_total.round(),
        "decline": dataset.decline_total.round(),
        "min_elevation": min,
        "max_elevation": max,
    })
}
