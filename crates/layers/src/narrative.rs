//! Rows of the directions panel.

use formats::display::{format_duration, format_length, maneuver_metrics};
use formats::route::{RouteKind, RouteResult, RouteSet};
use scene::highlight::HighlightSegment;

#[derive(Debug, Clone, PartialEq)]
pub struct ManeuverRow {
    pub leg: usize,
    pub maneuver_type: u32,
    pub instruction: String,
    /// Formatted length, absent for arrivals.
    pub length: Option<String>,
    /// Formatted time, absent for arrivals.
    pub time: Option<String>,
    pub toll: bool,
    pub ferry: bool,
    /// Segment to highlight while the row is hovered.
    pub highlight: HighlightSegment,
}

pub fn maneuver_rows(route: &RouteResult) -> Vec<ManeuverRow> {
    route
        .maneuvers()
        .map(|(leg, m, (begin, end))| {
            let (length, time) = match maneuver_metrics(m) {
                Some((l, t)) => (Some(l), Some(t)),
                None => (None, None),
            };
            ManeuverRow {
                leg,
                maneuver_type: m.maneuver_type,
                instruction: m.instruction.clone(),
                length,
                time,
                toll: m.toll,
                ferry: m.ferry,
                highlight: HighlightSegment::new(route.kind, begin, end),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteSummaryView {
    pub kind: RouteKind,
    pub title: String,
    pub length: String,
    pub time: String,
    pub has_toll: bool,
    pub has_ferry: bool,
    pub has_highway: bool,
}

pub fn summary_views(set: &RouteSet) -> Vec<RouteSummaryView> {
    set.routes()
        .map(|r| {
            let s = r.summary();
            RouteSummaryView {
                kind: r.kind,
                title: match r.kind {
                    RouteKind::Main => "Main route".to_string(),
                    RouteKind::Alternate(i) => format!("Alternate route {}", i + 1),
                },
                length: format_length(s.length),
                time: format_duration(s.time),
                has_toll: s.has_toll,
                has_ferry: s.has_ferry,
                has_highway: s.has_highway,
            }
        })
        .collect()
}
