//! Named actions: the only way the stores change.
//!
//! Applying an action mutates the state and returns follow-ups (fetches,
//! reverse geocodes) for the caller to carry out. Nothing here touches the
//! network.

use foundation::coords::LatLng;
use formats::api::GeocodeResult;
use formats::geojson::Feature;
use formats::isochrone::IsochroneOutcome;
use formats::permalink::PermalinkParams;
use formats::profile::Profile;
use formats::route::{RouteKind, RouteOutcome};
use serde_json::Value;
use streaming::protocol::DateTime;
use tracing::debug;

use crate::highlight::HighlightSegment;
use crate::show::ShowError;
use crate::state::{AppState, GeocodeTarget, Tab};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // Context menu, directions tab.
    DirectionsFrom(LatLng),
    AddVia(LatLng),
    DirectionsTo(LatLng),
    // Context menu, isochrones tab.
    SetIsoCenter(LatLng),

    MarkerDragEnd { target: GeocodeTarget, position: LatLng },
    ReorderWaypoints { from: usize, to: usize },
    AddWaypoint,
    RemoveWaypoint(usize),
    ClearWaypoints,

    SetUserInput { target: GeocodeTarget, text: String },
    /// Reverse-geocode answer for a slot: replaces its candidates.
    ApplyReverseGeocode { target: GeocodeTarget, results: Vec<GeocodeResult> },
    /// Search-as-you-type answer: candidates, none selected.
    ApplySearchResults { target: GeocodeTarget, results: Vec<GeocodeResult> },
    SelectGeocodeResult { target: GeocodeTarget, address_index: usize },

    SetRouteOutcome(RouteOutcome),
    SetIsochroneOutcome(IsochroneOutcome),
    ToggleRoute(RouteKind),
    ToggleIsochrone,
    SetHighlight(Option<HighlightSegment>),
    SetTab(Tab),

    SetProfile(Profile),
    SetCostingOption { key: String, value: Value },
    SetAlternates(u32),
    SetLanguage(Option<String>),
    SetDateTime(Option<DateTime>),
    /// Full feature set of the drawing tool after any edit.
    SyncExclusions(Vec<Feature>),
    SetIsoRange(u32),
    SetIsoInterval(u32),
    SetIsoDenoise(f64),
    SetIsoGeneralize(f64),

    ApplyPermalink(PermalinkParams),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FetchTarget {
    Directions,
    Isochrones,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Followup {
    /// Re-request a result. Slider-driven changes are `debounced`; discrete
    /// edits (drag end, reorder, context menu) are not.
    Fetch { target: FetchTarget, debounced: bool },
    ReverseGeocode { target: GeocodeTarget, position: LatLng },
    Search { target: GeocodeTarget, query: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionError {
    Show(ShowError),
    NoSuchWaypoint(usize),
    UnknownGeocodeTarget(GeocodeTarget),
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionError::Show(e) => write!(f, "{e}"),
            ActionError::NoSuchWaypoint(i) => write!(f, "no waypoint at index {i}"),
            ActionError::UnknownGeocodeTarget(t) => write!(f, "unknown geocode target {t:?}"),
        }
    }
}

impl std::error::Error for ActionError {}

impl From<ShowError> for ActionError {
    fn from(e: ShowError) -> Self {
        ActionError::Show(e)
    }
}

const fn fetch(target: FetchTarget, debounced: bool) -> Followup {
    Followup::Fetch { target, debounced }
}

impl AppState {
    pub fn apply(&mut self, action: Action) -> Result<Vec<Followup>, ActionError> {
        debug!(?action, "apply");
        let out = match action {
            Action::DirectionsFrom(p) => self.place_waypoint(0, p)?,
            Action::AddVia(p) => {
                let index = self.waypoints.insert_via();
                self.place_waypoint(index, p)?
            }
            Action::DirectionsTo(p) => {
                let last = self.waypoints.last_index();
                self.place_waypoint(last, p)?
            }
            Action::SetIsoCenter(p) => {
                self.iso_center.place_at(p);
                vec![
                    Followup::ReverseGeocode {
                        target: GeocodeTarget::IsoCenter,
                        position: p,
                    },
                    fetch(FetchTarget::Isochrones, false),
                ]
            }

            Action::MarkerDragEnd { target, position } => {
                self.slot_mut(target)?.place_at(position);
                let mut out = vec![Followup::ReverseGeocode { target, position }];
                out.extend(self.refetch_for(target));
                out
            }
            Action::ReorderWaypoints { from, to } => {
                if !self.waypoints.reorder(from, to) {
                    return Err(ActionError::NoSuchWaypoint(from.max(to)));
                }
                self.refetch_directions(false)
            }
            Action::AddWaypoint => {
                self.waypoints.insert_via();
                Vec::new()
            }
            Action::RemoveWaypoint(index) => {
                if !self.waypoints.remove(index) {
                    return Err(ActionError::NoSuchWaypoint(index));
                }
                self.refetch_directions(false)
            }
            Action::ClearWaypoints => {
                self.waypoints.reset();
                self.directions.replace(None);
                self.highlight = None;
                Vec::new()
            }

            Action::SetUserInput { target, text } => {
                let slot = self.slot_mut(target)?;
                slot.user_input = text.clone();
                if text.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![Followup::Search {
                        target,
                        query: text,
                    }]
                }
            }
            Action::ApplyReverseGeocode { target, results } => {
                self.slot_mut(target)?.set_results(results);
                Vec::new()
            }
            Action::ApplySearchResults { target, results } => {
                let slot = self.slot_mut(target)?;
                let user_input = slot.user_input.clone();
                slot.set_results(results);
                slot.user_input = user_input;
                Vec::new()
            }
            Action::SelectGeocodeResult {
                target,
                address_index,
            } => {
                if !self.slot_mut(target)?.select(address_index) {
                    return Ok(Vec::new());
                }
                self.refetch_for(target)
            }

            Action::SetRouteOutcome(outcome) => {
                self.directions.replace(Some(outcome));
                self.highlight = None;
                Vec::new()
            }
            Action::SetIsochroneOutcome(outcome) => {
                self.isochrones.replace(Some(outcome));
                Vec::new()
            }
            Action::ToggleRoute(kind) => {
                self.directions.show.toggle(kind)?;
                Vec::new()
            }
            Action::ToggleIsochrone => {
                self.isochrones.show.toggle()?;
                Vec::new()
            }
            Action::SetHighlight(h) => {
                self.highlight = h;
                Vec::new()
            }
            Action::SetTab(tab) => {
                self.tab = tab;
                self.highlight = None;
                Vec::new()
            }

            Action::SetProfile(profile) => {
                self.directions_settings.profile = profile;
                self.iso_settings.profile = profile;
                match self.tab {
                    Tab::Directions => self.refetch_directions(false),
                    Tab::Isochrones => self.refetch_isochrones(false),
                }
            }
            Action::SetCostingOption { key, value } => {
                self.directions_settings.set_costing_option(&key, value);
                self.refetch_directions(true)
            }
            Action::SetAlternates(n) => {
                self.directions_settings.alternates = n;
                self.refetch_directions(true)
            }
            Action::SetLanguage(lang) => {
                self.directions_settings.language = lang;
                self.refetch_directions(false)
            }
            Action::SetDateTime(dt) => {
                self.directions_settings.date_time = dt;
                self.refetch_directions(true)
            }
            Action::SyncExclusions(features) => {
                if self.directions_settings.sync_exclusions(&features) {
                    self.refetch_directions(false)
                } else {
                    Vec::new()
                }
            }
            Action::SetIsoRange(v) => {
                self.iso_settings.set_max_range(v);
                self.refetch_isochrones(true)
            }
            Action::SetIsoInterval(v) => {
                self.iso_settings.set_interval(v);
                self.refetch_isochrones(true)
            }
            Action::SetIsoDenoise(v) => {
                self.iso_settings.denoise = v.clamp(0.0, 1.0);
                self.refetch_isochrones(true)
            }
            Action::SetIsoGeneralize(v) => {
                self.iso_settings.generalize = v.max(0.0);
                self.refetch_isochrones(true)
            }

            Action::ApplyPermalink(params) => self.apply_permalink(params),
        };
        Ok(out)
    }

    fn slot_mut(
        &mut self,
        target: GeocodeTarget,
    ) -> Result<&mut crate::waypoints::Waypoint, ActionError> {
        self.geocode_slot_mut(target)
            .ok_or(ActionError::UnknownGeocodeTarget(target))
    }

    fn place_waypoint(&mut self, index: usize, p: LatLng) -> Result<Vec<Followup>, ActionError> {
        let slot = self
            .waypoints
            .get_mut(index)
            .ok_or(ActionError::NoSuchWaypoint(index))?;
        slot.place_at(p);
        let target = GeocodeTarget::Waypoint(slot.id);
        let mut out = vec![Followup::ReverseGeocode {
            target,
            position: p,
        }];
        out.extend(self.refetch_directions(false));
        Ok(out)
    }

    fn refetch_for(&mut self, target: GeocodeTarget) -> Vec<Followup> {
        match target {
            GeocodeTarget::IsoCenter => self.refetch_isochrones(false),
            GeocodeTarget::Waypoint(_) => self.refetch_directions(false),
        }
    }

    fn refetch_directions(&mut self, debounced: bool) -> Vec<Followup> {
        if self.waypoints.is_routable() {
            vec![fetch(FetchTarget::Directions, debounced)]
        } else {
            if self.directions.outcome.is_some() {
                self.directions.replace(None);
                self.highlight = None;
            }
            Vec::new()
        }
    }

    fn refetch_isochrones(&mut self, debounced: bool) -> Vec<Followup> {
        if self.iso_center_position().is_some() {
            vec![fetch(FetchTarget::Isochrones, debounced)]
        } else {
            Vec::new()
        }
    }

    fn apply_permalink(&mut self, params: PermalinkParams) -> Vec<Followup> {
        if let Some(profile) = params.profile {
            self.directions_settings.profile = profile;
            self.iso_settings.profile = profile;
        }
        if let Some(range) = params.range {
            self.iso_settings.set_max_range(range);
        }
        if let Some(interval) = params.interval {
            self.iso_settings.set_interval(interval);
        }
        if let Some(d) = params.denoise {
            self.iso_settings.denoise = d.clamp(0.0, 1.0);
        }
        if let Some(g) = params.generalize {
            self.iso_settings.generalize = g.max(0.0);
        }

        match self.tab {
            Tab::Isochrones => match params.waypoints.first() {
                Some(&center) => {
                    self.iso_center.place_at(center);
                    vec![
                        Followup::ReverseGeocode {
                            target: GeocodeTarget::IsoCenter,
                            position: center,
                        },
                        fetch(FetchTarget::Isochrones, false),
                    ]
                }
                None => Vec::new(),
            },
            Tab::Directions => {
                if params.waypoints.is_empty() {
                    return Vec::new();
                }
                self.waypoints.reset();
                while self.waypoints.len() < params.waypoints.len() {
                    self.waypoints.push();
                }
                let mut out = Vec::new();
                for (index, &p) in params.waypoints.iter().enumerate() {
                    if let Some(slot) = self.waypoints.get_mut(index) {
                        slot.place_at(p);
                        out.push(Followup::ReverseGeocode {
                            target: GeocodeTarget::Waypoint(slot.id),
                            position: p,
                        });
                    }
                }
                out.extend(self.refetch_directions(false));
                out
            }
        }
    }

    /// Permalink parameters describing the current state.
    pub fn permalink(&self, style: Option<String>) -> PermalinkParams {
        let (profile, waypoints) = match self.tab {
            Tab::Directions => (self.directions_settings.profile, self.waypoints.positions()),
            Tab::Isochrones => (
                self.iso_settings.profile,
                self.iso_center_position().into_iter().collect(),
            ),
        };
        let iso = self.tab == Tab::Isochrones;
        PermalinkParams {
            profile: Some(profile),
            waypoints,
            range: iso.then(|| self.iso_settings.max_range()),
            interval: iso.then(|| self.iso_settings.interval()),
            denoise: iso.then_some(self.iso_settings.denoise),
            generalize: iso.then_some(self.iso_settings.generalize),
            style,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Action, ActionError, FetchTarget, Followup};
    use crate::show::ShowError;
    use crate::state::{AppState, GeocodeTarget, Tab};
    use foundation::coords::LatLng;
    use formats::permalink::PermalinkParams;
    use formats::route::{RouteKind, RouteOutcome};

    fn a() -> LatLng {
        LatLng::new(52.5, 13.4)
    }

    fn b() -> LatLng {
        LatLng::new(52.6, 13.5)
    }

    fn has_fetch(out: &[Followup], target: FetchTarget, debounced: bool) -> bool {
        out.contains(&Followup::Fetch { target, debounced })
    }

    #[test]
    fn directions_from_and_to_fill_ends() {
        let mut s = AppState::new();
        let out = s.apply(Action::DirectionsFrom(a())).unwrap();
        assert!(matches!(out[0], Followup::ReverseGeocode { .. }));
        assert!(!has_fetch(&out, FetchTarget::Directions, false));

        let out = s.apply(Action::DirectionsTo(b())).unwrap();
        assert!(has_fetch(&out, FetchTarget::Directions, false));
        assert_eq!(s.waypoints.positions(), vec![a(), b()]);
    }

    #[test]
    fn via_point_lands_before_destination() {
        let mut s = AppState::new();
        s.apply(Action::DirectionsFrom(a())).unwrap();
        s.apply(Action::DirectionsTo(b())).unwrap();
        let via = LatLng::new(52.55, 13.45);
        s.apply(Action::AddVia(via)).unwrap();
        assert_eq!(s.waypoints.positions(), vec![a(), via, b()]);
    }

    #[test]
    fn slider_changes_are_debounced() {
        let mut s = AppState::new();
        s.apply(Action::SetIsoCenter(a())).unwrap();
        let out = s.apply(Action::SetIsoRange(30)).unwrap();
        assert_eq!(
            out,
            vec![Followup::Fetch {
                target: FetchTarget::Isochrones,
                debounced: true
            }]
        );
    }

    #[test]
    fn drag_end_and_reorder_fetch_immediately() {
        let mut s = AppState::new();
        s.apply(Action::DirectionsFrom(a())).unwrap();
        s.apply(Action::DirectionsTo(b())).unwrap();
        let id = s.waypoints.get(0).unwrap().id;
        let out = s
            .apply(Action::MarkerDragEnd {
                target: GeocodeTarget::Waypoint(id),
                position: LatLng::new(52.4, 13.3),
            })
            .unwrap();
        assert!(has_fetch(&out, FetchTarget::Directions, false));

        let out = s.apply(Action::ReorderWaypoints { from: 0, to: 1 }).unwrap();
        assert!(has_fetch(&out, FetchTarget::Directions, false));
        assert_eq!(s.waypoints.positions()[1], LatLng::new(52.4, 13.3));
    }

    #[test]
    fn new_result_clears_highlight() {
        let mut s = AppState::new();
        s.highlight = crate::highlight::HighlightSegment::from_raw(0, 1, -1);
        s.apply(Action::SetRouteOutcome(RouteOutcome::NoRoute {
            reason: "x".to_string(),
        }))
        .unwrap();
        assert_eq!(s.highlight, None);
    }

    #[test]
    fn toggling_unknown_route_fails() {
        let mut s = AppState::new();
        assert_eq!(
            s.apply(Action::ToggleRoute(RouteKind::Alternate(1))),
            Err(ActionError::Show(ShowError::UnknownRoute(RouteKind::Alternate(1))))
        );
    }

    #[test]
    fn removing_a_point_below_two_clears_result() {
        let mut s = AppState::new();
        s.apply(Action::DirectionsFrom(a())).unwrap();
        s.apply(Action::DirectionsTo(b())).unwrap();
        s.apply(Action::SetRouteOutcome(RouteOutcome::NoRoute {
            reason: "x".to_string(),
        }))
        .unwrap();
        let out = s.apply(Action::RemoveWaypoint(1)).unwrap();
        assert!(out.is_empty());
        assert!(s.directions.outcome.is_none());
    }

    #[test]
    fn permalink_round_trips_directions() {
        let mut s = AppState::new();
        let params = PermalinkParams {
            waypoints: vec![a(), LatLng::new(52.55, 13.45), b()],
            ..PermalinkParams::default()
        };
        let out = s.apply(Action::ApplyPermalink(params)).unwrap();
        assert_eq!(
            out.iter()
                .filter(|f| matches!(f, Followup::ReverseGeocode { .. }))
                .count(),
            3
        );
        let back = s.permalink(None);
        assert_eq!(back.waypoints, vec![a(), LatLng::new(52.55, 13.45), b()]);
    }

    #[test]
    fn permalink_sets_iso_center_on_isochrone_tab() {
        let mut s = AppState::new();
        s.apply(Action::SetTab(Tab::Isochrones)).unwrap();
        let params = PermalinkParams {
            waypoints: vec![a()],
            range: Some(20),
            interval: Some(25),
            ..PermalinkParams::default()
        };
        s.apply(Action::ApplyPermalink(params)).unwrap();
        assert_eq!(s.iso_center_position(), Some(a()));
        assert_eq!(s.iso_settings.interval(), 20);
        let back = s.permalink(Some("dark".to_string()));
        assert_eq!(back.range, Some(20));
        assert_eq!(back.style.as_deref(), Some("dark"));
    }

    #[test]
    fn search_keeps_typed_text() {
        let mut s = AppState::new();
        let id = s.waypoints.get(0).unwrap().id;
        let target = GeocodeTarget::Waypoint(id);
        let out = s
            .apply(Action::SetUserInput {
                target,
                text: "Berl".to_string(),
            })
            .unwrap();
        assert_eq!(
            out,
            vec![Followup::Search {
                target,
                query: "Berl".to_string()
            }]
        );
        s.apply(Action::ApplySearchResults {
            target,
            results: Vec::new(),
        })
        .unwrap();
        assert_eq!(s.waypoints.get(0).unwrap().user_input, "Berl");
    }
}
