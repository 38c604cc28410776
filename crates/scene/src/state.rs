//! The injected application state.
//!
//! One value owns every store the map reads from. Stores are replaced
//! wholesale; `identity` changes on every replacement and is what derived
//! data keys its caches on.

use foundation::coords::LatLng;
use formats::isochrone::{IsochroneOutcome, IsochroneResult};
use formats::route::{RouteOutcome, RouteSet};
use streaming::protocol::{IsochroneRequest, RouteRequest};

use crate::highlight::HighlightSegment;
use crate::settings::{DirectionsSettings, IsochroneSettings};
use crate::show::{IsoShowState, ShowState};
use crate::waypoints::{Waypoint, WaypointId, Waypoints};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Directions,
    Isochrones,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectionsStore {
    pub outcome: Option<RouteOutcome>,
    pub identity: u64,
    pub show: ShowState,
}

impl DirectionsStore {
    pub fn route_set(&self) -> Option<&RouteSet> {
        self.outcome.as_ref().and_then(RouteOutcome::route_set)
    }

    pub fn replace(&mut self, outcome: Option<RouteOutcome>) {
        self.show = match outcome.as_ref().and_then(RouteOutcome::route_set) {
            Some(set) => ShowState::for_routes(set),
            None => ShowState::default(),
        };
        self.outcome = outcome;
        self.identity = self.identity.wrapping_add(1);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IsochroneStore {
    pub outcome: Option<IsochroneOutcome>,
    pub identity: u64,
    pub show: IsoShowState,
}

impl IsochroneStore {
    pub fn result(&self) -> Option<&IsochroneResult> {
        self.outcome.as_ref().and_then(IsochroneOutcome::result)
    }

    pub fn replace(&mut self, outcome: Option<IsochroneOutcome>) {
        self.show
            .reset(outcome.as_ref().and_then(IsochroneOutcome::result).is_some());
        self.outcome = outcome;
        self.identity = self.identity.wrapping_add(1);
    }
}

/// Whose geocode results a response belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GeocodeTarget {
    Waypoint(WaypointId),
    IsoCenter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub tab: Tab,
    pub waypoints: Waypoints,
    pub iso_center: Waypoint,
    pub directions: DirectionsStore,
    pub isochrones: IsochroneStore,
    pub highlight: Option<HighlightSegment>,
    pub directions_settings: DirectionsSettings,
    pub iso_settings: IsochroneSettings,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            tab: Tab::default(),
            waypoints: Waypoints::new(),
            iso_center: Waypoint::new(WaypointId(u64::MAX)),
            directions: DirectionsStore::default(),
            isochrones: IsochroneStore::default(),
            highlight: None,
            directions_settings: DirectionsSettings::default(),
            iso_settings: IsochroneSettings::default(),
        }
    }

    pub fn geocode_slot(&self, target: GeocodeTarget) -> Option<&Waypoint> {
        match target {
            GeocodeTarget::IsoCenter => Some(&self.iso_center),
            GeocodeTarget::Waypoint(id) => self.waypoints.index_of(id).and_then(|i| self.waypoints.get(i)),
        }
    }

    pub fn geocode_slot_mut(&mut self, target: GeocodeTarget) -> Option<&mut Waypoint> {
        match target {
            GeocodeTarget::IsoCenter => Some(&mut self.iso_center),
            GeocodeTarget::Waypoint(id) => {
                let index = self.waypoints.index_of(id)?;
                self.waypoints.get_mut(index)
            }
        }
    }

    pub fn iso_center_position(&self) -> Option<LatLng> {
        self.iso_center.position()
    }

    /// Body for `/route`, or `None` while fewer than two waypoints are set.
    pub fn route_request(&self) -> Option<RouteRequest> {
        if !self.waypoints.is_routable() {
            return None;
        }
        let s = &self.directions_settings;
        let mut req = RouteRequest::new(s.profile, &self.waypoints.positions());
        req.costing_options = s.costing_options_value();
        req.alternates = s.alternates;
        req.language = s.language.clone();
        req.date_time = s.date_time.clone();
        req.exclude_polygons = s.exclude_polygons_wire();
        Some(req)
    }

    /// Body for `/isochrone`, or `None` without a centre.
    pub fn isochrone_request(&self) -> Option<IsochroneRequest> {
        let center = self.iso_center_position()?;
        let s = &self.iso_settings;
        let mut req = IsochroneRequest::new(s.profile, center, s.contours());
        req.denoise = s.denoise;
        req.generalize = s.generalize;
        Some(req)
    }
}

#[cfg(test)]
mod tests {
    use super::{AppState, DirectionsStore, GeocodeTarget};
    use foundation::coords::LatLng;
    use formats::route::RouteOutcome;

    #[test]
    fn replacing_bumps_identity_and_resets_show() {
        let mut store = DirectionsStore::default();
        let before = store.identity;
        store.replace(Some(RouteOutcome::NoRoute {
            reason: "none".to_string(),
        }));
        assert_ne!(store.identity, before);
        assert!(store.route_set().is_none());
        assert_eq!(store.show.iter().count(), 0);
    }

    #[test]
    fn route_request_needs_two_positions() {
        let mut s = AppState::new();
        assert!(s.route_request().is_none());
        s.waypoints.get_mut(0).unwrap().place_at(LatLng::new(1.0, 1.0));
        s.waypoints.get_mut(1).unwrap().place_at(LatLng::new(2.0, 2.0));
        let req = s.route_request().unwrap();
        assert_eq!(req.locations.len(), 2);
        assert_eq!(req.locations[1].lon, 2.0);
    }

    #[test]
    fn geocode_targets_follow_reorder() {
        let mut s = AppState::new();
        let id = s.waypoints.get(0).unwrap().id;
        s.waypoints.reorder(0, 1);
        s.geocode_slot_mut(GeocodeTarget::Waypoint(id))
            .unwrap()
            .place_at(LatLng::new(5.0, 5.0));
        assert_eq!(
            s.waypoints.get(1).unwrap().position(),
            Some(LatLng::new(5.0, 5.0))
        );
        assert!(s.geocode_slot(GeocodeTarget::IsoCenter).is_some());
    }

    #[test]
    fn isochrone_request_uses_settings() {
        let mut s = AppState::new();
        assert!(s.isochrone_request().is_none());
        s.iso_center.place_at(LatLng::new(1.0, 2.0));
        s.iso_settings.set_max_range(30);
        s.iso_settings.set_interval(10);
        let req = s.isochrone_request().unwrap();
        assert_eq!(req.contours.len(), 3);
        assert_eq!(req.locations[0].lat, 1.0);
    }
}
