//! Hovered maneuver span on a route.

use formats::route::{RouteKind, RouteSet};

/// A stretch of one route to emphasise, in absolute geometry indices
/// (both ends inclusive).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HighlightSegment {
    pub start_index: usize,
    pub end_index: usize,
    pub route: RouteKind,
}

impl HighlightSegment {
    pub fn new(route: RouteKind, start_index: usize, end_index: usize) -> Self {
        Self {
            start_index,
            end_index,
            route,
        }
    }

    /// From the JS-side triple, where `-1` indices mean "nothing" and an
    /// `alternate` of `-1` means the main route.
    pub fn from_raw(start_index: i32, end_index: i32, alternate: i32) -> Option<Self> {
        if start_index < 0 || end_index < 0 {
            return None;
        }
        let route = RouteKind::from_raw(alternate)?;
        Some(Self::new(route, start_index as usize, end_index as usize))
    }

    /// True when the route exists and both indices fall inside its geometry.
    pub fn resolves_in(&self, set: &RouteSet) -> bool {
        set.get(self.route).is_some_and(|r| {
            self.start_index <= self.end_index && self.end_index < r.decoded_geometry.len()
        })
    }
}
