//! Which computed results are drawn.

use std::collections::BTreeMap;

use formats::route::{RouteKind, RouteSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShowError {
    /// The route is not part of the current result set.
    UnknownRoute(RouteKind),
    /// There is no isochrone result to toggle.
    NoIsochrone,
}

impl std::fmt::Display for ShowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShowError::UnknownRoute(kind) => write!(f, "{kind} is not in the current result"),
            ShowError::NoIsochrone => write!(f, "no isochrone result"),
        }
    }
}

impl std::error::Error for ShowError {}

/// Visibility of each route of the current result set.
///
/// Keys are exactly the routes of the current result: a new result replaces
/// the whole map, so no entry can outlive the route it refers to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowState {
    routes: BTreeMap<RouteKind, bool>,
}

impl ShowState {
    pub fn for_routes(set: &RouteSet) -> Self {
        Self {
            routes: set.kinds().map(|k| (k, true)).collect(),
        }
    }

    pub fn clear(&mut self) {
        self.routes.clear();
    }

    pub fn is_shown(&self, kind: RouteKind) -> bool {
        self.routes.get(&kind).copied().unwrap_or(false)
    }

    pub fn set(&mut self, kind: RouteKind, shown: bool) -> Result<(), ShowError> {
        match self.routes.get_mut(&kind) {
            Some(v) => {
                *v = shown;
                Ok(())
            }
            None => Err(ShowError::UnknownRoute(kind)),
        }
    }

    /// Flips one route and returns its new visibility.
    pub fn toggle(&mut self, kind: RouteKind) -> Result<bool, ShowError> {
        let v = self
            .routes
            .get_mut(&kind)
            .ok_or(ShowError::UnknownRoute(kind))?;
        *v = !*v;
        Ok(*v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RouteKind, bool)> + '_ {
        self.routes.iter().map(|(k, v)| (*k, *v))
    }
}

/// Visibility of the isochrone result. `None` while there is no result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IsoShowState(Option<bool>);

impl IsoShowState {
    pub fn reset(&mut self, has_result: bool) {
        self.0 = has_result.then_some(true);
    }

    pub fn is_shown(self) -> bool {
        self.0.unwrap_or(false)
    }

    pub fn toggle(&mut self) -> Result<bool, ShowError> {
        let v = self.0.as_mut().ok_or(ShowError::NoIsochrone)?;
        *v = !*v;
        Ok(*v)
    }
}

#[cfg(test)]
mod tests {
    use super::{IsoShowState, ShowError, ShowState};
    use formats::route::RouteKind;

    fn two_routes() -> ShowState {
        let mut s = ShowState::default();
        s.routes.insert(RouteKind::Main, true);
        s.routes.insert(RouteKind::Alternate(0), true);
        s
    }

    #[test]
    fn toggle_twice_restores() {
        let mut s = two_routes();
        let before = s.clone();
        assert_eq!(s.toggle(RouteKind::Alternate(0)), Ok(false));
        assert_eq!(s.toggle(RouteKind::Alternate(0)), Ok(true));
        assert_eq!(s, before);
    }

    #[test]
    fn stale_indices_are_rejected() {
        let mut s = two_routes();
        assert_eq!(
            s.toggle(RouteKind::Alternate(4)),
            Err(ShowError::UnknownRoute(RouteKind::Alternate(4)))
        );
        assert!(!s.is_shown(RouteKind::Alternate(4)));
    }

    #[test]
    fn iso_toggle_needs_result() {
        let mut s = IsoShowState::default();
        assert_eq!(s.toggle(), Err(ShowError::NoIsochrone));
        s.reset(true);
        assert!(s.is_shown());
        assert_eq!(s.toggle(), Ok(false));
        s.reset(false);
        assert!(!s.is_shown());
    }
}
