//! Camera fitting around result geometry.

use foundation::bounds::GeoBounds;
use foundation::coords::LatLng;
use foundation::screen::Padding;

pub const SINGLE_POINT_MAX_ZOOM: u8 = 11;
pub const DEFAULT_MAX_ZOOM: u8 = 18;
pub const MOBILE_BREAKPOINT_PX: f64 = 550.0;

const BASE_PADDING: f64 = 50.0;
const MOBILE_PADDING: f64 = 10.0;
const PANEL_TOP_EXTRA: f64 = 50.0;

/// What is covering the map when fitting.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PanelLayout {
    pub viewport_width: f64,
    pub panel_open: bool,
    /// Width of the side panel when open, in CSS pixels.
    pub panel_width: f64,
    pub mobile_breakpoint: f64,
}

impl PanelLayout {
    pub fn new(viewport_width: f64, panel_open: bool) -> Self {
        Self {
            viewport_width,
            panel_open,
            panel_width: 420.0,
            mobile_breakpoint: MOBILE_BREAKPOINT_PX,
        }
    }

    pub fn is_mobile(&self) -> bool {
        self.viewport_width < self.mobile_breakpoint
    }

    pub fn padding(&self) -> Padding {
        if self.is_mobile() {
            return Padding::uniform(MOBILE_PADDING);
        }
        let mut p = Padding::uniform(BASE_PADDING);
        if self.panel_open {
            p.left += self.panel_width;
            p.top += PANEL_TOP_EXTRA;
        }
        p
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FitResult {
    pub bounds: GeoBounds,
    pub max_zoom: u8,
    pub padding: Padding,
}

/// Folds every coordinate of every set into one box. `None` when there is
/// nothing to fit.
pub fn fit_bounds(sets: &[Vec<LatLng>], layout: PanelLayout) -> Option<FitResult> {
    let points = sets.iter().flatten().copied().filter(|p| p.is_valid());
    let count = points.clone().count();
    let bounds = GeoBounds::from_points(points)?;
    let max_zoom = if count == 1 {
        SINGLE_POINT_MAX_ZOOM
    } else {
        DEFAULT_MAX_ZOOM
    };
    Some(FitResult {
        bounds,
        max_zoom,
        padding: layout.padding(),
    })
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_MAX_ZOOM, PanelLayout, SINGLE_POINT_MAX_ZOOM, fit_bounds};
    use foundation::coords::LatLng;
    use foundation::screen::Padding;

    #[test]
    fn single_point_zooms_less() {
        let fit = fit_bounds(&[vec![LatLng::new(52.5, 13.4)]], PanelLayout::new(1200.0, false))
            .unwrap();
        assert_eq!(fit.max_zoom, SINGLE_POINT_MAX_ZOOM);
        assert!(fit.bounds.is_point());
    }

    #[test]
    fn folds_across_sets() {
        let fit = fit_bounds(
            &[
                vec![LatLng::new(1.0, 5.0), LatLng::new(-2.0, 7.0)],
                vec![],
                vec![LatLng::new(3.0, -1.0)],
            ],
            PanelLayout::new(1200.0, false),
        )
        .unwrap();
        assert_eq!(fit.max_zoom, DEFAULT_MAX_ZOOM);
        assert_eq!(fit.bounds.south_west, LatLng::new(-2.0, -1.0));
        assert_eq!(fit.bounds.north_east, LatLng::new(3.0, 7.0));
    }

    #[test]
    fn nothing_to_fit() {
        assert!(fit_bounds(&[], PanelLayout::new(1200.0, true)).is_none());
        assert!(fit_bounds(&[vec![]], PanelLayout::new(1200.0, true)).is_none());
    }

    #[test]
    fn open_panel_pads_left_and_top() {
        let closed = PanelLayout::new(1200.0, false).padding();
        let open = PanelLayout::new(1200.0, true).padding();
        assert_eq!(closed, Padding::uniform(50.0));
        assert!(open.left > closed.left);
        assert!(open.top > closed.top);
        assert_eq!(open.right, closed.right);
        assert_eq!(open.bottom, closed.bottom);
    }

    #[test]
    fn mobile_ignores_panel() {
        assert_eq!(
            PanelLayout::new(400.0, true).padding(),
            PanelLayout::new(400.0, false).padding()
        );
        assert_eq!(PanelLayout::new(549.0, true).padding(), Padding::uniform(10.0));
        assert!(!PanelLayout::new(550.0, true).is_mobile());
    }
}
