use formats::route::RouteKind;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LayerStyle {
    pub visible: bool,
    pub color: [f32; 4],
    /// Stroke width in CSS pixels.
    pub width: f32,
}

impl LayerStyle {
    pub const fn new(visible: bool, color: [f32; 4], width: f32) -> Self {
        Self {
            visible,
            color,
            width,
        }
    }

    /// `#rrggbb`, alpha dropped.
    pub fn css_color(&self) -> String {
        let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02x}{:02x}{:02x}",
            c(self.color[0]),
            c(self.color[1]),
            c(self.color[2])
        )
    }

    pub fn opacity(&self) -> f32 {
        self.color[3]
    }
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            visible: true,
            color: [1.0, 1.0, 1.0, 1.0],
            width: 1.0,
        }
    }
}

const MAIN_ROUTE: [f32; 4] = [0.0, 0.4, 1.0, 1.0];
const ALTERNATE_ROUTE: [f32; 4] = [0.45, 0.55, 0.7, 0.9];
const OUTLINE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
const HIGHLIGHT: [f32; 4] = [1.0, 0.53, 0.0, 1.0];

const ROUTE_WIDTH: f32 = 5.0;
const OUTLINE_EXTRA: f32 = 4.0;

pub fn route_line_style(kind: RouteKind) -> LayerStyle {
    let color = if kind.is_main() {
        MAIN_ROUTE
    } else {
        ALTERNATE_ROUTE
    };
    LayerStyle::new(true, color, ROUTE_WIDTH)
}

/// The wider halo drawn under every route line.
pub fn route_outline_style() -> LayerStyle {
    LayerStyle::new(true, OUTLINE, ROUTE_WIDTH + OUTLINE_EXTRA)
}

pub fn highlight_style() -> LayerStyle {
    LayerStyle::new(true, HIGHLIGHT, ROUTE_WIDTH + 1.0)
}
