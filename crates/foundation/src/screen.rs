/// A position in CSS pixels, relative to the map container.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Self) -> f64 {
        let d = self - other;
        (d.x * d.x + d.y * d.y).sqrt()
    }
}

impl std::ops::Add for ScreenPoint {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for ScreenPoint {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

/// Pixel padding applied around a fitted viewport.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Padding {
    pub fn uniform(px: f64) -> Self {
        Self {
            top: px,
            right: px,
            bottom: px,
            left: px,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ScreenPoint;

    #[test]
    fn add_sub_distance() {
        let a = ScreenPoint::new(100.0, 100.0);
        let b = ScreenPoint::new(105.0, 103.0);
        assert_eq!(b - a, ScreenPoint::new(5.0, 3.0));
        assert_eq!(a + ScreenPoint::new(1.0, 1.0), ScreenPoint::new(101.0, 101.0));
        let d = a.distance(b);
        assert!((d - 34f64.sqrt()).abs() < 1e-12);
    }
}
