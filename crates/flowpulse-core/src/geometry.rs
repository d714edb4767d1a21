//! Planar geometry in overlay coordinates

use serde::{Deserialize, Serialize};

/// A point in overlay space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Translate by a vector
    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// An axis-aligned rectangle, origin at the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Same size, shifted by a vector
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Linear interpolation between two points at fraction `t`
pub fn lerp(a: Point, b: Point, t: f64) -> Point {
    Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}

/// Shift `p` by `k` along the left-hand normal of the direction `(dx, dy)`
///
/// The normal is `(-dy, dx) / len`; a zero-length direction uses `len = 1`
/// so the result stays finite.
pub fn lane_offset(p: Point, dx: f64, dy: f64, k: f64) -> Point {
    let len = dx.hypot(dy);
    let len = if len == 0.0 { 1.0 } else { len };
    Point::new(p.x + (-dy / len) * k, p.y + (dx / len) * k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_center() {
        let rect = Rect::new(10.0, 20.0, 100.0, 40.0);
        assert_eq!(rect.center(), Point::new(60.0, 40.0));
    }

    #[test]
    fn test_lerp() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(100.0, 0.0);
        assert_eq!(lerp(a, b, 0.5), Point::new(50.0, 0.0));
        assert_eq!(lerp(a, b, 0.0), a);
        assert_eq!(lerp(a, b, 1.0), b);
    }

    #[test]
    fn test_lane_offset_opposite_signs_diverge() {
        let p = Point::new(50.0, 0.0);
        let left = lane_offset(p, 100.0, 0.0, 6.0);
        let right = lane_offset(p, 100.0, 0.0, -6.0);
        assert_eq!(left, Point::new(50.0, 6.0));
        assert_eq!(right, Point::new(50.0, -6.0));
    }

    #[test]
    fn test_lane_offset_zero_length() {
        let p = Point::new(1.0, 1.0);
        let q = lane_offset(p, 0.0, 0.0, 6.0);
        assert!(q.is_finite());
        assert_eq!(q, p);
    }
}
