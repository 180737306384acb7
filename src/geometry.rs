//! Rectangles and points. Everything in this crate's layout math goes
//! through this module rather than a platform-specific rect type, so the
//! layout engine and its tests never need macOS headers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self { Point { x, y } }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const ZERO: Rect = Rect { x: 0.0, y: 0.0, width: 0.0, height: 0.0 };

    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect { x, y, width, height }
    }

    pub fn max_x(&self) -> f64 { self.x + self.width }

    pub fn max_y(&self) -> f64 { self.y + self.height }

    pub fn mid(&self) -> Point { Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0) }

    pub fn area(&self) -> f64 { self.width.max(0.0) * self.height.max(0.0) }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.max_x() && p.y >= self.y && p.y < self.max_y()
    }

    /// Returns the overlapping rectangle, or a zero-area rect at the origin
    /// of this rect if there is no overlap.
    pub fn intersection(&self, other: &Rect) -> Rect {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.max_x().min(other.max_x());
        let y1 = self.max_y().min(other.max_y());
        if x1 <= x0 || y1 <= y0 {
            Rect::new(x0, y0, 0.0, 0.0)
        } else {
            Rect::new(x0, y0, x1 - x0, y1 - y0)
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool { self.intersection(other).area() > 0.0 }

    /// Deflates the rect by `amount` on each side, clamping to zero size.
    pub fn deflate(&self, amount: f64) -> Rect {
        let w = (self.width - amount * 2.0).max(0.0);
        let h = (self.height - amount * 2.0).max(0.0);
        Rect::new(self.x + (self.width - w) / 2.0, self.y + (self.height - h) / 2.0, w, h)
    }

    /// Deflates only the given sides (top, bottom, left, right), used for
    /// per-display padding.
    pub fn deflate_sides(&self, top: f64, bottom: f64, left: f64, right: f64) -> Rect {
        Rect::new(
            self.x + left,
            self.y + top,
            (self.width - left - right).max(0.0),
            (self.height - top - bottom).max(0.0),
        )
    }

    /// Splits this rect into two along `axis` at `ratio` (first piece gets
    /// `ratio` of the space).
    pub fn split(&self, axis: Axis, ratio: f64) -> (Rect, Rect) {
        let ratio = ratio.clamp(0.0, 1.0);
        match axis {
            Axis::Horizontal => {
                let left_w = self.width * ratio;
                (
                    Rect::new(self.x, self.y, left_w, self.height),
                    Rect::new(self.x + left_w, self.y, self.width - left_w, self.height),
                )
            }
            Axis::Vertical => {
                let top_h = self.height * ratio;
                (
                    Rect::new(self.x, self.y, self.width, top_h),
                    Rect::new(self.x, self.y + top_h, self.width, self.height - top_h),
                )
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn perpendicular(self) -> Axis {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_horizontal_halves() {
        let r = Rect::new(0.0, 0.0, 1000.0, 1000.0);
        let (a, b) = r.split(Axis::Horizontal, 0.5);
        assert_eq!(a, Rect::new(0.0, 0.0, 500.0, 1000.0));
        assert_eq!(b, Rect::new(500.0, 0.0, 500.0, 1000.0));
    }

    #[test]
    fn intersection_disjoint_is_zero_area() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 20.0, 10.0, 10.0);
        assert_eq!(a.intersection(&b).area(), 0.0);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn contains_is_half_open() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains(Point::new(0.0, 0.0)));
        assert!(!r.contains(Point::new(10.0, 10.0)));
    }
}
