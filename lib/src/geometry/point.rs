//! Point types.
//!
//! [`Point`] stores scaled integer coordinates and is what every polygon in the
//! pipeline is made of. [`PointF`] is the floating-point companion used for
//! intermediate math (rotations, skeleton vertices) before snapping back.

use crate::{scale, unscale, Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// A 2D point with integer (scaled) coordinates.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub x: Coord,
    pub y: Coord,
}

/// A list of points.
pub type Points = Vec<Point>;

impl Point {
    /// Create a new point from scaled coordinates.
    #[inline]
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    /// Create a point from millimetre coordinates.
    #[inline]
    pub fn new_scale(x: CoordF, y: CoordF) -> Self {
        Self {
            x: scale(x),
            y: scale(y),
        }
    }

    /// Convert to floating-point scaled coordinates.
    #[inline]
    pub fn to_f64(&self) -> PointF {
        PointF::new(self.x as CoordF, self.y as CoordF)
    }

    /// Convert to millimetres.
    #[inline]
    pub fn to_mm(&self) -> (CoordF, CoordF) {
        (unscale(self.x), unscale(self.y))
    }

    #[inline]
    pub fn distance_squared(&self, other: &Point) -> i128 {
        let dx = (self.x - other.x) as i128;
        let dy = (self.y - other.y) as i128;
        dx * dx + dy * dy
    }

    #[inline]
    pub fn distance(&self, other: &Point) -> CoordF {
        (self.distance_squared(other) as CoordF).sqrt()
    }

    /// Length of the vector from the origin to this point.
    #[inline]
    pub fn length(&self) -> CoordF {
        (self.x as CoordF).hypot(self.y as CoordF)
    }

    /// Check whether two points are within `tolerance` of each other on both axes.
    #[inline]
    pub fn coincides_with(&self, other: &Point, tolerance: Coord) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }

    /// Rotate around the origin by `angle` radians (counter-clockwise).
    pub fn rotate(&self, angle: CoordF) -> Point {
        let (sin, cos) = angle.sin_cos();
        let x = self.x as CoordF;
        let y = self.y as CoordF;
        Point::new(
            (x * cos - y * sin).round() as Coord,
            (x * sin + y * cos).round() as Coord,
        )
    }

    /// Return the index of the point in `points` closest to this one.
    pub fn nearest_index(&self, points: &[Point]) -> Option<usize> {
        points
            .iter()
            .enumerate()
            .min_by_key(|(_, p)| self.distance_squared(p))
            .map(|(i, _)| i)
    }
}

impl Add for Point {
    type Output = Point;

    #[inline]
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    #[inline]
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point {
    type Output = Point;

    #[inline]
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point({}, {})", self.x, self.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y) = self.to_mm();
        write!(f, "({:.3}, {:.3})", x, y)
    }
}

/// A 2D point with floating-point coordinates (still in scaled space).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PointF {
    pub x: CoordF,
    pub y: CoordF,
}

impl PointF {
    #[inline]
    pub const fn new(x: CoordF, y: CoordF) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn distance(&self, other: &PointF) -> CoordF {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl Sub for PointF {
    type Output = PointF;

    #[inline]
    fn sub(self, rhs: PointF) -> PointF {
        PointF::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_distance() {
        let a = Point::new(0, 0);
        let b = Point::new(3, 4);
        assert_eq!(a.distance_squared(&b), 25);
        assert!((a.distance(&b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_point_rotate_quarter_turn() {
        let p = Point::new(1000, 0).rotate(std::f64::consts::FRAC_PI_2);
        assert_eq!(p, Point::new(0, 1000));
    }

    #[test]
    fn test_nearest_index() {
        let pts = vec![Point::new(10, 10), Point::new(1, 1), Point::new(-5, 0)];
        assert_eq!(Point::new(0, 0).nearest_index(&pts), Some(1));
        assert_eq!(Point::new(0, 0).nearest_index(&[]), None);
    }
}
