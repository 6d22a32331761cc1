//! Axis-aligned bounding box over scaled points.

use super::Point;
use crate::Coord;
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box. An empty box has `defined == false`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
    pub defined: bool,
}

impl BoundingBox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the box enclosing all `points`.
    pub fn from_points(points: &[Point]) -> Self {
        let mut bb = Self::new();
        for p in points {
            bb.merge_point(*p);
        }
        bb
    }

    /// Grow the box to include `p`.
    pub fn merge_point(&mut self, p: Point) {
        if self.defined {
            self.min.x = self.min.x.min(p.x);
            self.min.y = self.min.y.min(p.y);
            self.max.x = self.max.x.max(p.x);
            self.max.y = self.max.y.max(p.y);
        } else {
            self.min = p;
            self.max = p;
            self.defined = true;
        }
    }

    /// Grow the box to include another box.
    pub fn merge(&mut self, other: &BoundingBox) {
        if other.defined {
            self.merge_point(other.min);
            self.merge_point(other.max);
        }
    }

    #[inline]
    pub fn width(&self) -> Coord {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> Coord {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn center(&self) -> Point {
        Point::new(
            self.min.x + self.width() / 2,
            self.min.y + self.height() / 2,
        )
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.defined
    }

    /// Check whether `p` lies inside the box (boundary inclusive).
    pub fn contains(&self, p: &Point) -> bool {
        self.defined
            && p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
    }

    /// Check whether two boxes overlap (boundary inclusive).
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.defined
            && other.defined
            && self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_from_points() {
        let bb = BoundingBox::from_points(&[Point::new(5, -2), Point::new(-1, 7), Point::new(3, 3)]);
        assert_eq!(bb.min, Point::new(-1, -2));
        assert_eq!(bb.max, Point::new(5, 7));
        assert_eq!(bb.width(), 6);
        assert!(bb.contains(&Point::new(0, 0)));
        assert!(!bb.contains(&Point::new(6, 0)));
    }

    #[test]
    fn test_bounding_box_empty() {
        let bb = BoundingBox::from_points(&[]);
        assert!(bb.is_empty());
        assert!(!bb.overlaps(&BoundingBox::from_points(&[Point::new(0, 0)])));
    }
}
