//! Line segment type.

use super::Point;
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// A line segment defined by two endpoints.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Line {
    pub a: Point,
    pub b: Point,
}

impl Line {
    #[inline]
    pub const fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }

    /// Direction vector (b - a).
    #[inline]
    pub fn vector(&self) -> Point {
        self.b - self.a
    }

    /// Direction angle in radians, normalized to [0, PI).
    ///
    /// Segments are undirected for this purpose: a line and its reverse share
    /// the same direction.
    pub fn direction(&self) -> CoordF {
        let v = self.vector();
        let mut angle = (v.y as CoordF).atan2(v.x as CoordF);
        if angle < 0.0 {
            angle += PI;
        }
        if angle >= PI {
            angle -= PI;
        }
        angle
    }

    #[inline]
    pub fn midpoint(&self) -> Point {
        Point::new((self.a.x + self.b.x) / 2, (self.a.y + self.b.y) / 2)
    }

    #[inline]
    pub fn length(&self) -> CoordF {
        self.a.distance(&self.b)
    }

    /// Distance from `p` to this segment.
    pub fn distance_to_point(&self, p: &Point) -> CoordF {
        Self::distance_to_squared(*p, self.a, self.b).sqrt()
    }

    /// Squared distance from `p` to segment `a`-`b`.
    pub fn distance_to_squared(p: Point, a: Point, b: Point) -> f64 {
        let ab = b.to_f64() - a.to_f64();
        let ap = p.to_f64() - a.to_f64();
        let len_sq = ab.x * ab.x + ab.y * ab.y;
        if len_sq == 0.0 {
            return ap.x * ap.x + ap.y * ap.y;
        }
        let t = ((ap.x * ab.x + ap.y * ab.y) / len_sq).clamp(0.0, 1.0);
        let dx = ap.x - t * ab.x;
        let dy = ap.y - t * ab.y;
        dx * dx + dy * dy
    }

    pub fn rotate(&self, angle: CoordF) -> Self {
        Self::new(self.a.rotate(angle), self.b.rotate(angle))
    }

    #[inline]
    pub fn reverse(&self) -> Self {
        Self::new(self.b, self.a)
    }
}

impl fmt::Debug for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line({:?} -> {:?})", self.a, self.b)
    }
}
