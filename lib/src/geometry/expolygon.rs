//! Polygon with holes.

use super::{BoundingBox, Point, Polygon, Polyline};
use crate::{Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An outer contour plus zero or more holes.
///
/// Canonical orientation is a CCW contour with CW holes; everything produced by
/// the [`crate::clipper`] module is normalized to it.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExPolygon {
    pub contour: Polygon,
    pub holes: Vec<Polygon>,
}

/// A list of ExPolygons.
pub type ExPolygons = Vec<ExPolygon>;

impl ExPolygon {
    /// Create an ExPolygon without holes, normalizing the contour to CCW.
    pub fn new(mut contour: Polygon) -> Self {
        contour.make_counter_clockwise();
        Self {
            contour,
            holes: Vec::new(),
        }
    }

    /// Create an ExPolygon with holes, normalizing orientations.
    pub fn with_holes(contour: Polygon, holes: Vec<Polygon>) -> Self {
        let mut expoly = Self { contour, holes };
        expoly.normalize();
        expoly
    }

    /// Force a CCW contour and CW holes.
    pub fn normalize(&mut self) {
        self.contour.make_counter_clockwise();
        for hole in &mut self.holes {
            hole.make_clockwise();
        }
    }

    /// Area of the contour minus the holes.
    pub fn area(&self) -> CoordF {
        self.contour.area().abs() - self.holes.iter().map(|h| h.area().abs()).sum::<CoordF>()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contour.len() < 3
    }

    /// Point-in-region test: inside the contour and outside every hole.
    pub fn contains_point(&self, p: &Point) -> bool {
        self.contour.contains_point(p) && !self.holes.iter().any(|h| h.contains_point(p))
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.contour.bounding_box()
    }

    /// Every ring opened at its first point.
    pub fn to_polylines(&self) -> Vec<Polyline> {
        std::iter::once(&self.contour)
            .chain(self.holes.iter())
            .map(|p| p.split_at_first_point())
            .collect()
    }

    pub fn rotate(&mut self, angle: CoordF) {
        self.contour.rotate(angle);
        for hole in &mut self.holes {
            hole.rotate(angle);
        }
    }

    pub fn translate(&mut self, dx: Coord, dy: Coord) {
        self.contour.translate(dx, dy);
        for hole in &mut self.holes {
            hole.translate(dx, dy);
        }
    }

    /// Check the structural invariant: every hole vertex lies inside the
    /// contour and no hole has a vertex inside another hole.
    pub fn is_valid(&self) -> bool {
        if !self.contour.is_valid() {
            return false;
        }
        for (i, hole) in self.holes.iter().enumerate() {
            if !hole.iter().all(|p| self.contour.contains_point(p)) {
                return false;
            }
            for other in &self.holes[i + 1..] {
                if hole.encloses_any_vertex_of(other) || other.encloses_any_vertex_of(hole) {
                    return false;
                }
            }
        }
        true
    }
}

impl From<Polygon> for ExPolygon {
    fn from(polygon: Polygon) -> Self {
        ExPolygon::new(polygon)
    }
}

impl fmt::Debug for ExPolygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExPolygon(contour: {} points, {} holes)",
            self.contour.len(),
            self.holes.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale;

    #[test]
    fn test_expolygon_area_with_hole() {
        let outer = Polygon::rectangle_mm(0.0, 0.0, 10.0, 10.0);
        let hole = Polygon::rectangle_mm(3.0, 3.0, 7.0, 7.0);
        let ex = ExPolygon::with_holes(outer, vec![hole]);

        let s = scale(1.0) as CoordF;
        assert!((ex.area() - 84.0 * s * s).abs() < 1.0);
        assert!(ex.holes[0].is_clockwise());
        assert!(ex.is_valid());
    }

    #[test]
    fn test_expolygon_contains_point() {
        let outer = Polygon::rectangle_mm(0.0, 0.0, 10.0, 10.0);
        let hole = Polygon::rectangle_mm(3.0, 3.0, 7.0, 7.0);
        let ex = ExPolygon::with_holes(outer, vec![hole]);

        assert!(ex.contains_point(&Point::new_scale(1.0, 1.0)));
        assert!(!ex.contains_point(&Point::new_scale(5.0, 5.0)));
    }

    #[test]
    fn test_expolygon_invalid_hole_outside() {
        let outer = Polygon::rectangle_mm(0.0, 0.0, 10.0, 10.0);
        let hole = Polygon::rectangle_mm(20.0, 20.0, 22.0, 22.0);
        let ex = ExPolygon::with_holes(outer, vec![hole]);
        assert!(!ex.is_valid());
    }
}
