//! Closed polygon type.
//!
//! Orientation carries meaning: a counter-clockwise polygon is an outer
//! contour, a clockwise polygon is a hole. Points are stored without repeating
//! the first point at the end.

use super::{BoundingBox, Line, Point, Polyline};
use crate::{scale, Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// A closed polygon defined by a sequence of points.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Polygon {
    points: Vec<Point>,
}

/// A list of polygons.
pub type Polygons = Vec<Polygon>;

impl Polygon {
    #[inline]
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Create a polygon from points. A repeated closing point is dropped.
    pub fn from_points(mut points: Vec<Point>) -> Self {
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        Self { points }
    }

    /// Create a polygon from millimetre coordinates.
    pub fn from_coords_mm(coords: &[(CoordF, CoordF)]) -> Self {
        Self::from_points(coords.iter().map(|&(x, y)| Point::new_scale(x, y)).collect())
    }

    /// Axis-aligned CCW rectangle in scaled coordinates.
    pub fn rectangle(min: Point, max: Point) -> Self {
        Self {
            points: vec![
                min,
                Point::new(max.x, min.y),
                max,
                Point::new(min.x, max.y),
            ],
        }
    }

    /// Axis-aligned CCW rectangle given in millimetres.
    pub fn rectangle_mm(x0: CoordF, y0: CoordF, x1: CoordF, y1: CoordF) -> Self {
        Self::rectangle(
            Point::new(scale(x0), scale(y0)),
            Point::new(scale(x1), scale(y1)),
        )
    }

    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// First point of the ring. Panics on an empty polygon, like slice indexing.
    #[inline]
    pub fn first_point(&self) -> Point {
        self.points[0]
    }

    /// Signed area via the shoelace formula (positive for CCW).
    pub fn area(&self) -> CoordF {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut sum: i128 = 0;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            sum += a.x as i128 * b.y as i128 - b.x as i128 * a.y as i128;
        }
        sum as CoordF / 2.0
    }

    #[inline]
    pub fn is_counter_clockwise(&self) -> bool {
        self.area() > 0.0
    }

    #[inline]
    pub fn is_clockwise(&self) -> bool {
        self.area() < 0.0
    }

    /// Reverse the orientation.
    #[inline]
    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Make the polygon CCW. Returns true if it was reversed.
    pub fn make_counter_clockwise(&mut self) -> bool {
        if self.is_clockwise() {
            self.reverse();
            true
        } else {
            false
        }
    }

    /// Make the polygon CW. Returns true if it was reversed.
    pub fn make_clockwise(&mut self) -> bool {
        if self.is_counter_clockwise() {
            self.reverse();
            true
        } else {
            false
        }
    }

    /// Even-odd point-in-polygon test. Points exactly on the boundary may go
    /// either way.
    pub fn contains_point(&self, p: &Point) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let pi = self.points[i];
            let pj = self.points[j];
            if (pi.y > p.y) != (pj.y > p.y) {
                // x coordinate of the edge at height p.y, compared without division
                let lhs = (p.x - pi.x) as i128 * (pj.y - pi.y) as i128;
                let rhs = (pj.x - pi.x) as i128 * (p.y - pi.y) as i128;
                if (pj.y > pi.y) == (lhs < rhs) {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Check whether any vertex of `other` lies inside this polygon.
    pub fn encloses_any_vertex_of(&self, other: &Polygon) -> bool {
        other.points.iter().any(|p| self.contains_point(p))
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.points)
    }

    /// Edges of the closed ring, including the closing edge.
    pub fn lines(&self) -> Vec<Line> {
        let n = self.points.len();
        (0..n)
            .map(|i| Line::new(self.points[i], self.points[(i + 1) % n]))
            .collect()
    }

    /// Total boundary length.
    pub fn perimeter(&self) -> CoordF {
        self.lines().iter().map(|l| l.length()).sum()
    }

    /// Open the ring at its first point; the result ends where it starts.
    pub fn split_at_first_point(&self) -> Polyline {
        Polyline::from_polygon(self)
    }

    pub fn rotate(&mut self, angle: CoordF) {
        for p in &mut self.points {
            *p = p.rotate(angle);
        }
    }

    pub fn translate(&mut self, dx: Coord, dy: Coord) {
        for p in &mut self.points {
            p.x += dx;
            p.y += dy;
        }
    }

    /// A polygon needs at least three points and a non-zero area.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.points.len() >= 3 && self.area() != 0.0
    }
}

impl Deref for Polygon {
    type Target = [Point];

    fn deref(&self) -> &Self::Target {
        &self.points
    }
}

impl fmt::Debug for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Polygon({} points, {})",
            self.points.len(),
            if self.is_counter_clockwise() { "ccw" } else { "cw" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_square_mm(x: CoordF, y: CoordF, size: CoordF) -> Polygon {
        Polygon::rectangle_mm(x, y, x + size, y + size)
    }

    #[test]
    fn test_area_and_orientation() {
        let mut sq = make_square_mm(0.0, 0.0, 10.0);
        let expected = scale(10.0) as CoordF * scale(10.0) as CoordF;
        assert!(sq.is_counter_clockwise());
        assert!((sq.area() - expected).abs() < 1.0);

        assert!(sq.make_clockwise());
        assert!(sq.is_clockwise());
        assert!((sq.area() + expected).abs() < 1.0);
        assert!(!sq.make_clockwise());
    }

    #[test]
    fn test_contains_point() {
        let sq = make_square_mm(0.0, 0.0, 10.0);
        assert!(sq.contains_point(&Point::new_scale(5.0, 5.0)));
        assert!(!sq.contains_point(&Point::new_scale(15.0, 5.0)));
        assert!(!sq.contains_point(&Point::new_scale(-0.1, 5.0)));

        // orientation does not matter for containment
        let mut cw = sq.clone();
        cw.reverse();
        assert!(cw.contains_point(&Point::new_scale(5.0, 5.0)));
    }

    #[test]
    fn test_closing_point_dropped() {
        let p = Polygon::from_points(vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 0),
        ]);
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn test_split_at_first_point_is_closed() {
        let sq = make_square_mm(0.0, 0.0, 1.0);
        let pl = sq.split_at_first_point();
        assert_eq!(pl.len(), 5);
        assert_eq!(pl.first_point(), pl.last_point());
    }
}
