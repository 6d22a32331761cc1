//! Path simplification.
//!
//! All tolerances are in scaled units so they compose with the offsets and
//! boolean operations in [`crate::clipper`].

use super::{ExPolygon, Line, Point, Polygon};
use crate::Coord;

/// Douglas-Peucker line simplification.
///
/// Removes points that lie within `tolerance` of the segment joining their
/// retained neighbours. The first and last points are always preserved.
pub fn douglas_peucker(points: &[Point], tolerance: Coord) -> Vec<Point> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let tolerance_sq = tolerance as f64 * tolerance as f64;

    // Stack-based implementation (avoids stack overflow for large inputs)
    let mut stack = vec![(0, points.len() - 1)];
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    while let Some((anchor_idx, floater_idx)) = stack.pop() {
        if anchor_idx + 1 >= floater_idx {
            continue;
        }

        let anchor = points[anchor_idx];
        let floater = points[floater_idx];

        let mut max_dist_sq = 0.0;
        let mut furthest_idx = anchor_idx;
        for (i, p) in points.iter().enumerate().take(floater_idx).skip(anchor_idx + 1) {
            let dist_sq = Line::distance_to_squared(*p, anchor, floater);
            if dist_sq > max_dist_sq {
                max_dist_sq = dist_sq;
                furthest_idx = i;
            }
        }

        if max_dist_sq > tolerance_sq {
            keep[furthest_idx] = true;
            stack.push((anchor_idx, furthest_idx));
            stack.push((furthest_idx, floater_idx));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Douglas-Peucker for a closed ring.
///
/// The ring is opened at its first point and closed again, so the first vertex
/// always survives. Returns an empty polygon if fewer than three points remain.
pub fn douglas_peucker_polygon(polygon: &Polygon, tolerance: Coord) -> Polygon {
    if polygon.len() <= 3 {
        return polygon.clone();
    }
    let mut ring = polygon.points().to_vec();
    ring.push(ring[0]);
    let mut simplified = douglas_peucker(&ring, tolerance);
    simplified.pop();
    if simplified.len() < 3 {
        return Polygon::new();
    }
    Polygon::from_points(simplified)
}

/// Simplify every ring of an ExPolygon, dropping holes that collapse.
///
/// The result may be slightly self-intersecting on pathological input; callers
/// that need clean topology pass it through a union.
pub fn simplify_expolygon(expolygon: &ExPolygon, tolerance: Coord) -> Option<ExPolygon> {
    let contour = douglas_peucker_polygon(&expolygon.contour, tolerance);
    if !contour.is_valid() {
        return None;
    }
    let holes = expolygon
        .holes
        .iter()
        .map(|h| douglas_peucker_polygon(h, tolerance))
        .filter(|h| h.is_valid())
        .collect();
    Some(ExPolygon::with_holes(contour, holes))
}
