//! Clipper polygon boolean operations module.
//!
//! This module provides polygon boolean operations (union, intersection, difference, XOR),
//! offset operations and open-path clipping using the geo-clipper library.
//!
//! Geometry is handed to Clipper in scaled integer space (factor 1.0), so offsets
//! and booleans are exact on the integer grid and every distance argument is in
//! scaled units. Results are always normalized to CCW contours with CW holes.

use crate::geometry::{ExPolygon, ExPolygons, Point, Polygon, Polyline};
use crate::{Coord, CoordF};
use geo::{Coord as GeoCoord, LineString, MultiLineString, MultiPolygon, Polygon as GeoPolygon};
use geo_clipper::{Clipper, ClipperOpen, EndType, JoinType};

/// Coordinates are already integers; Clipper must not rescale them.
const FACTOR: f64 = 1.0;

/// Miter limit used for mitered joins (multiples of the offset distance).
const MITER_LIMIT: f64 = 3.0;

/// Arc tolerance for round joins (scaled units, 2.5 microns).
const ARC_TOLERANCE: f64 = 2_500.0;

/// Join type for offset corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetJoinType {
    /// Square corners
    Square,
    /// Round corners
    Round,
    /// Mitered corners
    #[default]
    Miter,
}

impl From<OffsetJoinType> for JoinType {
    fn from(jt: OffsetJoinType) -> Self {
        match jt {
            OffsetJoinType::Square => JoinType::Square,
            OffsetJoinType::Round => JoinType::Round(ARC_TOLERANCE),
            OffsetJoinType::Miter => JoinType::Miter(MITER_LIMIT),
        }
    }
}

/// Fill rule for merging a flat list of polygons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillRule {
    /// A point is inside when it is enclosed by an odd number of rings.
    EvenOdd,
    /// A point is inside when the winding number around it is non-zero,
    /// so CW rings cancel the CCW rings around them.
    NonZero,
}

// ============================================================================
// Conversions
// ============================================================================

fn ring_to_geo(points: &[Point]) -> LineString<f64> {
    let mut ring: Vec<GeoCoord<f64>> = points
        .iter()
        .map(|p| GeoCoord {
            x: p.x as f64,
            y: p.y as f64,
        })
        .collect();
    if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
        if first != last {
            ring.push(*first);
        }
    }
    LineString::new(ring)
}

fn geo_to_points(ring: &LineString<f64>) -> Vec<Point> {
    ring.coords()
        .map(|c| Point::new(c.x.round() as i64, c.y.round() as i64))
        .collect()
}

/// Convert a single ring keeping its orientation (used for winding-sensitive unions).
fn polygon_to_geo(poly: &Polygon) -> GeoPolygon<f64> {
    GeoPolygon::new(ring_to_geo(poly.points()), vec![])
}

/// Convert an ExPolygon, forcing a CCW contour and CW holes.
fn expolygon_to_geo(expoly: &ExPolygon) -> GeoPolygon<f64> {
    let mut ex = expoly.clone();
    ex.normalize();
    GeoPolygon::new(
        ring_to_geo(ex.contour.points()),
        ex.holes.iter().map(|h| ring_to_geo(h.points())).collect(),
    )
}

fn geo_to_expolygon(geo_poly: &GeoPolygon<f64>) -> Option<ExPolygon> {
    let contour = Polygon::from_points(geo_to_points(geo_poly.exterior()));
    if !contour.is_valid() {
        return None;
    }
    let holes = geo_poly
        .interiors()
        .iter()
        .map(|r| Polygon::from_points(geo_to_points(r)))
        .filter(|h| h.is_valid())
        .collect();
    Some(ExPolygon::with_holes(contour, holes))
}

fn geo_multi_to_expolygons(multi: &MultiPolygon<f64>) -> ExPolygons {
    multi.0.iter().filter_map(geo_to_expolygon).collect()
}

fn expolygons_to_geo_multi(expolys: &[ExPolygon]) -> MultiPolygon<f64> {
    MultiPolygon::new(expolys.iter().map(expolygon_to_geo).collect())
}

fn polylines_to_geo(polylines: &[Polyline]) -> MultiLineString<f64> {
    MultiLineString::new(
        polylines
            .iter()
            .filter(|pl| pl.len() >= 2)
            .map(|pl| {
                LineString::new(
                    pl.points()
                        .iter()
                        .map(|p| GeoCoord {
                            x: p.x as f64,
                            y: p.y as f64,
                        })
                        .collect(),
                )
            })
            .collect(),
    )
}

fn geo_to_polylines(multi: &MultiLineString<f64>) -> Vec<Polyline> {
    multi
        .0
        .iter()
        .map(|ls| Polyline::from_points(geo_to_points(ls)))
        .filter(|pl| pl.is_valid())
        .collect()
}

// ============================================================================
// Boolean Operations
// ============================================================================

/// Compute the union of two sets of polygons.
pub fn union(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() && clip.is_empty() {
        return Vec::new();
    }
    let subject_geo = expolygons_to_geo_multi(subject);
    let clip_geo = expolygons_to_geo_multi(clip);
    geo_multi_to_expolygons(&subject_geo.union(&clip_geo, FACTOR))
}

/// Merge a single set of potentially overlapping polygons.
pub fn union_ex(polygons: &[ExPolygon]) -> ExPolygons {
    union(polygons, &[])
}

/// Merge a flat list of rings into ExPolygons under the given fill rule.
pub fn union_polygons(polygons: &[Polygon], rule: FillRule) -> ExPolygons {
    match rule {
        FillRule::NonZero => {
            let subject = MultiPolygon::new(polygons.iter().map(polygon_to_geo).collect());
            geo_multi_to_expolygons(&subject.union(&MultiPolygon::new(vec![]), FACTOR))
        }
        FillRule::EvenOdd => polygons.iter().fold(Vec::new(), |acc, p| {
            xor(&acc, &[ExPolygon::new(p.clone())])
        }),
    }
}

/// Compute the intersection of two sets of polygons.
pub fn intersection(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() || clip.is_empty() {
        return Vec::new();
    }
    let subject_geo = expolygons_to_geo_multi(subject);
    let clip_geo = expolygons_to_geo_multi(clip);
    geo_multi_to_expolygons(&subject_geo.intersection(&clip_geo, FACTOR))
}

/// Compute the difference (subject - clip).
pub fn difference(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() {
        return Vec::new();
    }
    if clip.is_empty() {
        return union_ex(subject);
    }
    let subject_geo = expolygons_to_geo_multi(subject);
    let clip_geo = expolygons_to_geo_multi(clip);
    geo_multi_to_expolygons(&subject_geo.difference(&clip_geo, FACTOR))
}

/// Compute the symmetric difference (XOR).
pub fn xor(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() {
        return union_ex(clip);
    }
    if clip.is_empty() {
        return union_ex(subject);
    }
    let subject_geo = expolygons_to_geo_multi(subject);
    let clip_geo = expolygons_to_geo_multi(clip);
    geo_multi_to_expolygons(&subject_geo.xor(&clip_geo, FACTOR))
}

// ============================================================================
// Offset Operations
// ============================================================================

/// Offset ExPolygons by `delta` scaled units (positive grows, negative shrinks).
pub fn offset_expolygons(
    expolygons: &[ExPolygon],
    delta: CoordF,
    join_type: OffsetJoinType,
) -> ExPolygons {
    if expolygons.is_empty() {
        return Vec::new();
    }
    if delta == 0.0 {
        return union_ex(expolygons);
    }
    let geo = expolygons_to_geo_multi(expolygons);
    let result = geo.offset(delta, join_type.into(), EndType::ClosedPolygon, FACTOR);
    geo_multi_to_expolygons(&result)
}

/// Offset plain rings, each treated as the region it encloses.
pub fn offset_polygons(polygons: &[Polygon], delta: CoordF, join_type: OffsetJoinType) -> ExPolygons {
    let expolys: ExPolygons = polygons.iter().cloned().map(ExPolygon::new).collect();
    offset_expolygons(&expolys, delta, join_type)
}

/// Shrink ExPolygons inward by `distance`.
pub fn shrink(expolygons: &[ExPolygon], distance: CoordF, join_type: OffsetJoinType) -> ExPolygons {
    offset_expolygons(expolygons, -distance.abs(), join_type)
}

/// Grow ExPolygons outward by `distance`.
pub fn grow(expolygons: &[ExPolygon], distance: CoordF, join_type: OffsetJoinType) -> ExPolygons {
    offset_expolygons(expolygons, distance.abs(), join_type)
}

/// Two successive offsets: first by `delta1`, then by `delta2` (both signed).
///
/// `offset2(x, -a, +b)` with `a > b` insets by `a - b` while removing every
/// feature narrower than `2a`.
pub fn offset2(
    expolygons: &[ExPolygon],
    delta1: CoordF,
    delta2: CoordF,
    join_type: OffsetJoinType,
) -> ExPolygons {
    let first = offset_expolygons(expolygons, delta1, join_type);
    if first.is_empty() {
        return Vec::new();
    }
    offset_expolygons(&first, delta2, join_type)
}

/// Grow open polylines into the area they sweep at `delta` scaled units on
/// either side (round caps and joins).
///
/// Built as the union of one rectangle per segment and one disc per vertex;
/// Clipper's open-path offset returns nothing at factor 1.0.
pub fn offset_polylines(polylines: &[Polyline], delta: CoordF) -> ExPolygons {
    if polylines.is_empty() || delta <= 0.0 {
        return Vec::new();
    }
    let mut rings: Vec<Polygon> = Vec::new();
    for pl in polylines {
        for w in pl.windows(2) {
            if let Some(band) = segment_band(w[0], w[1], delta) {
                rings.push(band);
            }
        }
        rings.extend(pl.iter().map(|p| disc(*p, delta)));
    }
    union_polygons(&rings, FillRule::NonZero)
}

/// CCW rectangle covering `delta` on both sides of segment `a`-`b`.
fn segment_band(a: Point, b: Point, delta: CoordF) -> Option<Polygon> {
    let (dx, dy) = ((b.x - a.x) as CoordF, (b.y - a.y) as CoordF);
    let len = dx.hypot(dy);
    if len <= 0.0 {
        return None;
    }
    let nx = (-dy / len * delta).round() as Coord;
    let ny = (dx / len * delta).round() as Coord;
    let mut band = Polygon::from_points(vec![
        Point::new(a.x - nx, a.y - ny),
        Point::new(b.x - nx, b.y - ny),
        Point::new(b.x + nx, b.y + ny),
        Point::new(a.x + nx, a.y + ny),
    ]);
    band.make_counter_clockwise();
    Some(band)
}

/// CCW polygon approximating a disc, with at most `ARC_TOLERANCE` sagitta.
fn disc(center: Point, radius: CoordF) -> Polygon {
    let step = if radius > ARC_TOLERANCE {
        2.0 * (1.0 - ARC_TOLERANCE / radius).acos()
    } else {
        std::f64::consts::FRAC_PI_2
    };
    let n = ((2.0 * std::f64::consts::PI / step).ceil() as usize).max(8);
    let points = (0..n)
        .map(|i| {
            let t = 2.0 * std::f64::consts::PI * i as CoordF / n as CoordF;
            Point::new(
                center.x + (radius * t.cos()).round() as Coord,
                center.y + (radius * t.sin()).round() as Coord,
            )
        })
        .collect();
    Polygon::from_points(points)
}

// ============================================================================
// Utilities
// ============================================================================

/// Drop ExPolygons whose area is below `min_area` (scaled²).
pub fn remove_small(expolygons: ExPolygons, min_area: CoordF) -> ExPolygons {
    expolygons
        .into_iter()
        .filter(|e| e.area() >= min_area)
        .collect()
}

/// Total area of a set of ExPolygons (scaled²).
pub fn total_area(expolygons: &[ExPolygon]) -> CoordF {
    expolygons.iter().map(|e| e.area()).sum()
}

// ============================================================================
// Open Path Clipping
// ============================================================================

/// Keep the parts of `polylines` inside `clip`.
pub fn intersection_pl(polylines: &[Polyline], clip: &[ExPolygon]) -> Vec<Polyline> {
    if polylines.is_empty() || clip.is_empty() {
        return Vec::new();
    }
    let lines = polylines_to_geo(polylines);
    let clip_geo = expolygons_to_geo_multi(clip);
    geo_to_polylines(&ClipperOpen::intersection(&lines, &clip_geo, FACTOR))
}

/// Keep the parts of `polylines` outside `clip`.
pub fn diff_pl(polylines: &[Polyline], clip: &[ExPolygon]) -> Vec<Polyline> {
    if polylines.is_empty() {
        return Vec::new();
    }
    if clip.is_empty() {
        return polylines.to_vec();
    }
    let lines = polylines_to_geo(polylines);
    let clip_geo = expolygons_to_geo_multi(clip);
    geo_to_polylines(&ClipperOpen::difference(&lines, &clip_geo, FACTOR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale;

    fn make_square_mm(x: CoordF, y: CoordF, size: CoordF) -> ExPolygon {
        ExPolygon::new(Polygon::rectangle_mm(x, y, x + size, y + size))
    }

    fn mm2(v: CoordF) -> CoordF {
        crate::scaled_area(v)
    }

    fn assert_area(actual: CoordF, expected_mm2: CoordF) {
        let expected = mm2(expected_mm2);
        assert!(
            (actual - expected).abs() <= expected * 0.01,
            "area {} mm² != expected {} mm²",
            actual / mm2(1.0),
            expected_mm2
        );
    }

    #[test]
    fn test_union_overlapping() {
        let a = make_square_mm(0.0, 0.0, 10.0);
        let b = make_square_mm(5.0, 0.0, 10.0);
        let result = union(&[a], &[b]);
        assert_eq!(result.len(), 1);
        assert_area(total_area(&result), 150.0);
    }

    #[test]
    fn test_difference_creates_hole() {
        let outer = make_square_mm(0.0, 0.0, 10.0);
        let inner = make_square_mm(3.0, 3.0, 4.0);
        let result = difference(&[outer], &[inner]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].holes.len(), 1);
        assert!(result[0].contour.is_counter_clockwise());
        assert!(result[0].holes[0].is_clockwise());
        assert_area(total_area(&result), 84.0);
    }

    #[test]
    fn test_intersection_disjoint_is_empty() {
        let a = make_square_mm(0.0, 0.0, 1.0);
        let b = make_square_mm(5.0, 5.0, 1.0);
        assert!(intersection(&[a], &[b]).is_empty());
    }

    #[test]
    fn test_offset_shrink_and_grow() {
        let sq = make_square_mm(0.0, 0.0, 10.0);
        let shrunk = shrink(&[sq.clone()], scale(1.0) as CoordF, OffsetJoinType::Miter);
        assert_area(total_area(&shrunk), 64.0);

        let grown = grow(&[sq], scale(1.0) as CoordF, OffsetJoinType::Miter);
        assert_area(total_area(&grown), 144.0);
    }

    #[test]
    fn test_offset2_removes_thin_parts() {
        // 10x10 square with a 0.2mm wide tail
        let sq = make_square_mm(0.0, 0.0, 10.0);
        let tail = ExPolygon::new(Polygon::rectangle_mm(10.0, 4.9, 15.0, 5.1));
        let merged = union(&[sq], &[tail]);
        let opened = offset2(
            &merged,
            -(scale(0.25) as CoordF),
            scale(0.25) as CoordF,
            OffsetJoinType::Miter,
        );
        assert_area(total_area(&opened), 100.0);
    }

    #[test]
    fn test_union_polygons_fill_rules() {
        let outer = Polygon::rectangle_mm(0.0, 0.0, 10.0, 10.0);
        let inner = Polygon::rectangle_mm(2.0, 2.0, 8.0, 8.0);

        // Even-odd: nested rings alternate inside/outside regardless of winding.
        let eo = union_polygons(&[outer.clone(), inner.clone()], FillRule::EvenOdd);
        assert_area(total_area(&eo), 64.0);

        // Non-zero: both CCW rings merge into the outer square.
        let nz = union_polygons(&[outer.clone(), inner.clone()], FillRule::NonZero);
        assert_area(total_area(&nz), 100.0);

        // Non-zero with a CW inner ring cancels out to a hole.
        let mut hole = inner;
        hole.make_clockwise();
        let nz_hole = union_polygons(&[outer, hole], FillRule::NonZero);
        assert_area(total_area(&nz_hole), 64.0);
    }

    #[test]
    fn test_intersection_pl_clips_line() {
        let sq = make_square_mm(0.0, 0.0, 10.0);
        let line = Polyline::from_points(vec![Point::new_scale(-5.0, 5.0), Point::new_scale(15.0, 5.0)]);
        let clipped = intersection_pl(&[line.clone()], &[sq.clone()]);
        assert_eq!(clipped.len(), 1);
        assert!((clipped[0].length() - scale(10.0) as CoordF).abs() < 10.0);

        let outside = diff_pl(&[line], &[sq]);
        assert_eq!(outside.len(), 2);
    }

    #[test]
    fn test_remove_small() {
        let big = make_square_mm(0.0, 0.0, 10.0);
        let small = make_square_mm(20.0, 20.0, 0.1);
        let kept = remove_small(vec![big, small], mm2(1.0));
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_offset_polylines_sweeps_area() {
        let line = Polyline::from_points(vec![Point::new(0, 0), Point::new(scale(10.0), 0)]);
        let swept = offset_polylines(&[line], scale(0.5) as CoordF);
        assert_eq!(swept.len(), 1);
        // 10 x 1 band plus two half-disc caps of radius 0.5.
        let expected = mm2(10.0 + std::f64::consts::PI * 0.25);
        assert!((total_area(&swept) - expected).abs() < mm2(0.05));
        assert!(offset_polylines(&[], 1.0).is_empty());
    }

    #[test]
    fn test_offset_polylines_bend_and_point() {
        // An L of two 10mm legs: two bands overlapping in one square at the bend.
        let l = Polyline::from_points(vec![
            Point::new_scale(0.0, 0.0),
            Point::new_scale(10.0, 0.0),
            Point::new_scale(10.0, 10.0),
        ]);
        let swept = offset_polylines(&[l], scale(0.5) as CoordF);
        assert_eq!(swept.len(), 1);
        assert!(swept[0].holes.is_empty());
        // 2 bands of 10 x 1, minus the doubled corner square, plus a quarter
        // disc at the outer corner and two half-disc caps.
        let pi = std::f64::consts::PI;
        let expected = mm2(20.0 - 0.25 + pi * 0.25 * 0.25 + pi * 0.25);
        assert!((total_area(&swept) - expected).abs() < mm2(0.05));

        // A zero-length path still sweeps a disc.
        let dot = Polyline::from_points(vec![Point::new(0, 0), Point::new(0, 0)]);
        let swept = offset_polylines(&[dot], scale(0.5) as CoordF);
        assert!((total_area(&swept) - mm2(pi * 0.25)).abs() < mm2(0.01));
    }
}
