//! Bridge direction detection.
//!
//! A bottom surface printed over open air has to be laid in strands that run
//! from one support to another. [`BridgeDetector`] looks at how the surface
//! meets the slices of the layer below and picks the strand direction.
//!
//! # Algorithm Overview
//!
//! 1. **Support edges**: the boundary of the surface, grown by the perimeter
//!    width, is clipped against every contour of the layer below. Each piece
//!    that lies over support is an edge.
//!
//! 2. **Few edges**: with two edges the strands run along the line joining
//!    the midpoints of the two edge chords. With a single curved edge the
//!    strands run along its chord, which reads a U-shaped support correctly
//!    and a plain overhang not at all. A single straight edge or no edge at
//!    all gives no direction.
//!
//! 3. **Direction search**: with three or more edges every direction in 5°
//!    steps is tried. Parallel probe lines one infill width apart are clipped
//!    to the surface and only segments anchored at both ends count. The
//!    direction with the largest anchored length wins; ties go to the
//!    smallest angle.
//!
//! Angles are in radians in `[0, PI)`, measured from the X axis, and give the
//! direction of the strands (perpendicular to the supports they span).

use crate::clipper::{grow, intersection, intersection_pl, union_ex, OffsetJoinType};
use crate::flow::RegionFlows;
use crate::geometry::{bounding_box_of, point_in_expolygons, ExPolygon, Line, Point, Polyline};
use crate::{unscale, Coord, CoordF, SCALED_EPSILON};
use log::{debug, trace};
use std::f64::consts::PI;

/// Angular step of the direction search (5 degrees).
const SEARCH_STEP: CoordF = PI / 36.0;

/// Finds bridge directions for bottom surfaces.
#[derive(Clone, Debug)]
pub struct BridgeDetector {
    /// Growth applied before looking for support edges (scaled).
    perimeter_width: Coord,
    /// Probe line spacing and anchor depth (scaled).
    infill_width: Coord,
}

impl BridgeDetector {
    pub fn new(perimeter_width: Coord, infill_width: Coord) -> Self {
        Self {
            perimeter_width,
            infill_width,
        }
    }

    /// Detector sized for a region's perimeter and infill flows.
    pub fn from_flows(flows: &RegionFlows) -> Self {
        Self::new(flows.perimeter.scaled_width(), flows.infill.scaled_width())
    }

    /// Pieces of the surface boundary that rest on `lower` slices.
    pub fn support_edges(&self, surface: &ExPolygon, lower: &[ExPolygon]) -> Vec<Polyline> {
        let grown = grow(
            std::slice::from_ref(surface),
            self.perimeter_width as CoordF,
            OffsetJoinType::Miter,
        );
        let boundary: Vec<Polyline> = grown.iter().flat_map(|ex| ex.to_polylines()).collect();

        let mut edges = Vec::new();
        for slice in lower {
            let contour = ExPolygon::new(slice.contour.clone());
            let pieces = intersection_pl(&boundary, std::slice::from_ref(&contour));
            edges.extend(stitch(pieces));
        }
        edges
    }

    /// Bridge direction for `surface` over `lower`, if one can be found.
    pub fn detect(&self, surface: &ExPolygon, lower: &[ExPolygon]) -> Option<CoordF> {
        if lower.is_empty() {
            return None;
        }
        let edges = self.support_edges(surface, lower);
        let angle = match edges.as_slice() {
            [] => None,
            [a, b] => {
                let between = Line::new(a.chord().midpoint(), b.chord().midpoint());
                Some(between.direction())
            }
            [edge] if edge.len() > 2 => Some(edge.chord().direction()),
            [_] => None,
            _ => self.search_direction(surface, lower),
        };
        match angle {
            Some(a) => debug!(
                "bridge over {} support edges: {:.1}°",
                edges.len(),
                a.to_degrees()
            ),
            None => debug!("no bridge direction ({} support edges)", edges.len()),
        }
        angle
    }

    /// Try every direction and keep the one bridging the most anchored length.
    fn search_direction(&self, surface: &ExPolygon, lower: &[ExPolygon]) -> Option<CoordF> {
        let width = self.infill_width as CoordF;
        // Half the anchor growth, so clipped probe ends land strictly inside an anchor.
        let clip_area = grow(std::slice::from_ref(surface), 0.5 * width, OffsetJoinType::Miter);
        let anchors = intersection(
            &grow(std::slice::from_ref(surface), width, OffsetJoinType::Miter),
            &union_ex(lower),
        );
        if anchors.is_empty() {
            return None;
        }

        let steps = (PI / SEARCH_STEP).round() as usize;
        let mut best: Option<(CoordF, CoordF)> = None;
        for step in 0..steps {
            let angle = step as CoordF * SEARCH_STEP;
            let score = self.anchored_length(&clip_area, &anchors, angle);
            trace!("bridge direction {:.0}°: {:.3}mm", angle.to_degrees(), unscale(score as Coord));
            if score > 0.0 && best.map_or(true, |(_, s)| score > s) {
                best = Some((angle, score));
            }
        }
        best.map(|(angle, _)| angle)
    }

    /// Total length of probe lines running along `angle` that start and end
    /// inside an anchor.
    fn anchored_length(&self, clip_area: &[ExPolygon], anchors: &[ExPolygon], angle: CoordF) -> CoordF {
        // Work in a frame where the probe lines are horizontal.
        let rotate = |ex: &[ExPolygon]| -> Vec<ExPolygon> {
            ex.iter()
                .cloned()
                .map(|mut e| {
                    e.rotate(-angle);
                    e
                })
                .collect()
        };
        let clip_area = rotate(clip_area);
        let anchors = rotate(anchors);

        let bb = bounding_box_of(&anchors);
        let mut probes = Vec::new();
        let mut y = bb.min.y + self.infill_width / 2;
        while y <= bb.max.y {
            probes.push(Polyline::from_points(vec![
                Point::new(bb.min.x, y),
                Point::new(bb.max.x, y),
            ]));
            y += self.infill_width;
        }

        intersection_pl(&probes, &clip_area)
            .iter()
            .filter(|seg| {
                point_in_expolygons(&seg.first_point(), &anchors)
                    && point_in_expolygons(&seg.last_point(), &anchors)
            })
            .map(|seg| seg.length())
            .sum()
    }
}

/// Join clipped pieces that share an end point.
///
/// Clipping a closed ring as an open path splits it where the ring starts,
/// so one physical edge may come back as two pieces.
fn stitch(mut pieces: Vec<Polyline>) -> Vec<Polyline> {
    let close = |a: Point, b: Point| a.coincides_with(&b, SCALED_EPSILON);
    'outer: loop {
        for i in 0..pieces.len() {
            for j in 0..pieces.len() {
                if i == j {
                    continue;
                }
                let (a_first, a_last) = (pieces[i].first_point(), pieces[i].last_point());
                let (b_first, b_last) = (pieces[j].first_point(), pieces[j].last_point());
                let joined = if close(a_last, b_first) {
                    join(pieces[i].clone(), &pieces[j])
                } else if close(a_last, b_last) {
                    join(pieces[i].clone(), &pieces[j].reversed())
                } else if close(a_first, b_first) && i < j {
                    join(pieces[i].reversed(), &pieces[j])
                } else {
                    continue;
                };
                let (lo, hi) = if i < j { (i, j) } else { (j, i) };
                pieces.remove(hi);
                pieces[lo] = joined;
                continue 'outer;
            }
        }
        return pieces;
    }
}

/// Append `tail` to `head`, dropping the first point of `tail`, which
/// coincides with the end of `head` within tolerance.
fn join(mut head: Polyline, tail: &Polyline) -> Polyline {
    for p in tail.iter().skip(1) {
        head.push(*p);
    }
    head
}
