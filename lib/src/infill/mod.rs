//! Fill pattern generation.
//!
//! The layer pipeline asks a [`FillPattern`] to cover a surface with
//! extrusion paths; gap fill uses it at full density and the optional fill
//! pass uses it for every fill surface.
//!
//! # Algorithm (rectilinear)
//!
//! 1. Rotate the surface so the fill direction becomes vertical
//! 2. Lay vertical lines `spacing / density` apart across its bounding box
//! 3. Clip the lines to the surface
//! 4. Walk the columns left to right, alternating direction, and join the end
//!    of one line to the start of the next where the connector stays inside
//! 5. Rotate the paths back
//!
//! At full density the spacing is shrunk slightly so a whole number of lines
//! spans the surface; the spacing actually used is reported back.

use crate::clipper::{grow, intersection_pl, OffsetJoinType};
use crate::geometry::{point_in_expolygons, ExPolygon, Point, Polyline};
use crate::slice::Surface;
use crate::{Coord, CoordF, SCALED_EPSILON};
use std::f64::consts::FRAC_PI_2;
use std::fmt;

/// Parameters for one fill call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillParams {
    /// Fill density (0.0 - 1.0).
    pub density: CoordF,
    /// Centre-to-centre spacing of adjacent lines at full density (scaled).
    pub flow_spacing: Coord,
    /// Base fill direction in radians.
    pub angle: CoordF,
    /// Layer index; odd layers turn the base direction by 90°.
    pub layer_id: usize,
}

/// Paths produced by a fill call plus the spacing they were laid at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillOutput {
    pub paths: Vec<Polyline>,
    /// Spacing actually used (scaled). May be tighter than requested at full density.
    pub flow_spacing: Coord,
}

/// A fill pattern generator.
///
/// Implementations must be deterministic: the same surface and parameters
/// always give the same paths.
pub trait FillPattern: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn fill_surface(&self, surface: &Surface, params: &FillParams) -> FillOutput;
}

/// Parallel lines joined into zigzags.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rectilinear;

impl Rectilinear {
    pub fn new() -> Self {
        Self
    }

    /// Direction of the lines for a surface.
    ///
    /// Bridges keep their detected direction; everything else alternates
    /// between the base angle and the base angle plus 90° layer by layer.
    pub fn direction(surface: &Surface, params: &FillParams) -> CoordF {
        match surface.bridge_angle {
            Some(angle) => angle,
            None if params.layer_id % 2 == 1 => params.angle + FRAC_PI_2,
            None => params.angle,
        }
    }
}

impl FillPattern for Rectilinear {
    fn name(&self) -> &'static str {
        "rectilinear"
    }

    fn fill_surface(&self, surface: &Surface, params: &FillParams) -> FillOutput {
        let mut output = FillOutput {
            paths: Vec::new(),
            flow_spacing: params.flow_spacing,
        };
        if params.flow_spacing <= 0 || params.density <= 0.0 || surface.expolygon.is_empty() {
            return output;
        }

        // Lines along `direction` become vertical after this rotation.
        let rotation = FRAC_PI_2 - Self::direction(surface, params);
        let mut region = surface.expolygon.clone();
        region.rotate(rotation);
        let bb = region.bounding_box();
        if bb.width() <= 0 || bb.height() <= 0 {
            return output;
        }

        let density = params.density.min(1.0);
        let mut distance = params.flow_spacing as CoordF / density;
        let columns: Vec<Coord> = if density >= 1.0 {
            let width = bb.width() as CoordF;
            let count = (width / distance).ceil().max(1.0);
            distance = width / count;
            output.flow_spacing = distance.round() as Coord;
            (0..count as usize)
                .map(|k| (bb.min.x as CoordF + distance * (k as CoordF + 0.5)).round() as Coord)
                .collect()
        } else {
            // Sparse lines sit on a global grid so they line up between layers.
            let first = (bb.min.x as CoordF / distance).ceil();
            (0..)
                .map(|k| ((first + k as CoordF) * distance).round() as Coord)
                .take_while(|&x| x <= bb.max.x)
                .collect()
        };

        let lines: Vec<Polyline> = columns
            .iter()
            .map(|&x| {
                Polyline::from_points(vec![
                    Point::new(x, bb.min.y - 1),
                    Point::new(x, bb.max.y + 1),
                ])
            })
            .collect();

        let region = [region];
        let mut segments = intersection_pl(&lines, &region);
        for seg in &mut segments {
            if seg.first_point().y > seg.last_point().y {
                seg.reverse();
            }
        }
        segments.sort_by_key(|s| (s.first_point().x, s.first_point().y));

        let connect_area = grow(&region, SCALED_EPSILON as CoordF, OffsetJoinType::Miter);
        let mut paths = zigzag(segments, distance, &connect_area);
        for path in &mut paths {
            path.rotate(-rotation);
        }
        output.paths = paths;
        output
    }
}

/// Join column segments into zigzag paths.
///
/// `segments` are sorted by column and point upwards; every other column is
/// walked downwards.
fn zigzag(segments: Vec<Polyline>, distance: CoordF, area: &[ExPolygon]) -> Vec<Polyline> {
    let mut paths: Vec<Polyline> = Vec::new();
    let mut current: Option<Polyline> = None;
    let mut column = 0usize;
    let mut last_x: Option<Coord> = None;

    for mut seg in segments {
        let x = seg.first_point().x;
        if last_x.is_some_and(|lx| lx != x) {
            column += 1;
        }
        last_x = Some(x);
        if column % 2 == 1 {
            seg.reverse();
        }

        current = match current.take() {
            Some(mut path) if can_connect(path.last_point(), seg.first_point(), distance, area) => {
                path.append(&seg);
                Some(path)
            }
            Some(path) => {
                paths.push(path);
                Some(seg)
            }
            None => Some(seg),
        };
    }
    paths.extend(current);
    paths
}

fn can_connect(from: Point, to: Point, distance: CoordF, area: &[ExPolygon]) -> bool {
    if from.x == to.x || from.distance(&to) > 3.0 * distance {
        return false;
    }
    let mid = Point::new((from.x + to.x) / 2, (from.y + to.y) / 2);
    point_in_expolygons(&mid, area)
}
