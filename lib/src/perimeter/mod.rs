//! Perimeter generation module.
//!
//! This module turns the islands of a layer region into nested perimeter
//! loops, the fill boundary left inside them and the gaps too narrow for
//! another loop.
//!
//! # Algorithm
//!
//! 1. Inset each island repeatedly: half a spacing for the external loop, a
//!    full spacing for every loop after it. Each inset is an
//!    erode-by-1.5 / dilate-by-0.5 pair so slivers narrower than a bead vanish
//! 2. Compare every inset with a plain erode; what the plain erode keeps and
//!    the inset loses is a gap for [`GapFiller`]
//! 3. One pass beyond the configured count only looks for gaps
//! 4. Inset the innermost loop once more to get the infill boundary
//! 5. Nest contour loops and hole loops in two containment forests and emit
//!    them inside-out, holes first
//!
//! Islands never nest inside each other's loops, so an island sitting in
//! another island's hole keeps its own external perimeter.

mod gap_fill;

pub use gap_fill::{GapFillOutput, GapFiller};

use crate::clipper::{difference, offset2, offset_expolygons, remove_small, OffsetJoinType};
use crate::config::RegionConfig;
use crate::extrusion::{
    ExtrusionEntity, ExtrusionEntityCollection, ExtrusionLoop, ExtrusionPath, ExtrusionRole,
};
use crate::flow::{Flow, RegionFlows};
use crate::geometry::{
    chain_points, simplify_expolygon, ContainmentTree, ExPolygons, Point, Polygon, Polyline,
};
use crate::slice::Surface;
use crate::{Coord, CoordF, SCALED_RESOLUTION};
use log::{debug, trace};

/// Extra outward offset of the inset before gap detection (scaled units).
///
/// Keeps boolean rounding along shared edges from showing up as gaps.
const GAP_CLIP_MARGIN: CoordF = 2.0;

/// Everything [`PerimeterGenerator::generate`] produces for one layer region.
#[derive(Clone, Debug, Default)]
pub struct PerimeterOutput {
    /// Ordered loops, followed by a collection of thin-wall paths if any.
    pub perimeters: ExtrusionEntityCollection,
    /// Infill boundaries left inside the innermost loops.
    pub fill_surfaces: Vec<Surface>,
    /// Areas between loops too narrow for another loop.
    pub gaps: ExPolygons,
}

impl PerimeterOutput {
    /// Number of closed loops, ignoring thin walls.
    pub fn loop_count(&self) -> usize {
        self.loops().count()
    }

    pub fn loops(&self) -> impl Iterator<Item = &ExtrusionLoop> {
        self.perimeters.entities.iter().filter_map(|e| e.as_loop())
    }
}

/// Builds perimeters for one layer region.
#[derive(Clone, Debug)]
pub struct PerimeterGenerator {
    perimeters: usize,
    perimeter_flow: Flow,
    solid_infill_flow: Flow,
    gap_fill: bool,
    external_perimeters_first: bool,
    brim_width: CoordF,
    layer_id: usize,
}

impl PerimeterGenerator {
    pub fn new(config: &RegionConfig, flows: &RegionFlows, layer_id: usize) -> Self {
        Self {
            perimeters: config.perimeters,
            perimeter_flow: flows.perimeter,
            solid_infill_flow: flows.solid_infill,
            gap_fill: config.gap_fill_enabled(),
            external_perimeters_first: config.external_perimeters_first,
            brim_width: config.brim_width,
            layer_id,
        }
    }

    /// Generate perimeters for `slices`, appending `thin_walls` as paths.
    pub fn generate(&self, slices: &[Surface], thin_walls: &[Polyline]) -> PerimeterOutput {
        let spacing = self.perimeter_flow.scaled_spacing() as CoordF;
        let width = self.perimeter_flow.scaled_width() as CoordF;
        let infill_spacing = self.solid_infill_flow.scaled_spacing() as CoordF;
        let gap_area_threshold = width * width;

        let mut contours: Vec<Polygon> = Vec::new();
        let mut contour_tags: Vec<usize> = Vec::new();
        let mut holes: Vec<Polygon> = Vec::new();
        let mut hole_tags: Vec<usize> = Vec::new();
        let mut gaps: ExPolygons = Vec::new();
        let mut fill_surfaces = Vec::new();

        for (island, surface) in slices.iter().enumerate() {
            let loop_number = self.perimeters + surface.extra_perimeters;
            let mut last: ExPolygons = vec![surface.expolygon.clone()];

            for i in 0..=loop_number {
                let distance = if i == 0 { spacing / 2.0 } else { spacing };
                let offsets = offset2(&last, -1.5 * distance, 0.5 * distance, OffsetJoinType::Miter);

                if self.gap_fill {
                    let eroded = offset_expolygons(&last, -distance, OffsetJoinType::Miter);
                    let kept = offset_expolygons(&offsets, GAP_CLIP_MARGIN, OffsetJoinType::Miter);
                    let found = remove_small(difference(&eroded, &kept), gap_area_threshold);
                    if !found.is_empty() {
                        trace!("island {} pass {}: {} gaps", island, i, found.len());
                    }
                    gaps.extend(found);
                }

                if offsets.is_empty() || i == loop_number {
                    break;
                }
                for ex in &offsets {
                    contours.push(ex.contour.clone());
                    contour_tags.push(island);
                    for hole in &ex.holes {
                        holes.push(hole.clone());
                        hole_tags.push(island);
                    }
                }
                last = offsets;
            }

            let simplified: ExPolygons = last
                .iter()
                .filter_map(|ex| simplify_expolygon(ex, SCALED_RESOLUTION))
                .collect();
            let fill = offset2(
                &simplified,
                -(spacing / 2.0 + infill_spacing),
                infill_spacing,
                OffsetJoinType::Miter,
            );
            fill_surfaces.extend(fill.into_iter().map(|ex| surface.with_expolygon(ex)));
        }

        let loop_spacing = self.perimeter_flow.scaled_spacing();
        let contour_tree = ContainmentTree::build_tagged(contours, &contour_tags);
        let hole_tree = ContainmentTree::build_tagged(holes, &hole_tags);

        let mut contour_loops = Vec::new();
        traverse(&contour_tree, contour_tree.roots(), 0, true, loop_spacing, &mut contour_loops);
        let mut loops = Vec::new();
        traverse(&hole_tree, hole_tree.roots(), 0, false, loop_spacing, &mut loops);
        loops.reverse();
        let hole_loop_count = loops.len();
        loops.extend(contour_loops);

        if self.external_perimeters_first || (self.layer_id == 0 && self.brim_width > 0.0) {
            loops.reverse();
        }

        let mut entities: Vec<ExtrusionEntity> =
            loops.into_iter().map(ExtrusionEntity::Loop).collect();
        if !thin_walls.is_empty() {
            let paths = thin_walls
                .iter()
                .map(|pl| {
                    ExtrusionEntity::Path(ExtrusionPath::new(
                        pl.clone(),
                        ExtrusionRole::ExternalPerimeter,
                        loop_spacing,
                    ))
                })
                .collect();
            entities.push(ExtrusionEntity::Collection(
                ExtrusionEntityCollection::new(paths).chained_path(),
            ));
        }

        debug!(
            "layer {}: {} islands -> {} contour loops, {} hole loops, {} thin walls, {} gaps",
            self.layer_id,
            slices.len(),
            contour_tree.len(),
            hole_loop_count,
            thin_walls.len(),
            gaps.len()
        );

        PerimeterOutput {
            perimeters: ExtrusionEntityCollection::new(entities),
            fill_surfaces,
            gaps,
        }
    }
}

/// Emit the loops under `ids` depth-first, children before their parent.
///
/// Siblings are visited in nearest-neighbour order of their first points.
fn traverse(
    tree: &ContainmentTree,
    ids: &[usize],
    depth: usize,
    is_contour: bool,
    flow_spacing: Coord,
    out: &mut Vec<ExtrusionLoop>,
) {
    let starts: Vec<Point> = ids.iter().map(|&id| tree.node(id).polygon.first_point()).collect();
    for k in chain_points(&starts, None) {
        let node = tree.node(ids[k]);
        traverse(tree, &node.children, depth + 1, is_contour, flow_spacing, out);

        let mut polygon = node.polygon.clone();
        let role = if is_contour {
            polygon.make_counter_clockwise();
            match depth {
                0 => ExtrusionRole::ExternalPerimeter,
                1 => ExtrusionRole::ContourInternalPerimeter,
                _ => ExtrusionRole::Perimeter,
            }
        } else {
            polygon.make_clockwise();
            if node.children.is_empty() {
                ExtrusionRole::ExternalPerimeter
            } else {
                ExtrusionRole::Perimeter
            }
        };
        out.push(ExtrusionLoop::new(polygon, role, flow_spacing));
    }
}
