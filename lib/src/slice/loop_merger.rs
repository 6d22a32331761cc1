//! Loop merging: raw sliced loops into islands.
//!
//! The mesh slicer hands over an unordered set of closed loops per layer
//! region. Counter-clockwise loops add territory and clockwise loops cut holes.
//! Loops are folded outer-first so concentric loops of the same winding
//! collapse into one island and every hole lands in the island around it.

use super::surface::Surface;
use crate::clipper::{
    difference, offset2, offset_expolygons, offset_polygons, remove_small, union, OffsetJoinType,
};
use crate::config::RegionConfig;
use crate::flow::Flow;
use crate::geometry::{medial_axis, ExPolygon, ExPolygons, Polygon, Polyline};
use crate::{Coord, CoordF, Error, Result};
use log::{debug, trace};

/// Outward offset applied to every loop before folding (scaled units).
///
/// Loops that touch themselves or a neighbour after slicing overlap by this
/// much during the booleans, then the offset is taken back.
pub const SAFETY_OFFSET: CoordF = 10.0;

/// Builds the islands (`slices`) and thin walls of one layer region.
#[derive(Clone, Debug)]
pub struct LoopMerger {
    thin_walls: bool,
    perimeter_width: Coord,
    perimeter_spacing: Coord,
}

impl LoopMerger {
    pub fn new(config: &RegionConfig, perimeter_flow: &Flow) -> Self {
        Self {
            thin_walls: config.thin_walls,
            perimeter_width: perimeter_flow.scaled_width(),
            perimeter_spacing: perimeter_flow.scaled_spacing(),
        }
    }

    /// Merge raw loops into internal surfaces.
    ///
    /// Loops with fewer than three points are ignored. A clockwise loop that
    /// no other loop encloses is reported as [`Error::OrphanHole`].
    pub fn merge(&self, loops: &[Polygon]) -> Result<Vec<Surface>> {
        let loops: Vec<(usize, &Polygon)> = loops
            .iter()
            .enumerate()
            .filter(|(_, l)| l.len() >= 3)
            .collect();

        // Nesting depth of each loop: how many other loops enclose its first
        // vertex. Sorting by depth puts every loop after the loops around it.
        let depths: Vec<usize> = loops
            .iter()
            .enumerate()
            .map(|(i, (_, l))| {
                let probe = l.first_point();
                loops
                    .iter()
                    .enumerate()
                    .filter(|(j, (_, other))| *j != i && other.contains_point(&probe))
                    .count()
            })
            .collect();

        let mut order: Vec<usize> = (0..loops.len()).collect();
        order.sort_by_key(|&i| (depths[i], i));

        let mut merged: ExPolygons = Vec::new();
        for i in order {
            let (index, raw) = loops[i];
            if raw.is_clockwise() {
                if depths[i] == 0 {
                    return Err(Error::OrphanHole { index });
                }
                let mut hole = raw.clone();
                hole.make_counter_clockwise();
                // Shrinking the hole grows the solid around it.
                let cut = offset_polygons(&[hole], -SAFETY_OFFSET, OffsetJoinType::Miter);
                merged = difference(&merged, &cut);
            } else {
                let grown = offset_polygons(
                    std::slice::from_ref(raw),
                    SAFETY_OFFSET,
                    OffsetJoinType::Miter,
                );
                merged = union(&merged, &grown);
            }
            trace!("loop {} (depth {}): {} islands so far", index, depths[i], merged.len());
        }

        let merged = offset_expolygons(&merged, -SAFETY_OFFSET, OffsetJoinType::Miter);
        debug!("merged {} loops into {} islands", loops.len(), merged.len());
        Ok(merged.into_iter().map(Surface::internal).collect())
    }

    /// Skeletons of the parts of `slices` too thin to hold a perimeter loop.
    ///
    /// Returns nothing when thin walls are disabled.
    pub fn thin_walls(&self, slices: &[Surface]) -> Vec<Polyline> {
        if !self.thin_walls || slices.is_empty() {
            return Vec::new();
        }
        let slices: ExPolygons = slices.iter().map(|s| s.expolygon.clone()).collect();
        let half = self.perimeter_width as CoordF / 2.0;
        let collapsed = difference(
            &slices,
            &offset2(&slices, -half, half, OffsetJoinType::Miter),
        );
        let spacing = self.perimeter_spacing as CoordF;
        let thin = remove_small(collapsed, spacing * spacing);

        let walls: Vec<Polyline> = thin
            .iter()
            .flat_map(|ex: &ExPolygon| medial_axis(ex, self.perimeter_width))
            .filter(|pl| pl.length() >= self.perimeter_width as CoordF)
            .collect();
        if !walls.is_empty() {
            debug!("found {} thin walls in {} thin areas", walls.len(), thin.len());
        }
        walls
    }
}
