//! Layer data structures.
//!
//! A [`Layer`] is one horizontal slice of the print. It owns one
//! [`LayerRegion`] per material region; regions refer back to their layer by
//! index only, so a region never keeps its layer alive.

use super::surface::{surfaces_to_expolygons, Surface, SurfaceType};
use crate::config::RegionConfig;
use crate::extrusion::ExtrusionEntityCollection;
use crate::flow::{FlowResult, RegionFlows};
use crate::geometry::{ExPolygons, Polyline};
use crate::{scale, unscale, Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single layer of the print.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Layer {
    /// Layer index (0-based).
    id: usize,

    /// Z coordinate of the bottom of this layer (in scaled units).
    bottom_z: Coord,

    /// Z coordinate of the top of this layer (print_z, in scaled units).
    top_z: Coord,

    /// The regions printed at this layer.
    regions: Vec<LayerRegion>,

    /// Index of the layer below, if any.
    lower_layer_id: Option<usize>,

    /// Index of the layer above, if any.
    upper_layer_id: Option<usize>,
}

impl Layer {
    /// Create a new layer.
    pub fn new(id: usize, bottom_z: Coord, top_z: Coord) -> Self {
        Self {
            id,
            bottom_z,
            top_z,
            regions: Vec::new(),
            lower_layer_id: None,
            upper_layer_id: None,
        }
    }

    /// Create a new layer from heights in mm.
    pub fn new_f(id: usize, bottom_z: CoordF, top_z: CoordF) -> Self {
        Self::new(id, scale(bottom_z), scale(top_z))
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Z of the top of the layer (where the nozzle sits).
    #[inline]
    pub fn print_z(&self) -> Coord {
        self.top_z
    }

    #[inline]
    pub fn bottom_z(&self) -> Coord {
        self.bottom_z
    }

    #[inline]
    pub fn height(&self) -> Coord {
        self.top_z - self.bottom_z
    }

    #[inline]
    pub fn print_z_mm(&self) -> CoordF {
        unscale(self.top_z)
    }

    #[inline]
    pub fn height_mm(&self) -> CoordF {
        unscale(self.height())
    }

    #[inline]
    pub fn regions(&self) -> &[LayerRegion] {
        &self.regions
    }

    #[inline]
    pub fn regions_mut(&mut self) -> &mut Vec<LayerRegion> {
        &mut self.regions
    }

    /// Add a region. Its back-reference is pointed at this layer.
    pub fn add_region(&mut self, mut region: LayerRegion) {
        region.layer_id = self.id;
        self.regions.push(region);
    }

    pub fn region(&self, idx: usize) -> Option<&LayerRegion> {
        self.regions.get(idx)
    }

    pub fn set_lower_layer(&mut self, id: Option<usize>) {
        self.lower_layer_id = id;
    }

    pub fn set_upper_layer(&mut self, id: Option<usize>) {
        self.upper_layer_id = id;
    }

    #[inline]
    pub fn lower_layer_id(&self) -> Option<usize> {
        self.lower_layer_id
    }

    #[inline]
    pub fn upper_layer_id(&self) -> Option<usize> {
        self.upper_layer_id
    }

    #[inline]
    pub fn is_first_layer(&self) -> bool {
        self.id == 0
    }

    /// Merged slices of every region in this layer.
    pub fn all_slices(&self) -> ExPolygons {
        self.regions
            .iter()
            .flat_map(|r| surfaces_to_expolygons(&r.slices))
            .collect()
    }

    /// Flows for a region printed on this layer.
    pub fn region_flows(&self, config: &RegionConfig) -> FlowResult<RegionFlows> {
        RegionFlows::new(config, self.height_mm(), self.is_first_layer())
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Layer(id={}, z={:.3}mm, height={:.3}mm, {} regions)",
            self.id,
            self.print_z_mm(),
            self.height_mm(),
            self.regions.len()
        )
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Layer {} at z={:.3}mm", self.id, self.print_z_mm())?;
        for region in &self.regions {
            write!(f, "\n  {}", region)?;
        }
        Ok(())
    }
}

/// The geometry of one material region within a layer.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct LayerRegion {
    /// Index of the owning layer in the layer table.
    pub layer_id: usize,

    /// Region index (for multi-material/multi-region prints).
    pub region_id: usize,

    /// Merged islands, produced once by the loop merger.
    pub slices: Vec<Surface>,

    /// Skeletons of areas too thin for a full perimeter loop.
    pub thin_walls: Vec<Polyline>,

    /// Surfaces awaiting infill. Rebuilt wholesale by each stage.
    pub fill_surfaces: Vec<Surface>,

    /// Ordered perimeter loops followed by the thin-wall collection.
    pub perimeters: ExtrusionEntityCollection,

    /// Gap fill paths.
    pub thin_fills: ExtrusionEntityCollection,

    /// Infill paths, when the pipeline runs the fill pass.
    pub fills: ExtrusionEntityCollection,
}

impl LayerRegion {
    pub fn new(layer_id: usize, region_id: usize) -> Self {
        Self {
            layer_id,
            region_id,
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Total area of the merged slices (scaled²).
    pub fn area(&self) -> CoordF {
        self.slices.iter().map(|s| s.area()).sum()
    }

    /// Fill surfaces of one type.
    pub fn fill_surfaces_of(&self, surface_type: SurfaceType) -> impl Iterator<Item = &Surface> {
        self.fill_surfaces
            .iter()
            .filter(move |s| s.surface_type == surface_type)
    }
}

impl fmt::Debug for LayerRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LayerRegion(layer={}, region={}, {} slices, {} surfaces)",
            self.layer_id,
            self.region_id,
            self.slices.len(),
            self.fill_surfaces.len()
        )
    }
}

impl fmt::Display for LayerRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "region {}: {} islands, {} perimeter entities, {} gap fills, {} fill surfaces",
            self.region_id,
            self.slices.len(),
            self.perimeters.len(),
            self.thin_fills.len(),
            self.fill_surfaces.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ExPolygon, Polygon};

    #[test]
    fn test_layer_new() {
        let layer = Layer::new_f(0, 0.0, 0.3);
        assert_eq!(layer.id(), 0);
        assert!(layer.is_first_layer());
        assert!((layer.height_mm() - 0.3).abs() < 1e-6);
        assert!((layer.print_z_mm() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_add_region_sets_back_reference() {
        let mut layer = Layer::new_f(4, 0.8, 1.0);
        layer.add_region(LayerRegion::new(0, 2));
        assert_eq!(layer.regions()[0].layer_id, 4);
        assert_eq!(layer.region(0).map(|r| r.region_id), Some(2));
        assert!(layer.region(1).is_none());
    }

    #[test]
    fn test_all_slices() {
        let mut layer = Layer::new_f(0, 0.0, 0.2);
        let mut a = LayerRegion::new(0, 0);
        a.slices.push(Surface::internal(ExPolygon::new(Polygon::rectangle_mm(
            0.0, 0.0, 1.0, 1.0,
        ))));
        let mut b = LayerRegion::new(0, 1);
        b.slices.push(Surface::internal(ExPolygon::new(Polygon::rectangle_mm(
            2.0, 0.0, 3.0, 1.0,
        ))));
        layer.add_region(a);
        layer.add_region(b);
        assert_eq!(layer.all_slices().len(), 2);
    }

    #[test]
    fn test_region_flows_follow_layer() {
        let config = RegionConfig::default();
        let first = Layer::new_f(0, 0.0, 0.3).region_flows(&config).unwrap();
        let other = Layer::new_f(1, 0.3, 0.5).region_flows(&config).unwrap();
        assert!((first.perimeter.height - 0.3).abs() < 1e-6);
        assert!((other.perimeter.height - 0.2).abs() < 1e-6);
    }
}
