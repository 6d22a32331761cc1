//! Pipeline module - runs every layer region through the geometry stages.
//!
//! Raw loops go in, finished [`Layer`]s come out:
//! loops → islands → perimeters + gap fill → surface types → classification
//! → external surfaces + bridges → (optionally) infill paths.
//!
//! # Scheduling
//!
//! Each stage runs over all layers in parallel and finishes before the next
//! one starts. Stages that look at neighbouring layers read a snapshot of the
//! merged slices taken after loop merging, so no layer ever waits on another
//! while its own stage runs.
//!
//! # Example
//!
//! ```rust,ignore
//! use slicer::{LayerInput, Pipeline, RegionConfig};
//!
//! let config = RegionConfig::default();
//! let layers = Pipeline::new(&config).with_infill(true).run(&inputs)?;
//! ```

use crate::bridge::BridgeDetector;
use crate::config::RegionConfig;
use crate::extrusion::{ExtrusionEntity, ExtrusionEntityCollection, ExtrusionPath, ExtrusionRole};
use crate::flow::RegionFlows;
use crate::geometry::{ExPolygon, ExPolygons, Polygon};
use crate::infill::{FillParams, FillPattern, Rectilinear};
use crate::inspect::{Inspector, NoInspector};
use crate::perimeter::{GapFiller, PerimeterGenerator};
use crate::slice::{
    apply_surface_types, detect_surface_types, surfaces_to_expolygons, ExternalSurfaceProcessor,
    Layer, LayerRegion, LoopMerger, SurfaceClassifier, SurfaceType,
};
use crate::{CoordF, Error, Result, Stage};
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Raw loops of one region at one layer, in millimetres.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionInput {
    /// Closed loops as `[x, y]` points. Counter-clockwise loops are contours,
    /// clockwise loops are holes.
    pub loops: Vec<Vec<[CoordF; 2]>>,
}

impl RegionInput {
    pub fn new(loops: Vec<Vec<[CoordF; 2]>>) -> Self {
        Self { loops }
    }

    /// Build from scaled polygons.
    pub fn from_polygons(polygons: &[Polygon]) -> Self {
        let loops = polygons
            .iter()
            .map(|p| {
                p.points()
                    .iter()
                    .map(|pt| {
                        let (x, y) = pt.to_mm();
                        [x, y]
                    })
                    .collect()
            })
            .collect();
        Self { loops }
    }

    /// Loops as scaled polygons, keeping their winding.
    pub fn polygons(&self) -> Vec<Polygon> {
        self.loops
            .iter()
            .map(|l| {
                let coords: Vec<(CoordF, CoordF)> = l.iter().map(|p| (p[0], p[1])).collect();
                Polygon::from_coords_mm(&coords)
            })
            .collect()
    }
}

/// One layer of raw loops.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerInput {
    /// Bottom of the layer (mm).
    pub bottom_z: CoordF,
    /// Top of the layer (mm).
    pub top_z: CoordF,
    pub regions: Vec<RegionInput>,
}

impl LayerInput {
    pub fn new(bottom_z: CoordF, top_z: CoordF) -> Self {
        Self {
            bottom_z,
            top_z,
            regions: Vec::new(),
        }
    }

    pub fn with_region(mut self, region: RegionInput) -> Self {
        self.regions.push(region);
        self
    }
}

/// The layer region pipeline.
#[derive(Clone)]
pub struct Pipeline {
    config: RegionConfig,
    filler: Arc<dyn FillPattern>,
    inspector: Arc<dyn Inspector>,
    infill: bool,
}

impl Pipeline {
    /// Create a pipeline with the rectilinear fill pattern and no inspector.
    pub fn new(config: &RegionConfig) -> Self {
        Self {
            config: config.clone(),
            filler: Arc::new(Rectilinear),
            inspector: Arc::new(NoInspector),
            infill: false,
        }
    }

    /// Fill pattern used for gap fill and the infill pass.
    pub fn with_filler(mut self, filler: Arc<dyn FillPattern>) -> Self {
        self.filler = filler;
        self
    }

    pub fn with_inspector(mut self, inspector: Arc<dyn Inspector>) -> Self {
        self.inspector = inspector;
        self
    }

    /// Also turn the final fill surfaces into infill paths.
    pub fn with_infill(mut self, enabled: bool) -> Self {
        self.infill = enabled;
        self
    }

    pub fn config(&self) -> &RegionConfig {
        &self.config
    }

    /// Run every stage over `inputs`. Layer `i` of the result is `inputs[i]`.
    pub fn run(&self, inputs: &[LayerInput]) -> Result<Vec<Layer>> {
        self.run_with_callback(inputs, |_, _| {})
    }

    /// Run with a progress callback.
    ///
    /// The callback receives the name of each finished stage and the overall
    /// progress (0.0 - 1.0).
    pub fn run_with_callback<F>(&self, inputs: &[LayerInput], mut callback: F) -> Result<Vec<Layer>>
    where
        F: FnMut(&str, f64),
    {
        self.config.validate()?;
        info!("processing {} layers ({})", inputs.len(), self.config);

        let mut layers = build_layers(inputs);
        let stages = if self.infill { 6.0 } else { 5.0 };

        layers
            .par_iter_mut()
            .zip(inputs.par_iter())
            .try_for_each(|(layer, input)| self.merge_layer(layer, input))?;
        callback(Stage::LoopMerge.name(), 1.0 / stages);

        layers
            .par_iter_mut()
            .try_for_each(|layer| self.perimeters_layer(layer))?;
        callback(Stage::GapFill.name(), 2.0 / stages);

        // Slices are final from here on.
        let all_slices: Vec<ExPolygons> = layers.par_iter().map(Layer::all_slices).collect();

        layers.par_iter_mut().try_for_each(|layer| {
            let lower = layer.lower_layer_id().map(|i| all_slices[i].as_slice());
            let upper = layer.upper_layer_id().map(|i| all_slices[i].as_slice());
            self.surface_types_layer(layer, lower, upper)
        })?;
        callback(Stage::SurfaceTypes.name(), 3.0 / stages);

        let classifier = SurfaceClassifier::new(&self.config);
        layers.par_iter_mut().for_each(|layer| {
            for region in layer.regions_mut().iter_mut() {
                region.fill_surfaces = classifier.classify(&region.fill_surfaces);
            }
        });
        callback(Stage::Classify.name(), 4.0 / stages);

        layers.par_iter_mut().try_for_each(|layer| {
            let lower = layer.lower_layer_id().map(|i| all_slices[i].as_slice());
            self.external_surfaces_layer(layer, lower)
        })?;
        callback(Stage::ExternalSurfaces.name(), 5.0 / stages);

        if self.infill {
            layers.par_iter_mut().try_for_each(|layer| self.fill_layer(layer))?;
            callback(Stage::Infill.name(), 1.0);
        }

        info!("done: {} layers", layers.len());
        Ok(layers)
    }

    fn flows(&self, layer: &Layer, region_id: usize, stage: Stage) -> Result<RegionFlows> {
        layer
            .region_flows(&self.config)
            .map_err(|e| Error::from(e).at(layer.id(), region_id, stage))
    }

    fn merge_layer(&self, layer: &mut Layer, input: &LayerInput) -> Result<()> {
        let layer_id = layer.id();
        let flows = self.flows(layer, 0, Stage::LoopMerge)?;
        let merger = LoopMerger::new(&self.config, &flows.perimeter);

        for (region, region_input) in layer.regions_mut().iter_mut().zip(&input.regions) {
            region.slices = merger
                .merge(&region_input.polygons())
                .map_err(|e| e.at(layer_id, region.region_id, Stage::LoopMerge))?;
            region.thin_walls = merger.thin_walls(&region.slices);
            debug!(
                "layer {} region {}: {} islands, {} thin walls",
                layer_id,
                region.region_id,
                region.slices.len(),
                region.thin_walls.len()
            );
            self.inspector.on_slices(region);
        }
        Ok(())
    }

    fn perimeters_layer(&self, layer: &mut Layer) -> Result<()> {
        let layer_id = layer.id();
        let flows = self.flows(layer, 0, Stage::Perimeters)?;
        let generator = PerimeterGenerator::new(&self.config, &flows, layer_id);
        let gap_filler = GapFiller::new(&self.config, &flows, layer_id);

        for region in layer.regions_mut().iter_mut() {
            let output = generator.generate(&region.slices, &region.thin_walls);
            region.perimeters = output.perimeters;
            region.fill_surfaces = output.fill_surfaces;
            self.inspector.on_perimeters(region);

            let gap_fill = gap_filler.fill(&output.gaps, &region.thin_walls, self.filler.as_ref());
            region.thin_fills = gap_fill.thin_fills;
            self.inspector.on_gap_fill(region);
        }
        Ok(())
    }

    fn surface_types_layer(
        &self,
        layer: &mut Layer,
        lower: Option<&[ExPolygon]>,
        upper: Option<&[ExPolygon]>,
    ) -> Result<()> {
        let flows = self.flows(layer, 0, Stage::SurfaceTypes)?;
        // Opening that drops boolean slivers between nearly identical layers.
        let noise = flows.perimeter.scaled_width() as CoordF / 10.0;

        for region in layer.regions_mut().iter_mut() {
            let slices = surfaces_to_expolygons(&region.slices);
            let typed = detect_surface_types(&slices, lower, upper, noise);
            region.fill_surfaces = apply_surface_types(&region.fill_surfaces, &typed);
        }
        Ok(())
    }

    fn external_surfaces_layer(
        &self,
        layer: &mut Layer,
        lower: Option<&[ExPolygon]>,
    ) -> Result<()> {
        let flows = self.flows(layer, 0, Stage::ExternalSurfaces)?;
        let processor =
            ExternalSurfaceProcessor::new(&self.config, BridgeDetector::from_flows(&flows));

        for region in layer.regions_mut().iter_mut() {
            region.fill_surfaces = processor.process(&region.fill_surfaces, lower);
            self.inspector.on_fill_surfaces(region);
        }
        Ok(())
    }

    fn fill_layer(&self, layer: &mut Layer) -> Result<()> {
        let layer_id = layer.id();
        let flows = self.flows(layer, 0, Stage::Infill)?;
        for region in layer.regions_mut().iter_mut() {
            self.fill_region(region, &flows, layer_id);
        }
        Ok(())
    }

    fn fill_region(&self, region: &mut LayerRegion, flows: &RegionFlows, layer_id: usize) {
        let angle = self.config.fill_angle.to_radians();
        let mut paths = Vec::new();
        for surface in &region.fill_surfaces {
            let (density, flow, role) = match surface.surface_type {
                SurfaceType::Internal => {
                    (self.config.fill_density, &flows.infill, ExtrusionRole::Infill)
                }
                SurfaceType::Top => (1.0, &flows.top_infill, ExtrusionRole::SolidFill),
                SurfaceType::Bottom | SurfaceType::InternalSolid => {
                    (1.0, &flows.solid_infill, ExtrusionRole::SolidFill)
                }
            };
            if density <= 0.0 {
                continue;
            }
            let params = FillParams {
                density,
                flow_spacing: flow.scaled_spacing(),
                angle,
                layer_id,
            };
            let output = self.filler.fill_surface(surface, &params);
            let spacing = output.flow_spacing;
            paths.extend(
                output
                    .paths
                    .into_iter()
                    .filter(|pl| pl.is_valid())
                    .map(|pl| ExtrusionEntity::Path(ExtrusionPath::new(pl, role, spacing))),
            );
        }
        region.fills = ExtrusionEntityCollection::new(paths).chained_path();
    }
}

/// Create the layer table with neighbour links and empty regions.
fn build_layers(inputs: &[LayerInput]) -> Vec<Layer> {
    let count = inputs.len();
    inputs
        .iter()
        .enumerate()
        .map(|(id, input)| {
            let mut layer = Layer::new_f(id, input.bottom_z, input.top_z);
            layer.set_lower_layer(id.checked_sub(1));
            layer.set_upper_layer((id + 1 < count).then_some(id + 1));
            for region_id in 0..input.regions.len() {
                layer.add_region(LayerRegion::new(id, region_id));
            }
            layer
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infill::FillOutput;
    use crate::scaled_area;
    use crate::slice::Surface;
    use std::f64::consts::FRAC_PI_2;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn make_square_mm(x: CoordF, y: CoordF, size: CoordF) -> Polygon {
        Polygon::rectangle_mm(x, y, x + size, y + size)
    }

    fn hole_mm(x: CoordF, y: CoordF, size: CoordF) -> Polygon {
        let mut p = make_square_mm(x, y, size);
        p.reverse();
        p
    }

    fn stack(count: usize, polygons: &[Polygon]) -> Vec<LayerInput> {
        (0..count)
            .map(|i| {
                let z = 0.3 + 0.2 * i as CoordF;
                let bottom = if i == 0 { 0.0 } else { z - 0.2 };
                LayerInput::new(bottom, z).with_region(RegionInput::from_polygons(polygons))
            })
            .collect()
    }

    fn all_expolygons(layers: &[Layer]) -> Vec<ExPolygon> {
        layers
            .iter()
            .flat_map(|l| l.regions())
            .flat_map(|r| r.slices.iter().chain(&r.fill_surfaces))
            .map(|s| s.expolygon.clone())
            .collect()
    }

    #[test]
    fn test_region_input_round_trip_keeps_winding() {
        let input = RegionInput::from_polygons(&[hole_mm(1.0, 1.0, 2.0)]);
        let back = input.polygons();
        assert!(back[0].is_clockwise());
        assert_eq!(back[0].len(), 4);
    }

    #[test]
    fn test_square_with_hole_single_layer() {
        let config = RegionConfig::default().with_perimeters(2);
        let inputs = stack(1, &[make_square_mm(0.0, 0.0, 30.0), hole_mm(10.0, 10.0, 10.0)]);
        let layers = Pipeline::new(&config).run(&inputs).unwrap();

        let region = &layers[0].regions()[0];
        assert_eq!(region.slices.len(), 1);
        let loops: Vec<_> = region.perimeters.entities.iter().filter_map(|e| e.as_loop()).collect();
        assert_eq!(loops.len(), 4);
        assert!(!loops[0].is_contour() && !loops[1].is_contour());
        assert_eq!(loops[3].role, ExtrusionRole::ExternalPerimeter);
        // The only layer is both first and last; bottom wins.
        assert!(region.fill_surfaces.iter().all(|s| s.surface_type == SurfaceType::Bottom));
    }

    #[test]
    fn test_winding_and_containment_invariants() {
        let config = RegionConfig::default();
        let inputs = stack(
            3,
            &[
                make_square_mm(0.0, 0.0, 30.0),
                hole_mm(5.0, 5.0, 8.0),
                hole_mm(17.0, 17.0, 8.0),
                make_square_mm(40.0, 0.0, 10.0),
            ],
        );
        let layers = Pipeline::new(&config).run(&inputs).unwrap();
        for ex in all_expolygons(&layers) {
            assert!(ex.contour.is_counter_clockwise());
            assert!(ex.holes.iter().all(|h| h.is_clockwise()));
            assert!(ex.is_valid());
        }
    }

    #[test]
    fn test_orphan_hole_reports_layer_and_stage() {
        let config = RegionConfig::default();
        let mut inputs = stack(2, &[make_square_mm(0.0, 0.0, 10.0)]);
        inputs[1].regions[0] =
            RegionInput::from_polygons(&[make_square_mm(0.0, 0.0, 10.0), hole_mm(20.0, 0.0, 2.0)]);

        let err = Pipeline::new(&config).run(&inputs).unwrap_err();
        assert_eq!(
            err.to_string(),
            "layer 1 region 0: geometry processing failed (loop merge)"
        );
        let Error::Stage { source, .. } = err else {
            panic!("expected a stage error");
        };
        assert!(matches!(*source, Error::OrphanHole { index: 1 }));
    }

    #[test]
    fn test_stack_surface_types() {
        let config = RegionConfig::default();
        let layers = Pipeline::new(&config)
            .run(&stack(3, &[make_square_mm(0.0, 0.0, 20.0)]))
            .unwrap();

        let types = |i: usize| -> Vec<SurfaceType> {
            layers[i].regions()[0]
                .fill_surfaces
                .iter()
                .map(|s| s.surface_type)
                .collect()
        };
        assert_eq!(types(0), vec![SurfaceType::Bottom]);
        assert_eq!(types(1), vec![SurfaceType::Internal]);
        assert_eq!(types(2), vec![SurfaceType::Top]);
        // Slices are never retyped.
        assert!(layers
            .iter()
            .all(|l| l.regions()[0].slices.iter().all(|s| s.surface_type == SurfaceType::Internal)));
    }

    #[test]
    fn test_bridge_between_pillars() {
        let config = RegionConfig::default();
        let pillars = [
            Polygon::rectangle_mm(0.0, 0.0, 20.0, 5.0),
            Polygon::rectangle_mm(0.0, 15.0, 20.0, 20.0),
        ];
        let slab = [make_square_mm(0.0, 0.0, 20.0)];
        let inputs = vec![
            LayerInput::new(0.0, 0.3).with_region(RegionInput::from_polygons(&pillars)),
            LayerInput::new(0.3, 0.5).with_region(RegionInput::from_polygons(&slab)),
        ];
        let layers = Pipeline::new(&config).run(&inputs).unwrap();

        let bottoms: Vec<_> = layers[1].regions()[0]
            .fill_surfaces_of(SurfaceType::Bottom)
            .collect();
        assert_eq!(bottoms.len(), 1);
        let angle = bottoms[0].bridge_angle.unwrap();
        assert!((angle - FRAC_PI_2).abs() < 1e-2, "angle = {}", angle.to_degrees());

        // Nothing to bridge over on the first layer.
        assert!(layers[0].regions()[0]
            .fill_surfaces
            .iter()
            .all(|s| s.bridge_angle.is_none()));
    }

    #[test]
    fn test_small_islands_become_solid() {
        let config = RegionConfig::default().with_solid_infill_below_area(70.0);
        let layers = Pipeline::new(&config)
            .run(&stack(3, &[make_square_mm(0.0, 0.0, 8.0), make_square_mm(20.0, 0.0, 30.0)]))
            .unwrap();
        let middle = &layers[1].regions()[0];
        let solid: CoordF = middle
            .fill_surfaces_of(SurfaceType::InternalSolid)
            .map(|s| s.area())
            .sum();
        let sparse: CoordF = middle.fill_surfaces_of(SurfaceType::Internal).map(|s| s.area()).sum();
        assert!(solid > 0.0 && solid < scaled_area(64.0));
        assert!(sparse > scaled_area(500.0));
    }

    #[test]
    fn test_run_is_deterministic() {
        let config = RegionConfig::default();
        let inputs = stack(3, &[make_square_mm(0.0, 0.0, 15.0), hole_mm(5.0, 5.0, 5.0)]);
        let pipeline = Pipeline::new(&config).with_infill(true);
        let a = serde_json::to_string(&pipeline.run(&inputs).unwrap()).unwrap();
        let b = serde_json::to_string(&pipeline.run(&inputs).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_infill_pass() {
        let config = RegionConfig::default();
        let inputs = stack(3, &[make_square_mm(0.0, 0.0, 20.0)]);

        let without = Pipeline::new(&config).run(&inputs).unwrap();
        assert!(without[1].regions()[0].fills.is_empty());

        let layers = Pipeline::new(&config).with_infill(true).run(&inputs).unwrap();
        let roles = |i: usize| -> Vec<ExtrusionRole> {
            layers[i].regions()[0].fills.entities.iter().filter_map(|e| e.role()).collect()
        };
        assert!(!roles(0).is_empty());
        assert!(roles(0).iter().all(|r| *r == ExtrusionRole::SolidFill));
        assert!(roles(1).iter().all(|r| *r == ExtrusionRole::Infill));
        assert!(!roles(1).is_empty());
    }

    #[test]
    fn test_inspector_sees_every_region() {
        #[derive(Default)]
        struct Counting {
            slices: AtomicUsize,
            surfaces: AtomicUsize,
        }
        impl Inspector for Counting {
            fn on_slices(&self, _region: &LayerRegion) {
                self.slices.fetch_add(1, Ordering::Relaxed);
            }
            fn on_fill_surfaces(&self, _region: &LayerRegion) {
                self.surfaces.fetch_add(1, Ordering::Relaxed);
            }
        }

        let counting = Arc::new(Counting::default());
        let config = RegionConfig::default();
        Pipeline::new(&config)
            .with_inspector(counting.clone())
            .run(&stack(4, &[make_square_mm(0.0, 0.0, 10.0)]))
            .unwrap();
        assert_eq!(counting.slices.load(Ordering::Relaxed), 4);
        assert_eq!(counting.surfaces.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn test_progress_reaches_end() {
        let config = RegionConfig::default();
        let mut seen = Vec::new();
        Pipeline::new(&config)
            .run_with_callback(&stack(2, &[make_square_mm(0.0, 0.0, 10.0)]), |stage, p| {
                seen.push((stage.to_string(), p))
            })
            .unwrap();
        assert_eq!(seen.len(), 5);
        assert!((seen.last().unwrap().1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_custom_filler_is_used() {
        #[derive(Debug)]
        struct Nothing;
        impl FillPattern for Nothing {
            fn name(&self) -> &'static str {
                "nothing"
            }
            fn fill_surface(&self, _surface: &Surface, params: &FillParams) -> FillOutput {
                FillOutput {
                    paths: Vec::new(),
                    flow_spacing: params.flow_spacing,
                }
            }
        }

        let config = RegionConfig::default();
        let layers = Pipeline::new(&config)
            .with_filler(Arc::new(Nothing))
            .with_infill(true)
            .run(&stack(2, &[make_square_mm(0.0, 0.0, 20.0)]))
            .unwrap();
        assert!(layers.iter().all(|l| l.regions()[0].fills.is_empty()));
        assert!(!layers[0].regions()[0].perimeters.is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RegionConfig::default().with_fill_density(2.0);
        assert!(matches!(
            Pipeline::new(&config).run(&[]),
            Err(Error::Config(_))
        ));
    }
}
