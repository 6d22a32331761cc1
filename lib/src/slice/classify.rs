//! Fill surface classification and external surface expansion.

use super::surface::{group_surfaces, surfaces_to_expolygons, Surface, SurfaceType};
use crate::bridge::BridgeDetector;
use crate::clipper::{difference, grow, intersection, offset2, union_ex, OffsetJoinType};
use crate::config::RegionConfig;
use crate::geometry::{ExPolygon, ExPolygons};
use crate::{scale, scaled_area, CoordF, SCALED_EPSILON};
use log::debug;

/// Reassigns fill surface types from the solid layer counts and the
/// small-area threshold. Geometry is left untouched.
#[derive(Clone, Debug)]
pub struct SurfaceClassifier {
    top_solid_layers: usize,
    bottom_solid_layers: usize,
    fill_density: CoordF,
    /// Contour area at or below which internal surfaces go solid (scaled²).
    solid_area_threshold: CoordF,
}

impl SurfaceClassifier {
    pub fn new(config: &RegionConfig) -> Self {
        Self {
            top_solid_layers: config.top_solid_layers,
            bottom_solid_layers: config.bottom_solid_layers,
            fill_density: config.fill_density,
            solid_area_threshold: scaled_area(config.solid_infill_below_area),
        }
    }

    pub fn classify(&self, surfaces: &[Surface]) -> Vec<Surface> {
        surfaces
            .iter()
            .map(|surface| {
                let mut s = surface.clone();
                s.surface_type = self.classify_one(surface);
                s
            })
            .collect()
    }

    fn classify_one(&self, surface: &Surface) -> SurfaceType {
        let mut kind = surface.surface_type;
        if kind == SurfaceType::Top && self.top_solid_layers == 0 {
            kind = SurfaceType::Internal;
        }
        if kind == SurfaceType::Bottom && self.bottom_solid_layers == 0 {
            kind = SurfaceType::Internal;
        }
        if kind == SurfaceType::Internal
            && self.fill_density > 0.0
            && surface.expolygon.contour.area().abs() <= self.solid_area_threshold
        {
            kind = SurfaceType::InternalSolid;
        }
        kind
    }
}

/// Grows top and bottom surfaces into the neighbouring fill area, then
/// assigns bridge directions to bottom surfaces.
#[derive(Clone, Debug)]
pub struct ExternalSurfaceProcessor {
    /// Distance the surfaces grow (scaled).
    margin: CoordF,
    fill_density: CoordF,
    bridges: BridgeDetector,
}

impl ExternalSurfaceProcessor {
    pub fn new(config: &RegionConfig, bridges: BridgeDetector) -> Self {
        Self {
            margin: scale(config.external_surface_margin) as CoordF,
            fill_density: config.fill_density,
            bridges,
        }
    }

    /// Rebuild `fill_surfaces` with expanded external surfaces.
    ///
    /// `lower_slices` are the merged slices of the layer below; pass `None`
    /// on the first layer, where bridge detection is skipped.
    pub fn process(
        &self,
        fill_surfaces: &[Surface],
        lower_slices: Option<&[ExPolygon]>,
    ) -> Vec<Surface> {
        let mut new_surfaces = self.expand(fill_surfaces);

        if let Some(lower) = lower_slices {
            for surface in new_surfaces.iter_mut().filter(|s| s.is_bottom()) {
                surface.bridge_angle = self.bridges.detect(&surface.expolygon, lower);
            }
        }
        new_surfaces
    }

    fn expand(&self, fill_surfaces: &[Surface]) -> Vec<Surface> {
        let grown = |surfaces: &[&Surface]| -> Vec<Surface> {
            surfaces
                .iter()
                .flat_map(|s| {
                    grow(std::slice::from_ref(&s.expolygon), self.margin, OffsetJoinType::Miter)
                        .into_iter()
                        .map(|ex| s.with_expolygon(ex))
                })
                .collect()
        };

        let bottom_src: Vec<&Surface> = fill_surfaces.iter().filter(|s| s.is_bottom()).collect();
        let top_src: Vec<&Surface> = fill_surfaces.iter().filter(|s| s.is_top()).collect();
        if bottom_src.is_empty() && top_src.is_empty() {
            return fill_surfaces.to_vec();
        }

        let bottom = grown(bottom_src.as_slice());
        let bottom_area = surfaces_to_expolygons(&bottom);
        let top: Vec<Surface> = grown(top_src.as_slice())
            .into_iter()
            .flat_map(|s| {
                difference(std::slice::from_ref(&s.expolygon), &bottom_area)
                    .into_iter()
                    .map(move |ex| s.with_expolygon(ex))
                    .collect::<Vec<_>>()
            })
            .collect();

        // Without sparse infill there is nothing to extend over.
        let boundaries: ExPolygons = union_ex(
            &fill_surfaces
                .iter()
                .filter(|s| self.fill_density > 0.0 || s.surface_type != SurfaceType::Internal)
                .map(|s| s.expolygon.clone())
                .collect::<Vec<_>>(),
        );

        let mut external = top;
        external.extend(bottom);
        let mut new_surfaces = Vec::new();
        for group in group_surfaces(&external) {
            let area: ExPolygons = group.iter().map(|s| s.expolygon.clone()).collect();
            // Close hairline seams so adjacent pieces come out as one island.
            let eps = SCALED_EPSILON as CoordF;
            let merged = offset2(&area, eps, -eps, OffsetJoinType::Miter);
            new_surfaces.extend(
                intersection(&merged, &boundaries)
                    .into_iter()
                    .map(|ex| group[0].with_expolygon(ex)),
            );
        }

        let footprint = surfaces_to_expolygons(&new_surfaces);
        let others: Vec<Surface> = fill_surfaces
            .iter()
            .filter(|s| !s.surface_type.is_external())
            .cloned()
            .collect();
        let mut recut = Vec::new();
        for group in group_surfaces(&others) {
            let area: ExPolygons = group.iter().map(|s| s.expolygon.clone()).collect();
            recut.extend(
                difference(&area, &footprint)
                    .into_iter()
                    .map(|ex| group[0].with_expolygon(ex)),
            );
        }

        debug!(
            "external surfaces: {} top/bottom, {} others",
            new_surfaces.len(),
            recut.len()
        );
        new_surfaces.extend(recut);
        new_surfaces
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;

    fn make_square_mm(x: CoordF, y: CoordF, size: CoordF) -> ExPolygon {
        ExPolygon::new(Polygon::rectangle_mm(x, y, x + size, y + size))
    }

    fn rect_mm(x0: CoordF, y0: CoordF, x1: CoordF, y1: CoordF) -> ExPolygon {
        ExPolygon::new(Polygon::rectangle_mm(x0, y0, x1, y1))
    }

    fn area_of(surfaces: &[Surface], t: SurfaceType) -> CoordF {
        surfaces
            .iter()
            .filter(|s| s.surface_type == t)
            .map(|s| s.area())
            .sum()
    }

    fn processor(config: &RegionConfig) -> ExternalSurfaceProcessor {
        ExternalSurfaceProcessor::new(config, BridgeDetector::new(scale(0.45), scale(0.45)))
    }

    #[test]
    fn test_small_internal_becomes_solid() {
        let config = RegionConfig::default().with_solid_infill_below_area(5.0);
        let classifier = SurfaceClassifier::new(&config);
        let out = classifier.classify(&[
            Surface::internal(make_square_mm(0.0, 0.0, 2.0)),
            Surface::internal(rect_mm(10.0, 0.0, 13.0, 2.0)),
        ]);
        assert_eq!(out[0].surface_type, SurfaceType::InternalSolid);
        assert_eq!(out[1].surface_type, SurfaceType::Internal);
    }

    #[test]
    fn test_threshold_ignored_without_infill() {
        let config = RegionConfig::default()
            .with_solid_infill_below_area(5.0)
            .with_fill_density(0.0);
        let out = SurfaceClassifier::new(&config)
            .classify(&[Surface::internal(make_square_mm(0.0, 0.0, 2.0))]);
        assert_eq!(out[0].surface_type, SurfaceType::Internal);
    }

    #[test]
    fn test_zero_solid_layers_demote_external() {
        let config = RegionConfig::default()
            .with_solid_layers(0, 0)
            .with_solid_infill_below_area(0.0);
        let out = SurfaceClassifier::new(&config).classify(&[
            Surface::top(make_square_mm(0.0, 0.0, 10.0)),
            Surface::bottom(make_square_mm(20.0, 0.0, 10.0)),
        ]);
        assert!(out.iter().all(|s| s.surface_type == SurfaceType::Internal));
    }

    #[test]
    fn test_top_keeps_type_with_solid_layers() {
        let config = RegionConfig::default().with_solid_infill_below_area(0.0);
        let out = SurfaceClassifier::new(&config)
            .classify(&[Surface::top(make_square_mm(0.0, 0.0, 1.0))]);
        assert_eq!(out[0].surface_type, SurfaceType::Top);
    }

    #[test]
    fn test_top_grows_into_internal() {
        let config = RegionConfig::default();
        let fill = vec![
            Surface::top(rect_mm(0.0, 0.0, 10.0, 10.0)),
            Surface::internal(rect_mm(10.0, 0.0, 20.0, 10.0)),
        ];
        let out = processor(&config).process(&fill, None);

        let top = area_of(&out, SurfaceType::Top);
        let internal = area_of(&out, SurfaceType::Internal);
        // 3mm margin reaches 3mm into the internal half.
        assert!((top - scaled_area(130.0)).abs() < scaled_area(1.3));
        assert!((internal - scaled_area(70.0)).abs() < scaled_area(0.7));
    }

    #[test]
    fn test_bottom_wins_over_top() {
        let config = RegionConfig::default();
        let fill = vec![
            Surface::top(rect_mm(0.0, 0.0, 10.0, 10.0)),
            Surface::bottom(rect_mm(10.0, 0.0, 20.0, 10.0)),
        ];
        let out = processor(&config).process(&fill, None);
        let top = area_of(&out, SurfaceType::Top);
        let bottom = area_of(&out, SurfaceType::Bottom);
        assert!((bottom - scaled_area(130.0)).abs() < scaled_area(1.3));
        assert!((top - scaled_area(70.0)).abs() < scaled_area(0.7));
    }

    #[test]
    fn test_no_expansion_over_missing_infill() {
        let config = RegionConfig::default().with_fill_density(0.0);
        let fill = vec![
            Surface::top(rect_mm(0.0, 0.0, 10.0, 10.0)),
            Surface::internal(rect_mm(10.0, 0.0, 20.0, 10.0)),
        ];
        let out = processor(&config).process(&fill, None);
        let top = area_of(&out, SurfaceType::Top);
        assert!((top - scaled_area(100.0)).abs() < scaled_area(1.0));
    }

    #[test]
    fn test_bridge_angle_assigned_over_lower_layer() {
        let config = RegionConfig::default().with_fill_density(0.0);
        let fill = vec![Surface::bottom(rect_mm(0.0, 0.0, 20.0, 10.0))];
        let lower = vec![rect_mm(0.0, -5.0, 20.0, 0.0), rect_mm(0.0, 10.0, 20.0, 15.0)];

        let out = processor(&config).process(&fill, Some(&lower));
        assert_eq!(out.len(), 1);
        let angle = out[0].bridge_angle.unwrap();
        assert!((angle - std::f64::consts::FRAC_PI_2).abs() < 1e-3);

        let first_layer = processor(&config).process(&fill, None);
        assert!(first_layer[0].bridge_angle.is_none());
    }
}
