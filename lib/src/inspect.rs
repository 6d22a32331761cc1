//! Optional inspection hooks for the layer pipeline.
//!
//! The pipeline calls an [`Inspector`] after each per-region stage. The
//! default callbacks do nothing; [`SvgInspector`] renders every call to an SVG
//! file so a run can be examined stage by stage.

use crate::extrusion::{ExtrusionEntity, ExtrusionEntityCollection, ExtrusionRole};
use crate::geometry::{BoundingBox, ExPolygon, Point};
use crate::slice::{LayerRegion, SurfaceType};
use crate::{unscale, Result, Stage};
use log::{trace, warn};
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Receives the state of a layer region after pipeline stages.
///
/// Callbacks run on the worker threads, so implementations must be
/// thread-safe.
pub trait Inspector: Send + Sync {
    /// Islands and thin walls after loop merging.
    fn on_slices(&self, _region: &LayerRegion) {}

    /// Perimeters and the fill boundary after perimeter generation.
    fn on_perimeters(&self, _region: &LayerRegion) {}

    /// Gap fill paths.
    fn on_gap_fill(&self, _region: &LayerRegion) {}

    /// Fill surfaces after classification and expansion.
    fn on_fill_surfaces(&self, _region: &LayerRegion) {}
}

/// Inspector that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInspector;

impl Inspector for NoInspector {}

/// Writes one SVG per (layer, region, stage) into a directory.
#[derive(Debug, Clone)]
pub struct SvgInspector {
    dir: PathBuf,
}

impl SvgInspector {
    /// Create the inspector, creating `dir` if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn file_name(region: &LayerRegion, stage: Stage) -> String {
        format!(
            "layer{:04}_region{}_{}.svg",
            region.layer_id,
            region.region_id,
            stage.name().replace(' ', "-")
        )
    }

    fn write(&self, region: &LayerRegion, stage: Stage) {
        let path = self.dir.join(Self::file_name(region, stage));
        let svg = render_region(region, stage);
        match std::fs::write(&path, svg) {
            Ok(()) => trace!("wrote {}", path.display()),
            Err(e) => warn!("failed to write {}: {}", path.display(), e),
        }
    }
}

impl Inspector for SvgInspector {
    fn on_slices(&self, region: &LayerRegion) {
        self.write(region, Stage::LoopMerge);
    }

    fn on_perimeters(&self, region: &LayerRegion) {
        self.write(region, Stage::Perimeters);
    }

    fn on_gap_fill(&self, region: &LayerRegion) {
        self.write(region, Stage::GapFill);
    }

    fn on_fill_surfaces(&self, region: &LayerRegion) {
        self.write(region, Stage::ExternalSurfaces);
    }
}

/// Padding around the drawing (mm).
const MARGIN: f64 = 2.0;

fn surface_color(surface_type: SurfaceType) -> &'static str {
    match surface_type {
        SurfaceType::Top => "#e07a5f",
        SurfaceType::Bottom => "#3d85c6",
        SurfaceType::Internal => "#f2cc8f",
        SurfaceType::InternalSolid => "#81b29a",
    }
}

fn role_color(role: ExtrusionRole) -> &'static str {
    match role {
        ExtrusionRole::ExternalPerimeter => "#c0392b",
        ExtrusionRole::ContourInternalPerimeter => "#e67e22",
        ExtrusionRole::Perimeter => "#f1c40f",
        ExtrusionRole::GapFill => "#8e44ad",
        ExtrusionRole::Infill => "#7f8c8d",
        ExtrusionRole::SolidFill => "#2c3e50",
    }
}

fn ring_path(points: &[Point], closed: bool, out: &mut String) {
    for (i, p) in points.iter().enumerate() {
        let cmd = if i == 0 { 'M' } else { 'L' };
        let _ = write!(out, "{} {:.4} {:.4} ", cmd, unscale(p.x), unscale(p.y));
    }
    if closed {
        out.push_str("Z ");
    }
}

fn expolygon_path(ex: &ExPolygon) -> String {
    let mut d = String::new();
    ring_path(ex.contour.points(), true, &mut d);
    for hole in &ex.holes {
        ring_path(hole.points(), true, &mut d);
    }
    d
}

fn draw_entities(collection: &ExtrusionEntityCollection, svg: &mut String) {
    for entity in &collection.entities {
        let (d, role) = match entity {
            ExtrusionEntity::Loop(l) => {
                let mut d = String::new();
                ring_path(l.polygon.points(), true, &mut d);
                (d, l.role)
            }
            ExtrusionEntity::Path(p) => {
                let mut d = String::new();
                ring_path(p.polyline.points(), false, &mut d);
                (d, p.role)
            }
            ExtrusionEntity::Collection(c) => {
                draw_entities(c, svg);
                continue;
            }
        };
        let _ = writeln!(
            svg,
            r#"    <path d="{}" fill="none" stroke="{}" stroke-width="0.1"/>"#,
            d.trim_end(),
            role_color(role)
        );
    }
}

/// Render a layer region as a standalone SVG document (millimetre units).
pub fn render_region(region: &LayerRegion, stage: Stage) -> String {
    let mut bb = BoundingBox::new();
    for s in region.slices.iter().chain(&region.fill_surfaces) {
        bb.merge(&s.expolygon.bounding_box());
    }
    let (min_x, min_y, width, height) = if bb.is_empty() {
        (0.0, 0.0, 1.0, 1.0)
    } else {
        (
            unscale(bb.min.x) - MARGIN,
            unscale(bb.min.y) - MARGIN,
            unscale(bb.width()) + 2.0 * MARGIN,
            unscale(bb.height()) + 2.0 * MARGIN,
        )
    };

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{:.0}mm" height="{:.0}mm" viewBox="{:.4} {:.4} {:.4} {:.4}">"#,
        width, height, min_x, min_y, width, height
    );
    let _ = writeln!(
        svg,
        "  <title>layer {} region {}: {}</title>",
        region.layer_id, region.region_id, stage
    );
    // Flip Y so the drawing matches print coordinates.
    let _ = writeln!(
        svg,
        r#"  <g transform="translate(0 {:.4}) scale(1 -1)">"#,
        2.0 * min_y + height
    );

    for s in &region.slices {
        let _ = writeln!(
            svg,
            r##"    <path d="{}" fill="#dddddd" fill-rule="evenodd" stroke="#999999" stroke-width="0.05"/>"##,
            expolygon_path(&s.expolygon).trim_end()
        );
    }
    for s in &region.fill_surfaces {
        let _ = writeln!(
            svg,
            r#"    <path d="{}" fill="{}" fill-opacity="0.6" fill-rule="evenodd"/>"#,
            expolygon_path(&s.expolygon).trim_end(),
            surface_color(s.surface_type)
        );
    }
    for wall in &region.thin_walls {
        let mut d = String::new();
        ring_path(wall.points(), false, &mut d);
        let _ = writeln!(
            svg,
            r##"    <path d="{}" fill="none" stroke="#16a085" stroke-width="0.1"/>"##,
            d.trim_end()
        );
    }
    draw_entities(&region.perimeters, &mut svg);
    draw_entities(&region.thin_fills, &mut svg);
    draw_entities(&region.fills, &mut svg);

    svg.push_str("  </g>\n</svg>\n");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;
    use crate::slice::Surface;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn region_with_square() -> LayerRegion {
        let mut region = LayerRegion::new(3, 1);
        let ex = ExPolygon::new(Polygon::rectangle_mm(0.0, 0.0, 10.0, 10.0));
        region.slices.push(Surface::internal(ex.clone()));
        region.fill_surfaces.push(Surface::top(ex));
        region
    }

    #[test]
    fn test_render_region() {
        let svg = render_region(&region_with_square(), Stage::Perimeters);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("layer 3 region 1: perimeters"));
        assert!(svg.contains(surface_color(SurfaceType::Top)));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_render_empty_region() {
        let svg = render_region(&LayerRegion::new(0, 0), Stage::LoopMerge);
        assert!(svg.contains("viewBox"));
    }

    #[test]
    fn test_file_name() {
        let name = SvgInspector::file_name(&region_with_square(), Stage::GapFill);
        assert_eq!(name, "layer0003_region1_gap-fill.svg");
    }

    #[test]
    fn test_default_callbacks_are_optional() {
        struct Counting(AtomicUsize);
        impl Inspector for Counting {
            fn on_perimeters(&self, _region: &LayerRegion) {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }
        let inspector = Counting(AtomicUsize::new(0));
        let region = region_with_square();
        inspector.on_slices(&region);
        inspector.on_perimeters(&region);
        inspector.on_gap_fill(&region);
        assert_eq!(inspector.0.load(Ordering::Relaxed), 1);
    }
}
