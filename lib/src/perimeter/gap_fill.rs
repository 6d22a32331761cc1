//! Gap fill between perimeters.

use crate::clipper::{difference, offset2, offset_polylines, shrink, OffsetJoinType};
use crate::config::RegionConfig;
use crate::extrusion::{ExtrusionEntity, ExtrusionEntityCollection, ExtrusionPath, ExtrusionRole};
use crate::flow::{Flow, RegionFlows};
use crate::geometry::{ExPolygon, ExPolygons, Polyline};
use crate::infill::{FillParams, FillPattern};
use crate::slice::Surface;
use crate::{scale, CoordF};
use log::debug;

/// Bead widths tried, as fractions of the perimeter width, widest first.
const GAP_WIDTHS: [CoordF; 2] = [1.0, 0.4];

/// What gap fill produced and the gap area it covered.
#[derive(Clone, Debug, Default)]
pub struct GapFillOutput {
    pub thin_fills: ExtrusionEntityCollection,
    /// Gap area claimed at any width.
    pub claimed: ExPolygons,
}

/// Fills perimeter gaps with zigzag paths at decreasing widths.
#[derive(Clone, Debug)]
pub struct GapFiller {
    /// Perimeter width (mm).
    perimeter_width: CoordF,
    /// Layer height (mm).
    layer_height: CoordF,
    /// Base fill direction (radians).
    fill_angle: CoordF,
    layer_id: usize,
}

impl GapFiller {
    pub fn new(config: &RegionConfig, flows: &RegionFlows, layer_id: usize) -> Self {
        Self {
            perimeter_width: flows.perimeter.width,
            layer_height: flows.perimeter.height,
            fill_angle: config.fill_angle.to_radians(),
            layer_id,
        }
    }

    /// Fill `gaps`, leaving out the area already covered by `thin_walls`.
    ///
    /// Whatever is still unclaimed after the narrowest width stays empty.
    pub fn fill(
        &self,
        gaps: &[ExPolygon],
        thin_walls: &[Polyline],
        filler: &dyn FillPattern,
    ) -> GapFillOutput {
        let mut output = GapFillOutput::default();
        if gaps.is_empty() {
            return output;
        }

        let mut remaining: ExPolygons = if thin_walls.is_empty() {
            gaps.to_vec()
        } else {
            let walls = offset_polylines(thin_walls, scale(self.perimeter_width) as CoordF);
            difference(gaps, &walls)
        };

        let mut paths = Vec::new();
        for factor in GAP_WIDTHS {
            if remaining.is_empty() {
                break;
            }
            let width = self.perimeter_width * factor;
            let spacing = Flow::rounded_rectangle_spacing(width, self.layer_height);
            if spacing <= 0.0 {
                debug!("gap fill width {:.3}mm too narrow for this layer height", width);
                continue;
            }

            let half = scale(width) as CoordF / 2.0;
            let this_width = offset2(&remaining, -half, half, OffsetJoinType::Miter);
            if this_width.is_empty() {
                continue;
            }

            let params = FillParams {
                density: 1.0,
                flow_spacing: scale(spacing),
                angle: self.fill_angle,
                layer_id: self.layer_id,
            };
            let tolerance = scale(width / 3.0);
            for ex in shrink(&this_width, half, OffsetJoinType::Miter) {
                let filled = filler.fill_surface(&Surface::internal_solid(ex), &params);
                paths.extend(
                    filled
                        .paths
                        .iter()
                        .map(|pl| pl.simplified(tolerance))
                        .filter(|pl| pl.is_valid())
                        .map(|pl| {
                            ExtrusionEntity::Path(ExtrusionPath::new(
                                pl,
                                ExtrusionRole::GapFill,
                                filled.flow_spacing,
                            ))
                        }),
                );
            }

            debug!(
                "gap fill at {:.3}mm: {} areas claimed",
                width,
                this_width.len()
            );
            remaining = difference(&remaining, &this_width);
            output.claimed.extend(this_width);
        }

        output.thin_fills = ExtrusionEntityCollection::new(paths).chained_path();
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipper::{grow, total_area};
    use crate::geometry::{Point, Polygon};
    use crate::infill::Rectilinear;
    use crate::scaled_area;

    fn strip_mm(length: CoordF, width: CoordF) -> ExPolygon {
        ExPolygon::new(Polygon::rectangle_mm(0.0, 0.0, length, width))
    }

    fn filler_for(config: &RegionConfig) -> GapFiller {
        let flows = RegionFlows::new(config, 0.2, false).unwrap();
        GapFiller::new(config, &flows, 0)
    }

    fn along_x() -> RegionConfig {
        RegionConfig {
            fill_angle: 0.0,
            ..RegionConfig::default()
        }
    }

    #[test]
    fn test_full_width_gap_becomes_centerline() {
        let out = filler_for(&along_x()).fill(&[strip_mm(10.0, 0.6)], &[], &Rectilinear);

        assert_eq!(out.thin_fills.len(), 1);
        let path = &out.thin_fills.entities[0];
        assert_eq!(path.role(), Some(ExtrusionRole::GapFill));
        let length = crate::unscale(path.length() as crate::Coord);
        assert!((length - 9.55).abs() < 0.05, "length = {}", length);
    }

    #[test]
    fn test_narrow_gap_uses_smaller_width() {
        // Too thin for a 0.45mm bead, wide enough for 0.18mm.
        let out = filler_for(&along_x()).fill(&[strip_mm(10.0, 0.3)], &[], &Rectilinear);
        assert!(!out.thin_fills.is_empty());
        let claimed = total_area(&out.claimed);
        assert!((claimed - scaled_area(3.0)).abs() < scaled_area(0.1));
    }

    #[test]
    fn test_claimed_within_gaps() {
        let gaps = vec![
            strip_mm(10.0, 0.6),
            ExPolygon::new(Polygon::rectangle_mm(0.0, 5.0, 8.0, 5.35)),
            ExPolygon::new(Polygon::rectangle_mm(0.0, 10.0, 3.0, 10.1)),
        ];
        let out = filler_for(&RegionConfig::default()).fill(&gaps, &[], &Rectilinear);
        assert!(!out.claimed.is_empty());

        let envelope = grow(&gaps, scale(0.001) as CoordF, OffsetJoinType::Miter);
        let outside = difference(&out.claimed, &envelope);
        assert!(total_area(&outside) < 1.0);
        assert!(total_area(&out.claimed) <= total_area(&gaps) + scaled_area(0.01));
    }

    #[test]
    fn test_thin_walls_remove_gap() {
        let wall = Polyline::from_points(vec![
            Point::new_scale(0.0, 0.3),
            Point::new_scale(10.0, 0.3),
        ]);
        let out = filler_for(&along_x()).fill(&[strip_mm(10.0, 0.6)], &[wall], &Rectilinear);
        assert!(out.thin_fills.is_empty());
        assert!(out.claimed.is_empty());
    }

    #[test]
    fn test_no_gaps_no_output() {
        let out = filler_for(&RegionConfig::default()).fill(&[], &[], &Rectilinear);
        assert!(out.thin_fills.is_empty());
        assert!(out.claimed.is_empty());
    }
}
