//! Surface types for layer regions.
//!
//! A [`Surface`] is an ExPolygon tagged with how it is going to be filled.
//! Surfaces are owned by exactly one layer region; every stage that changes
//! them builds a fresh list rather than editing the old one.
//!
//! # Surface Type Detection
//!
//! Surface types are detected by comparing the current layer's geometry with
//! adjacent layers:
//!
//! - **Top**: Areas of the current layer not covered by the layer above
//! - **Bottom**: Areas of the current layer not supported by the layer below
//! - **Internal**: Areas covered both above and below (get sparse infill)
//! - **InternalSolid**: Internal areas that must be filled solid

use crate::clipper::{difference, intersection, offset2, union, union_ex, OffsetJoinType};
use crate::geometry::{ExPolygon, ExPolygons};
use crate::{unscale, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a surface within a layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceType {
    /// Top surface (visible from above).
    Top,
    /// Bottom surface (visible from below, or first layer).
    Bottom,
    /// Internal surface that will receive sparse infill.
    #[default]
    Internal,
    /// Internal surface that must be filled solid.
    InternalSolid,
}

impl SurfaceType {
    /// Check if this surface type is top or bottom.
    #[inline]
    pub fn is_external(&self) -> bool {
        matches!(self, SurfaceType::Top | SurfaceType::Bottom)
    }

    /// Check if this surface type requires solid infill.
    #[inline]
    pub fn is_solid(&self) -> bool {
        !matches!(self, SurfaceType::Internal)
    }

    /// Get a human-readable name for this surface type.
    pub fn name(&self) -> &'static str {
        match self {
            SurfaceType::Top => "top",
            SurfaceType::Bottom => "bottom",
            SurfaceType::Internal => "internal",
            SurfaceType::InternalSolid => "internal solid",
        }
    }
}

impl fmt::Display for SurfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A classified region within a layer.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    /// The geometry of this surface.
    pub expolygon: ExPolygon,

    /// The type/classification of this surface.
    pub surface_type: SurfaceType,

    /// Bridge angle in radians, in [0, PI).
    /// None if not a bridge or no direction could be determined.
    pub bridge_angle: Option<CoordF>,

    /// Extra perimeters requested for this island on top of the configured count.
    pub extra_perimeters: usize,
}

impl Surface {
    /// Create a new surface with the given geometry and type.
    pub fn new(expolygon: ExPolygon, surface_type: SurfaceType) -> Self {
        Self {
            expolygon,
            surface_type,
            bridge_angle: None,
            extra_perimeters: 0,
        }
    }

    pub fn top(expolygon: ExPolygon) -> Self {
        Self::new(expolygon, SurfaceType::Top)
    }

    pub fn bottom(expolygon: ExPolygon) -> Self {
        Self::new(expolygon, SurfaceType::Bottom)
    }

    pub fn internal(expolygon: ExPolygon) -> Self {
        Self::new(expolygon, SurfaceType::Internal)
    }

    pub fn internal_solid(expolygon: ExPolygon) -> Self {
        Self::new(expolygon, SurfaceType::InternalSolid)
    }

    /// A copy of this surface's metadata with new geometry.
    pub fn with_expolygon(&self, expolygon: ExPolygon) -> Self {
        Self {
            expolygon,
            surface_type: self.surface_type,
            bridge_angle: self.bridge_angle,
            extra_perimeters: self.extra_perimeters,
        }
    }

    /// Get the area of this surface (scaled²).
    #[inline]
    pub fn area(&self) -> CoordF {
        self.expolygon.area()
    }

    #[inline]
    pub fn is_top(&self) -> bool {
        self.surface_type == SurfaceType::Top
    }

    #[inline]
    pub fn is_bottom(&self) -> bool {
        self.surface_type == SurfaceType::Bottom
    }

    /// Metadata identity used to group surfaces that may be merged.
    fn group_key(&self) -> (SurfaceType, Option<u64>, usize) {
        (
            self.surface_type,
            self.bridge_angle.map(f64::to_bits),
            self.extra_perimeters,
        )
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Surface({:?}, area={:.2}mm²",
            self.surface_type,
            self.area() * unscale(1) * unscale(1)
        )?;
        if let Some(angle) = self.bridge_angle {
            write!(f, ", bridge={:.1}°", angle.to_degrees())?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} surface (area={:.2}mm²)",
            self.surface_type,
            self.area() * unscale(1) * unscale(1)
        )
    }
}

/// Type alias for a collection of surfaces.
pub type Surfaces = Vec<Surface>;

/// Geometry of a list of surfaces.
pub fn surfaces_to_expolygons(surfaces: &[Surface]) -> ExPolygons {
    surfaces.iter().map(|s| s.expolygon.clone()).collect()
}

/// Group surfaces that share type, bridge angle and extra perimeters.
///
/// Groups come out in order of first appearance so results are reproducible.
pub fn group_surfaces(surfaces: &[Surface]) -> Vec<Vec<&Surface>> {
    let mut groups: Vec<Vec<&Surface>> = Vec::new();
    for surface in surfaces {
        match groups
            .iter_mut()
            .find(|g| g[0].group_key() == surface.group_key())
        {
            Some(group) => group.push(surface),
            None => groups.push(vec![surface]),
        }
    }
    groups
}

/// Detect surface types for a layer by comparing with adjacent layers.
///
/// * `current_slices` - the merged slices of this layer
/// * `lower_slices` - slices of the layer below, `None` on the first layer
/// * `upper_slices` - slices of the layer above, `None` on the last layer
/// * `offset` - opening distance that removes boolean noise (scaled)
///
/// Areas that are both top and bottom (single-layer membranes) are bottom, so
/// they still get bridge detection.
pub fn detect_surface_types(
    current_slices: &[ExPolygon],
    lower_slices: Option<&[ExPolygon]>,
    upper_slices: Option<&[ExPolygon]>,
    offset: CoordF,
) -> Vec<Surface> {
    if current_slices.is_empty() {
        return Vec::new();
    }

    let open = |ex: ExPolygons| -> ExPolygons {
        if offset > 0.0 {
            offset2(&ex, -offset, offset, OffsetJoinType::Miter)
        } else {
            ex
        }
    };

    let bottom = match lower_slices {
        Some(lower) => open(difference(current_slices, lower)),
        None => union_ex(current_slices),
    };
    let top = match upper_slices {
        Some(upper) => open(difference(current_slices, upper)),
        None => union_ex(current_slices),
    };
    let top = difference(&top, &bottom);
    let internal = difference(current_slices, &union(&top, &bottom));

    let mut surfaces = Vec::with_capacity(top.len() + bottom.len() + internal.len());
    surfaces.extend(bottom.into_iter().map(Surface::bottom));
    surfaces.extend(top.into_iter().map(Surface::top));
    surfaces.extend(internal.into_iter().map(Surface::internal));
    surfaces
}

/// Carry detected types over to fill surfaces.
///
/// Each fill surface is cut by every typed part and the pieces take that
/// part's type. Extra perimeter counts stay with the fill surface they came
/// from.
pub fn apply_surface_types(fill_surfaces: &[Surface], typed: &[Surface]) -> Vec<Surface> {
    let mut out = Vec::new();
    for group in group_surfaces(typed) {
        let kind = group[0].surface_type;
        let parts: ExPolygons = group.iter().map(|s| s.expolygon.clone()).collect();
        for fill in fill_surfaces {
            for ex in intersection(std::slice::from_ref(&fill.expolygon), &parts) {
                let mut surface = fill.with_expolygon(ex);
                surface.surface_type = kind;
                out.push(surface);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;
    use crate::scaled_area;

    fn make_square_mm(x: CoordF, y: CoordF, size: CoordF) -> ExPolygon {
        ExPolygon::new(Polygon::rectangle_mm(x, y, x + size, y + size))
    }

    fn area_of(surfaces: &[Surface], t: SurfaceType) -> CoordF {
        surfaces
            .iter()
            .filter(|s| s.surface_type == t)
            .map(|s| s.area())
            .sum()
    }

    #[test]
    fn test_surface_type_flags() {
        assert!(SurfaceType::Top.is_external());
        assert!(SurfaceType::InternalSolid.is_solid());
        assert!(!SurfaceType::Internal.is_solid());
        assert_eq!(SurfaceType::default(), SurfaceType::Internal);
    }

    #[test]
    fn test_with_expolygon_keeps_metadata() {
        let mut s = Surface::bottom(make_square_mm(0.0, 0.0, 1.0));
        s.bridge_angle = Some(1.0);
        s.extra_perimeters = 2;
        let t = s.with_expolygon(make_square_mm(5.0, 5.0, 1.0));
        assert_eq!(t.surface_type, SurfaceType::Bottom);
        assert_eq!(t.bridge_angle, Some(1.0));
        assert_eq!(t.extra_perimeters, 2);
    }

    #[test]
    fn test_group_surfaces() {
        let a = Surface::internal(make_square_mm(0.0, 0.0, 1.0));
        let b = Surface::top(make_square_mm(2.0, 0.0, 1.0));
        let c = Surface::internal(make_square_mm(4.0, 0.0, 1.0));
        let surfaces = vec![a, b, c];
        let groups = group_surfaces(&surfaces);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1][0].surface_type, SurfaceType::Top);
    }

    #[test]
    fn test_detect_first_layer_is_bottom() {
        let current = vec![make_square_mm(0.0, 0.0, 10.0)];
        let upper = vec![make_square_mm(0.0, 0.0, 10.0)];
        let surfaces = detect_surface_types(&current, None, Some(&upper), 0.0);
        assert_eq!(surfaces.len(), 1);
        assert_eq!(surfaces[0].surface_type, SurfaceType::Bottom);
    }

    #[test]
    fn test_detect_top_and_internal() {
        let current = vec![make_square_mm(0.0, 0.0, 10.0)];
        let lower = vec![make_square_mm(0.0, 0.0, 10.0)];
        let upper = vec![make_square_mm(0.0, 0.0, 5.0)];
        let surfaces = detect_surface_types(&current, Some(&lower), Some(&upper), 0.0);

        let top = area_of(&surfaces, SurfaceType::Top);
        let internal = area_of(&surfaces, SurfaceType::Internal);
        assert!((top - scaled_area(75.0)).abs() < scaled_area(0.75));
        assert!((internal - scaled_area(25.0)).abs() < scaled_area(0.25));
        assert_eq!(area_of(&surfaces, SurfaceType::Bottom), 0.0);
    }

    #[test]
    fn test_detect_overhang_is_bottom() {
        let current = vec![make_square_mm(0.0, 0.0, 10.0)];
        let lower = vec![make_square_mm(0.0, 0.0, 6.0)];
        let upper = vec![make_square_mm(0.0, 0.0, 10.0)];
        let surfaces = detect_surface_types(&current, Some(&lower), Some(&upper), 0.0);
        let bottom = area_of(&surfaces, SurfaceType::Bottom);
        assert!((bottom - scaled_area(64.0)).abs() < scaled_area(0.64));
    }

    #[test]
    fn test_apply_surface_types_splits_fill() {
        let typed = vec![
            Surface::top(ExPolygon::new(Polygon::rectangle_mm(0.0, 0.0, 5.0, 10.0))),
            Surface::internal(ExPolygon::new(Polygon::rectangle_mm(5.0, 0.0, 10.0, 10.0))),
        ];
        let mut fill = Surface::internal(ExPolygon::new(Polygon::rectangle_mm(1.0, 1.0, 9.0, 9.0)));
        fill.extra_perimeters = 1;

        let out = apply_surface_types(&[fill], &typed);
        assert_eq!(out.len(), 2);
        let top = area_of(&out, SurfaceType::Top);
        assert!((top - scaled_area(32.0)).abs() < scaled_area(0.32));
        assert!(out.iter().all(|s| s.extra_perimeters == 1));
    }
}
