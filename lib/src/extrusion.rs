//! Extrusion entities produced by the layer pipeline.
//!
//! Perimeters come out as closed [`ExtrusionLoop`]s, thin walls and gap fill
//! as open [`ExtrusionPath`]s. Both carry the role they were generated for and
//! the scaled flow spacing used to produce them, which is everything toolpath
//! emission needs to turn them into motion.

use crate::geometry::{chain_endpoints, Point, Polygon, Polyline};
use crate::{Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of extrusion for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtrusionRole {
    /// Internal perimeter.
    Perimeter,
    /// External (outer) perimeter, including thin walls.
    ExternalPerimeter,
    /// The loop right inside the external perimeter of a contour.
    ContourInternalPerimeter,
    /// Gap fill (thin areas between perimeters).
    GapFill,
    /// Sparse infill.
    Infill,
    /// Solid infill.
    SolidFill,
}

impl ExtrusionRole {
    /// Check if this role is a perimeter.
    pub fn is_perimeter(&self) -> bool {
        matches!(
            self,
            ExtrusionRole::Perimeter
                | ExtrusionRole::ExternalPerimeter
                | ExtrusionRole::ContourInternalPerimeter
        )
    }

    /// Get a descriptive name for this role.
    pub fn name(&self) -> &'static str {
        match self {
            ExtrusionRole::Perimeter => "perimeter",
            ExtrusionRole::ExternalPerimeter => "external perimeter",
            ExtrusionRole::ContourInternalPerimeter => "contour internal perimeter",
            ExtrusionRole::GapFill => "gap fill",
            ExtrusionRole::Infill => "infill",
            ExtrusionRole::SolidFill => "solid fill",
        }
    }
}

impl fmt::Display for ExtrusionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An open extrusion path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtrusionPath {
    pub polyline: Polyline,
    pub role: ExtrusionRole,
    /// Flow spacing used to produce this path (scaled).
    pub flow_spacing: Coord,
}

impl ExtrusionPath {
    pub fn new(polyline: Polyline, role: ExtrusionRole, flow_spacing: Coord) -> Self {
        Self {
            polyline,
            role,
            flow_spacing,
        }
    }

    #[inline]
    pub fn length(&self) -> CoordF {
        self.polyline.length()
    }

    #[inline]
    pub fn first_point(&self) -> Point {
        self.polyline.first_point()
    }

    #[inline]
    pub fn last_point(&self) -> Point {
        self.polyline.last_point()
    }
}

/// A closed extrusion loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtrusionLoop {
    pub polygon: Polygon,
    pub role: ExtrusionRole,
    /// Flow spacing used to produce this loop (scaled).
    pub flow_spacing: Coord,
}

impl ExtrusionLoop {
    pub fn new(polygon: Polygon, role: ExtrusionRole, flow_spacing: Coord) -> Self {
        Self {
            polygon,
            role,
            flow_spacing,
        }
    }

    #[inline]
    pub fn length(&self) -> CoordF {
        self.polygon.perimeter()
    }

    /// True for loops around a contour, false for loops around a hole.
    #[inline]
    pub fn is_contour(&self) -> bool {
        self.polygon.is_counter_clockwise()
    }
}

/// An ordered group of extrusions that should be printed together.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtrusionEntityCollection {
    pub entities: Vec<ExtrusionEntity>,
}

impl ExtrusionEntityCollection {
    pub fn new(entities: Vec<ExtrusionEntity>) -> Self {
        Self { entities }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Reorder open paths by nearest-neighbour chaining, reversing them where
    /// that shortens travel. Loops and nested collections keep their place
    /// after the chained paths.
    pub fn chained_path(self) -> Self {
        let mut paths = Vec::new();
        let mut others = Vec::new();
        for entity in self.entities {
            match entity {
                ExtrusionEntity::Path(p) if p.polyline.is_empty() => {}
                ExtrusionEntity::Path(p) => paths.push(p),
                other => others.push(other),
            }
        }
        let ends: Vec<(Point, Point)> = paths
            .iter()
            .map(|p| (p.first_point(), p.last_point()))
            .collect();
        let order = chain_endpoints(&ends, None);
        let mut slots: Vec<Option<ExtrusionPath>> = paths.into_iter().map(Some).collect();
        let mut entities: Vec<ExtrusionEntity> = order
            .into_iter()
            .filter_map(|(i, rev)| {
                let mut path = slots[i].take()?;
                if rev {
                    path.polyline.reverse();
                }
                Some(ExtrusionEntity::Path(path))
            })
            .collect();
        entities.extend(others);
        Self { entities }
    }

    /// All loops and paths in order, flattening nested collections.
    pub fn flatten(&self) -> Vec<&ExtrusionEntity> {
        let mut out = Vec::new();
        for e in &self.entities {
            match e {
                ExtrusionEntity::Collection(c) => out.extend(c.flatten()),
                other => out.push(other),
            }
        }
        out
    }
}

/// A printable unit: a loop, an open path or an ordered group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ExtrusionEntity {
    Loop(ExtrusionLoop),
    Path(ExtrusionPath),
    Collection(ExtrusionEntityCollection),
}

impl ExtrusionEntity {
    /// Role of a loop or path; `None` for collections.
    pub fn role(&self) -> Option<ExtrusionRole> {
        match self {
            ExtrusionEntity::Loop(l) => Some(l.role),
            ExtrusionEntity::Path(p) => Some(p.role),
            ExtrusionEntity::Collection(_) => None,
        }
    }

    /// Total extruded length in scaled units.
    pub fn length(&self) -> CoordF {
        match self {
            ExtrusionEntity::Loop(l) => l.length(),
            ExtrusionEntity::Path(p) => p.length(),
            ExtrusionEntity::Collection(c) => c.entities.iter().map(|e| e.length()).sum(),
        }
    }

    pub fn as_loop(&self) -> Option<&ExtrusionLoop> {
        match self {
            ExtrusionEntity::Loop(l) => Some(l),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_is_perimeter() {
        assert!(ExtrusionRole::ContourInternalPerimeter.is_perimeter());
        assert!(ExtrusionRole::ExternalPerimeter.is_perimeter());
        assert!(!ExtrusionRole::GapFill.is_perimeter());
    }

    #[test]
    fn test_chained_path_keeps_roles() {
        let a = ExtrusionPath::new(
            Polyline::from_points(vec![Point::new(0, 0), Point::new(100, 0)]),
            ExtrusionRole::ExternalPerimeter,
            7,
        );
        let b = ExtrusionPath::new(
            Polyline::from_points(vec![Point::new(500, 0), Point::new(110, 0)]),
            ExtrusionRole::GapFill,
            9,
        );
        let coll = ExtrusionEntityCollection::new(vec![
            ExtrusionEntity::Path(a),
            ExtrusionEntity::Path(b),
        ])
        .chained_path();

        assert_eq!(coll.len(), 2);
        let ExtrusionEntity::Path(second) = &coll.entities[1] else {
            panic!("expected a path");
        };
        assert_eq!(second.role, ExtrusionRole::GapFill);
        assert_eq!(second.flow_spacing, 9);
        assert_eq!(second.first_point(), Point::new(110, 0));
    }

    #[test]
    fn test_loop_length_and_side() {
        let l = ExtrusionLoop::new(
            Polygon::rectangle(Point::new(0, 0), Point::new(10, 10)),
            ExtrusionRole::Perimeter,
            1,
        );
        assert!((l.length() - 40.0).abs() < 1e-9);
        assert!(l.is_contour());
    }
}
