//! Geometry primitives for the layer pipeline.
//!
//! This module provides the fundamental geometric types:
//! - [`Point`] - 2D point with integer coordinates (scaled)
//! - [`PointF`] - 2D point with floating-point coordinates
//! - [`Line`] - Line segment between two points
//! - [`Polygon`] - Closed polygon (CCW = contour, CW = hole)
//! - [`Polyline`] - Open polyline (path)
//! - [`ExPolygon`] - Polygon with holes (exterior + interior contours)
//! - [`BoundingBox`] - Axis-aligned bounding box
//!
//! plus the structural helpers the pipeline is built on: containment trees,
//! nearest-neighbour chaining, simplification and the medial axis.
//!
//! ## Coordinate System
//!
//! Coordinates are scaled by `SCALING_FACTOR` (1,000,000), so 1 unit = 1 nanometer.
//!
//! - Use `scale()` to convert from mm to internal units
//! - Use `unscale()` to convert from internal units to mm

mod bounding_box;
pub mod chain;
pub mod containment;
mod expolygon;
mod line;
pub mod medial_axis;
mod point;
mod polygon;
mod polyline;
pub mod simplify;

pub use bounding_box::BoundingBox;
pub use chain::{chain_endpoints, chain_points, chain_polylines};
pub use containment::{ContainmentNode, ContainmentTree};
pub use expolygon::{ExPolygon, ExPolygons};
pub use line::Line;
pub use medial_axis::medial_axis;
pub use point::{Point, PointF, Points};
pub use polygon::{Polygon, Polygons};
pub use polyline::{Polyline, Polylines};
pub use simplify::{douglas_peucker, douglas_peucker_polygon, simplify_expolygon};

/// Bounding box of a set of ExPolygons.
pub fn bounding_box_of(expolygons: &[ExPolygon]) -> BoundingBox {
    let mut bb = BoundingBox::new();
    for ex in expolygons {
        bb.merge(&ex.bounding_box());
    }
    bb
}

/// Check whether `p` lies inside any of `expolygons`.
pub fn point_in_expolygons(p: &Point, expolygons: &[ExPolygon]) -> bool {
    expolygons
        .iter()
        .any(|ex| ex.bounding_box().contains(p) && ex.contains_point(p))
}
