//! # Slicer layer geometry
//!
//! The per-layer region core of a FFF slicer: it turns the raw closed loops
//! produced by slicing a mesh at one height into an ordered, printable
//! description of that layer.
//!
//! Each (layer, region) pair runs through the same stages:
//! - Loop merging into well-formed islands, plus thin-wall extraction
//! - Perimeter generation with containment-ordered, role-tagged loops
//! - Gap filling with decreasing-width zigzag fill
//! - Surface classification and external surface expansion
//! - Bridge direction detection against the layer below
//!
//! ## Example
//!
//! ```rust,ignore
//! use slicer::{LayerInput, Pipeline, RegionConfig};
//!
//! let config = RegionConfig::default();
//! let layers = Pipeline::new(&config).run(&inputs)?;
//! for layer in &layers {
//!     println!("{}", layer);
//! }
//! ```

// Core modules
pub mod bridge;
pub mod clipper;
pub mod config;
pub mod extrusion;
pub mod flow;
pub mod geometry;
pub mod infill;
pub mod inspect;
pub mod perimeter;
pub mod pipeline;
pub mod slice;

use std::fmt;

// Re-export commonly used types
pub use config::RegionConfig;
pub use extrusion::{
    ExtrusionEntity, ExtrusionEntityCollection, ExtrusionLoop, ExtrusionPath, ExtrusionRole,
};
pub use flow::{Flow, FlowError, FlowResult, FlowRole, RegionFlows};
pub use geometry::{BoundingBox, ExPolygon, ExPolygons, Line, Point, Polygon, Polyline};

// Re-export clipper operations
pub use clipper::{
    difference, grow, intersection, offset2, offset_expolygons, offset_polygons, shrink, union,
    union_ex, union_polygons, xor, FillRule, OffsetJoinType,
};

// Re-export the pipeline stages
pub use bridge::BridgeDetector;
pub use infill::{FillOutput, FillParams, FillPattern, Rectilinear};
pub use inspect::{Inspector, NoInspector, SvgInspector};
pub use perimeter::{GapFillOutput, GapFiller, PerimeterGenerator, PerimeterOutput};
pub use pipeline::{LayerInput, Pipeline, RegionInput};
pub use slice::{
    detect_surface_types, ExternalSurfaceProcessor, Layer, LayerRegion, LoopMerger, Surface,
    SurfaceClassifier, SurfaceType,
};

/// Coordinate type used throughout the slicer.
/// Using i64 for integer coordinates (scaled by SCALING_FACTOR) to avoid floating-point issues.
pub type Coord = i64;

/// Floating-point coordinate type for unscaled values.
pub type CoordF = f64;

/// Scaling factor: coordinates are stored as integers scaled by this factor.
/// 1 unit = 1 nanometer, so 1mm = 1_000_000 units.
pub const SCALING_FACTOR: f64 = 1_000_000.0;

/// Global simplification tolerance (0.0125mm).
pub const SCALED_RESOLUTION: Coord = 12_500;

/// Small distance used to make touching geometry overlap before booleans (100nm).
pub const SCALED_EPSILON: Coord = 100;

/// Scale a floating-point coordinate to integer.
#[inline]
pub fn scale(v: CoordF) -> Coord {
    (v * SCALING_FACTOR).round() as Coord
}

/// Unscale an integer coordinate to floating-point.
#[inline]
pub fn unscale(v: Coord) -> CoordF {
    v as CoordF / SCALING_FACTOR
}

/// Scale an area given in mm² into the space of polygon areas.
///
/// Areas are squared quantities, so the factor applies twice.
#[inline]
pub fn scaled_area(mm2: CoordF) -> CoordF {
    mm2 * SCALING_FACTOR * SCALING_FACTOR
}

/// Result type used throughout the slicer.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for slicer operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),

    /// A clockwise loop that no contour encloses: the upstream slicer produced
    /// a hole without an island around it.
    #[error("hole loop {index} is not enclosed by any contour")]
    OrphanHole { index: usize },

    #[error("layer {layer} region {region}: geometry processing failed ({stage})")]
    Stage {
        layer: usize,
        region: usize,
        stage: Stage,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach the layer, region and stage to an error.
    pub fn at(self, layer: usize, region: usize, stage: Stage) -> Error {
        Error::Stage {
            layer,
            region,
            stage,
            source: Box::new(self),
        }
    }
}

/// Pipeline stage names used in error reports and inspection callbacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    LoopMerge,
    SurfaceTypes,
    Perimeters,
    GapFill,
    Classify,
    ExternalSurfaces,
    Infill,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::LoopMerge => "loop merge",
            Stage::SurfaceTypes => "surface types",
            Stage::Perimeters => "perimeters",
            Stage::GapFill => "gap fill",
            Stage::Classify => "classify",
            Stage::ExternalSurfaces => "external surfaces",
            Stage::Infill => "infill",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling() {
        // 1mm should scale to 1_000_000
        assert_eq!(scale(1.0), 1_000_000);

        // And back
        assert!((unscale(1_000_000) - 1.0).abs() < 1e-10);

        // Test sub-millimeter precision
        assert_eq!(scale(0.001), 1_000); // 1 micron
        assert_eq!(scale(0.0125), SCALED_RESOLUTION);
    }

    #[test]
    fn test_scaled_area_applies_factor_twice() {
        let side = scale(2.0) as CoordF;
        assert!((scaled_area(4.0) - side * side).abs() < 1.0);
    }

    #[test]
    fn test_stage_error_message() {
        let err = Error::OrphanHole { index: 4 }.at(12, 1, Stage::LoopMerge);
        assert_eq!(
            err.to_string(),
            "layer 12 region 1: geometry processing failed (loop merge)"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
