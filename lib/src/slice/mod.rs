//! Layer and surface model plus the stages that shape it.
//!
//! This module contains:
//! - [`Layer`] / [`LayerRegion`] - per-layer, per-region state
//! - [`Surface`] - typed ExPolygons awaiting fill
//! - [`LoopMerger`] - raw loops into islands and thin walls
//! - [`detect_surface_types`] - top/bottom/internal detection across layers
//! - [`SurfaceClassifier`] / [`ExternalSurfaceProcessor`] - fill surface typing

mod classify;
mod layer;
mod loop_merger;
mod surface;

pub use classify::{ExternalSurfaceProcessor, SurfaceClassifier};
pub use layer::{Layer, LayerRegion};
pub use loop_merger::{LoopMerger, SAFETY_OFFSET};
pub use surface::{
    apply_surface_types, detect_surface_types, group_surfaces, surfaces_to_expolygons, Surface,
    SurfaceType, Surfaces,
};
