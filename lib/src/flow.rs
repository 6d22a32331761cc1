//! Extrusion flow geometry.
//!
//! A [`Flow`] describes one bead: its width, height and the centre-to-centre
//! spacing of adjacent beads. The bead cross-section is modelled as a rectangle
//! with semicircular ends, so neighbouring beads overlap by
//! `height * (1 - PI/4)`.
//!
//! [`RegionFlows`] bundles the four flows a layer region needs and is rebuilt
//! whenever the layer (and thus layer height or first-layer status) changes.

use crate::config::RegionConfig;
use crate::{scale, Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Errors raised while deriving a flow.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FlowError {
    #[error("{role} flow: layer height {height}mm must be positive")]
    InvalidHeight { role: FlowRole, height: CoordF },

    #[error("{role} flow: extrusion width {width}mm must exceed layer height {height}mm")]
    WidthTooSmall {
        role: FlowRole,
        width: CoordF,
        height: CoordF,
    },

    #[error("nozzle diameter {0}mm must be positive")]
    InvalidNozzle(CoordF),
}

/// Result type for flow computations.
pub type FlowResult<T> = std::result::Result<T, FlowError>;

/// The extrusion roles a region derives flows for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowRole {
    Perimeter,
    Infill,
    SolidInfill,
    TopSolidInfill,
}

impl FlowRole {
    pub fn name(&self) -> &'static str {
        match self {
            FlowRole::Perimeter => "perimeter",
            FlowRole::Infill => "infill",
            FlowRole::SolidInfill => "solid infill",
            FlowRole::TopSolidInfill => "top solid infill",
        }
    }
}

impl fmt::Display for FlowRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Geometry of a single extrusion bead (millimetres).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub role: FlowRole,
    pub width: CoordF,
    pub height: CoordF,
    pub spacing: CoordF,
}

impl Flow {
    /// Build a flow for a bead of `width` x `height`.
    pub fn new(role: FlowRole, width: CoordF, height: CoordF) -> FlowResult<Self> {
        if height <= 0.0 {
            return Err(FlowError::InvalidHeight { role, height });
        }
        if width <= height {
            return Err(FlowError::WidthTooSmall {
                role,
                width,
                height,
            });
        }
        Ok(Self {
            role,
            width,
            height,
            spacing: Self::rounded_rectangle_spacing(width, height),
        })
    }

    /// Width used when none is configured.
    pub fn auto_width(nozzle_diameter: CoordF) -> CoordF {
        1.125 * nozzle_diameter
    }

    /// Centre-to-centre spacing of adjacent beads.
    #[inline]
    pub fn rounded_rectangle_spacing(width: CoordF, height: CoordF) -> CoordF {
        width - height * (1.0 - 0.25 * PI)
    }

    #[inline]
    pub fn scaled_width(&self) -> Coord {
        scale(self.width)
    }

    #[inline]
    pub fn scaled_spacing(&self) -> Coord {
        scale(self.spacing)
    }
}

/// Per-region flows for one layer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionFlows {
    pub perimeter: Flow,
    pub infill: Flow,
    pub solid_infill: Flow,
    pub top_infill: Flow,
}

impl RegionFlows {
    /// Derive the four role flows for a layer of `layer_height` mm.
    ///
    /// On the first layer a configured first-layer width overrides every role.
    pub fn new(config: &RegionConfig, layer_height: CoordF, first_layer: bool) -> FlowResult<Self> {
        if config.nozzle_diameter <= 0.0 {
            return Err(FlowError::InvalidNozzle(config.nozzle_diameter));
        }
        let width_for = |configured: CoordF| {
            if first_layer && config.first_layer_extrusion_width > 0.0 {
                config.first_layer_extrusion_width
            } else if configured > 0.0 {
                configured
            } else {
                Flow::auto_width(config.nozzle_diameter)
            }
        };
        Ok(Self {
            perimeter: Flow::new(
                FlowRole::Perimeter,
                width_for(config.perimeter_extrusion_width),
                layer_height,
            )?,
            infill: Flow::new(
                FlowRole::Infill,
                width_for(config.infill_extrusion_width),
                layer_height,
            )?,
            solid_infill: Flow::new(
                FlowRole::SolidInfill,
                width_for(config.solid_infill_extrusion_width),
                layer_height,
            )?,
            top_infill: Flow::new(
                FlowRole::TopSolidInfill,
                width_for(config.top_infill_extrusion_width),
                layer_height,
            )?,
        })
    }

    pub fn get(&self, role: FlowRole) -> &Flow {
        match role {
            FlowRole::Perimeter => &self.perimeter,
            FlowRole::Infill => &self.infill,
            FlowRole::SolidInfill => &self.solid_infill,
            FlowRole::TopSolidInfill => &self.top_infill,
        }
    }
}
