//! Per-region slicing configuration.

use crate::flow::Flow;
use crate::{CoordF, Error, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Settings consumed by the per-layer region pipeline.
///
/// All lengths are in millimetres and all areas in mm²; conversion to scaled
/// units happens at the point of use.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    // === Perimeters ===
    /// Number of perimeter loops per island.
    pub perimeters: usize,
    /// Detect regions too thin for a full loop and print their skeleton.
    pub thin_walls: bool,
    /// Print the outermost loop first instead of last.
    pub external_perimeters_first: bool,
    /// Gap fill speed (mm/s); gap fill is disabled when zero.
    pub gap_fill_speed: CoordF,

    // === Infill ===
    /// Sparse infill density (0.0 - 1.0).
    pub fill_density: CoordF,
    /// Base infill angle (degrees).
    pub fill_angle: CoordF,
    /// Internal regions up to this area (mm²) are filled solid.
    pub solid_infill_below_area: CoordF,
    /// Number of solid layers under top surfaces.
    pub top_solid_layers: usize,
    /// Number of solid layers over bottom surfaces.
    pub bottom_solid_layers: usize,

    // === Adhesion ===
    /// Brim width (mm); a non-zero brim reverses first-layer perimeter order.
    pub brim_width: CoordF,

    // === Extrusion widths (mm, 0 = automatic) ===
    pub nozzle_diameter: CoordF,
    pub perimeter_extrusion_width: CoordF,
    pub infill_extrusion_width: CoordF,
    pub solid_infill_extrusion_width: CoordF,
    pub top_infill_extrusion_width: CoordF,
    pub first_layer_extrusion_width: CoordF,

    // === Layer heights (mm) ===
    pub layer_height: CoordF,
    pub first_layer_height: CoordF,

    // === Geometry ===
    /// How far top/bottom surfaces are grown into the surrounding infill (mm).
    /// Must exceed the total perimeter thickness.
    pub external_surface_margin: CoordF,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            perimeters: 3,
            thin_walls: true,
            external_perimeters_first: false,
            gap_fill_speed: 20.0,

            fill_density: 0.4,
            fill_angle: 45.0,
            solid_infill_below_area: 70.0,
            top_solid_layers: 3,
            bottom_solid_layers: 3,

            brim_width: 0.0,

            nozzle_diameter: 0.4,
            perimeter_extrusion_width: 0.0,
            infill_extrusion_width: 0.0,
            solid_infill_extrusion_width: 0.0,
            top_infill_extrusion_width: 0.0,
            first_layer_extrusion_width: 0.0,

            layer_height: 0.2,
            first_layer_height: 0.3,

            external_surface_margin: 3.0,
        }
    }
}

impl RegionConfig {
    /// Load a configuration from a JSON file. Missing keys take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: RegionConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.fill_density) {
            return Err(Error::Config(format!(
                "fill density {} must be within 0..1",
                self.fill_density
            )));
        }
        if self.layer_height <= 0.0 || self.first_layer_height <= 0.0 {
            return Err(Error::Config("layer heights must be positive".into()));
        }
        if self.nozzle_diameter <= 0.0 {
            return Err(Error::Config("nozzle diameter must be positive".into()));
        }
        if self.solid_infill_below_area < 0.0 || self.brim_width < 0.0 {
            return Err(Error::Config(
                "solid infill area threshold and brim width must not be negative".into(),
            ));
        }
        if self.external_surface_margin <= 0.0 {
            return Err(Error::Config("external surface margin must be positive".into()));
        }
        if !self.margin_covers_perimeters() {
            warn!(
                "external surface margin {:.2}mm does not exceed the {:.2}mm of perimeters; \
                 top and bottom surfaces will not reach the infill",
                self.external_surface_margin,
                self.perimeter_thickness()
            );
        }
        Ok(())
    }

    /// Total width of the perimeter loops (mm).
    pub fn perimeter_thickness(&self) -> CoordF {
        let width = if self.perimeter_extrusion_width > 0.0 {
            self.perimeter_extrusion_width
        } else {
            Flow::auto_width(self.nozzle_diameter)
        };
        self.perimeters as CoordF * width
    }

    /// Whether grown top/bottom surfaces get past the perimeters.
    #[inline]
    pub fn margin_covers_perimeters(&self) -> bool {
        self.external_surface_margin > self.perimeter_thickness()
    }

    /// Gap fill runs only with a non-zero speed and some infill to join.
    #[inline]
    pub fn gap_fill_enabled(&self) -> bool {
        self.gap_fill_speed > 0.0 && self.fill_density > 0.0
    }

    /// Builder: set the perimeter count.
    pub fn with_perimeters(mut self, perimeters: usize) -> Self {
        self.perimeters = perimeters;
        self
    }

    /// Builder: set the infill density.
    pub fn with_fill_density(mut self, density: CoordF) -> Self {
        self.fill_density = density;
        self
    }

    /// Builder: set the gap fill speed (0 disables gap fill).
    pub fn with_gap_fill_speed(mut self, speed: CoordF) -> Self {
        self.gap_fill_speed = speed;
        self
    }

    pub fn with_thin_walls(mut self, enabled: bool) -> Self {
        self.thin_walls = enabled;
        self
    }

    pub fn with_external_perimeters_first(mut self, enabled: bool) -> Self {
        self.external_perimeters_first = enabled;
        self
    }

    pub fn with_solid_layers(mut self, top: usize, bottom: usize) -> Self {
        self.top_solid_layers = top;
        self.bottom_solid_layers = bottom;
        self
    }

    pub fn with_solid_infill_below_area(mut self, area: CoordF) -> Self {
        self.solid_infill_below_area = area;
        self
    }

    pub fn with_brim_width(mut self, width: CoordF) -> Self {
        self.brim_width = width;
        self
    }

    /// Builder: use the same explicit width for every role.
    pub fn with_extrusion_width(mut self, width: CoordF) -> Self {
        self.perimeter_extrusion_width = width;
        self.infill_extrusion_width = width;
        self.solid_infill_extrusion_width = width;
        self.top_infill_extrusion_width = width;
        self
    }
}

impl fmt::Display for RegionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RegionConfig(perimeters={}, infill={:.0}%, top/bottom={}/{}, gap fill={})",
            self.perimeters,
            self.fill_density * 100.0,
            self.top_solid_layers,
            self.bottom_solid_layers,
            if self.gap_fill_enabled() { "on" } else { "off" }
        )
    }
}
