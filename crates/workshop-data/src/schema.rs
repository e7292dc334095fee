//! Serde data file structs for workshop content.
//!
//! These are the on-disk shapes of recipes, stations, generators, starter
//! cards and world tunables. Numbers are plain `f64` here; the setup pipeline
//! converts them to fixed point when it builds engine types.

use std::path::Path;

use serde::Deserialize;
use workshop_core::config::WorldConfig;
use workshop_core::fixed::{Fixed64, Vec3, fixed64_to_f64};
use workshop_core::recipe::DEFAULT_PROCESSING_TIME;

use crate::loader::DataLoadError;

/// `(x, y, z)` in workshop units.
pub type PositionData = (f64, f64, f64);

/// Fixed-point conversion that refuses NaN, infinities and values outside
/// the `Fixed64` range.
pub(crate) fn to_fixed(
    value: f64,
    what: &str,
    name: &str,
    file: &Path,
) -> Result<Fixed64, DataLoadError> {
    Fixed64::checked_from_num(value).ok_or_else(|| DataLoadError::Invalid {
        file: file.to_path_buf(),
        name: name.to_string(),
        detail: format!("{what} {value} is out of range"),
    })
}

pub(crate) fn to_vec3(
    p: PositionData,
    what: &str,
    name: &str,
    file: &Path,
) -> Result<Vec3, DataLoadError> {
    Ok(Vec3::new(
        to_fixed(p.0, what, name, file)?,
        to_fixed(p.1, what, name, file)?,
        to_fixed(p.2, what, name, file)?,
    ))
}

// ===========================================================================
// Recipes
// ===========================================================================

/// A recipe definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeData {
    pub verb: String,
    pub inputs: Vec<String>,
    pub output: String,
    #[serde(default = "default_processing_time")]
    pub processing_time: f64,
    /// Lowercase card kind of the output. Looked up by title when absent.
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub description: String,
}

fn default_processing_time() -> f64 {
    DEFAULT_PROCESSING_TIME
}

// ===========================================================================
// Stations
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct StationData {
    /// Unique name within the workshop, e.g. `"main_forge"`.
    pub name: String,
    /// The verb this station performs.
    pub kind: String,
    pub position: PositionData,
    #[serde(default = "default_station_size")]
    pub size: PositionData,
}

fn default_station_size() -> PositionData {
    (2.0, 1.0, 2.0)
}

// ===========================================================================
// Generators
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorData {
    pub name: String,
    /// Preset name: `mana`, `herb`, `crystal`. Anything else is custom.
    pub kind: String,
    pub position: PositionData,
    pub interval: f64,
    /// Produced title for custom generators.
    #[serde(default)]
    pub title: Option<String>,
    /// Produced card kind for custom generators.
    #[serde(default)]
    pub card_kind: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

// ===========================================================================
// Starter cards
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CardData {
    pub title: String,
    /// Looked up in the catalog's title table when absent.
    #[serde(default)]
    pub kind: Option<String>,
    pub position: PositionData,
    /// Seconds until the card starts decaying. Permanent when absent.
    #[serde(default)]
    pub lifetime: Option<f64>,
    #[serde(default)]
    pub resource: bool,
}

// ===========================================================================
// Config
// ===========================================================================

/// World tunables. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigData {
    pub timestep: f64,
    pub occupancy_threshold: f64,
    pub decay_grace: f64,
    pub output_delay: f64,
    pub output_offset: PositionData,
    pub resource_lifetime: f64,
    pub event_capacity: usize,
    pub stall_timeout: Option<f64>,
}

impl Default for ConfigData {
    fn default() -> Self {
        let config = WorldConfig::default();
        let (ox, oy, oz) = config.output_offset.to_f64();
        Self {
            timestep: fixed64_to_f64(config.timestep),
            occupancy_threshold: fixed64_to_f64(config.occupancy_threshold),
            decay_grace: fixed64_to_f64(config.decay_grace),
            output_delay: fixed64_to_f64(config.output_delay),
            output_offset: (ox, oy, oz),
            resource_lifetime: fixed64_to_f64(config.resource_lifetime),
            event_capacity: config.event_capacity,
            stall_timeout: None,
        }
    }
}

impl ConfigData {
    /// `file` is only used for error context.
    pub fn to_world_config(&self, file: &Path) -> Result<WorldConfig, DataLoadError> {
        let field = |value: f64, name: &str| to_fixed(value, "value", name, file);
        Ok(WorldConfig {
            timestep: field(self.timestep, "timestep")?,
            occupancy_threshold: field(self.occupancy_threshold, "occupancy_threshold")?,
            decay_grace: field(self.decay_grace, "decay_grace")?,
            output_delay: field(self.output_delay, "output_delay")?,
            output_offset: to_vec3(self.output_offset, "value", "output_offset", file)?,
            resource_lifetime: field(self.resource_lifetime, "resource_lifetime")?,
            event_capacity: self.event_capacity,
            stall_timeout: self
                .stall_timeout
                .map(|t| field(t, "stall_timeout"))
                .transpose()?,
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
