//! Per-location configuration
//!
//! A location is the unit the setup flow creates and the binary runs one
//! refresh coordinator for. Locations are persisted by [`ConfigStore`] and
//! uniquely keyed by their rounded coordinates.

mod store;

pub use store::ConfigStore;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{default_categories, default_plants};

/// Language requested when none is configured
pub const DEFAULT_LANGUAGE: &str = "en";

/// Decimal places kept on stored coordinates
const COORDINATE_DECIMALS: i32 = 4;

/// Errors that can occur when loading or storing configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the configuration file failed
    #[error("Config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON
    #[error("Failed to parse config file: {0}")]
    Json(#[from] serde_json::Error),

    /// Coordinates out of range
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    /// A location with the same coordinates is already stored
    #[error("Location '{0}' is already configured")]
    AlreadyConfigured(String),

    /// No stored location has this id
    #[error("No location with id '{0}'")]
    NotFound(String),

    /// No platform configuration directory could be determined
    #[error("Could not determine a configuration directory; pass --config-dir")]
    NoConfigDir,
}

/// Settings for one monitored location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationConfig {
    pub api_key: String,
    /// Latitude rounded to 4 decimals
    pub latitude: f64,
    /// Longitude rounded to 4 decimals
    pub longitude: f64,
    #[serde(default = "default_language")]
    pub language: String,
    /// Selected pollen-type codes (GRASS, TREE, WEED)
    #[serde(default = "default_categories")]
    pub pollen_categories: Vec<String>,
    /// Selected plant codes
    #[serde(default = "default_plants")]
    pub plants: Vec<String>,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl LocationConfig {
    /// Creates a location selecting every known code
    ///
    /// Coordinates are range-checked and rounded to 4 decimals.
    pub fn new(
        api_key: impl Into<String>,
        latitude: f64,
        longitude: f64,
        language: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        validate_coordinates(latitude, longitude)?;

        Ok(Self {
            api_key: api_key.into(),
            latitude: round_coordinate(latitude),
            longitude: round_coordinate(longitude),
            language: language.into(),
            pollen_categories: default_categories(),
            plants: default_plants(),
        })
    }

    /// Replaces the code selection
    pub fn with_selection(mut self, pollen_categories: Vec<String>, plants: Vec<String>) -> Self {
        self.pollen_categories = pollen_categories;
        self.plants = plants;
        self
    }

    /// Unique key of the location, e.g. `"52.3676-4.9041"` or `"10.0-20.0"`
    pub fn unique_id(&self) -> String {
        format!(
            "{}-{}",
            format_coordinate(self.latitude),
            format_coordinate(self.longitude)
        )
    }

    /// Human-readable title, e.g. `"Pollen (52.3676, 4.9041)"`
    pub fn title(&self) -> String {
        format!(
            "Pollen ({}, {})",
            format_coordinate(self.latitude),
            format_coordinate(self.longitude)
        )
    }

    /// Every selected code, categories first
    pub fn selected_codes(&self) -> impl Iterator<Item = &str> {
        self.pollen_categories
            .iter()
            .chain(&self.plants)
            .map(String::as_str)
    }
}

/// Checks latitude is within [-90, 90] and longitude within [-180, 180]
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), ConfigError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(ConfigError::InvalidLocation(format!(
            "latitude {} is outside [-90, 90]",
            latitude
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(ConfigError::InvalidLocation(format!(
            "longitude {} is outside [-180, 180]",
            longitude
        )));
    }
    Ok(())
}

/// Rounds to [`COORDINATE_DECIMALS`] places; `-0.0` becomes `0.0`
fn round_coordinate(value: f64) -> f64 {
    let factor = 10f64.powi(COORDINATE_DECIMALS);
    (value * factor).round() / factor + 0.0
}

/// Renders a coordinate for ids and titles, whole numbers keeping one decimal
pub(crate) fn format_coordinate(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}
