//! Pollen sensors
//!
//! A sensor is a read-only view of one code in a coordinator's published
//! slot, shaped the way a home-automation host renders an entity.

use crate::config::{format_coordinate, LocationConfig};
use crate::coordinator::ForecastReader;
use crate::data::PollenObservation;

/// State reported when the code is missing from the latest result
pub const NO_DATA_STATE: &str = "No data";

/// Icon shared by every pollen sensor
pub const POLLEN_ICON: &str = "mdi:flower-pollen";

/// Device grouping the sensors of one location
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: &'static str,
    pub manufacturer: &'static str,
    pub model: &'static str,
}

/// Sensor for one pollen code at one location
#[derive(Debug, Clone)]
pub struct PollenSensor {
    code: String,
    unique_id: String,
    name: String,
    device: DeviceInfo,
    reader: ForecastReader,
}

impl PollenSensor {
    /// Creates a sensor, naming it from the currently published result
    pub fn new(reader: ForecastReader, location: &LocationConfig, code: &str) -> Self {
        let name = reader
            .latest(code)
            .map(|o| o.display_name)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| capitalize(code));
        let latitude = format_coordinate(location.latitude);
        let longitude = format_coordinate(location.longitude);

        Self {
            code: code.to_string(),
            unique_id: format!(
                "google_pollen_{}_{}_{}",
                code.to_lowercase(),
                latitude,
                longitude
            ),
            name,
            device: DeviceInfo {
                identifier: format!("{}_{}", latitude, longitude),
                name: "Google Pollen",
                manufacturer: "Google",
                model: "Pollen API",
            },
            reader,
        }
    }

    /// One sensor per selected code of a location
    pub fn for_location(reader: &ForecastReader, location: &LocationConfig) -> Vec<Self> {
        location
            .selected_codes()
            .map(|code| Self::new(reader.clone(), location, code))
            .collect()
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn icon(&self) -> &'static str {
        POLLEN_ICON
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    /// Today's category, or [`NO_DATA_STATE`]
    pub fn state(&self) -> String {
        self.reader
            .latest(&self.code)
            .map(|o| o.category)
            .unwrap_or_else(|| NO_DATA_STATE.to_string())
    }

    /// Today's full observation, outlook included
    pub fn attributes(&self) -> Option<PollenObservation> {
        self.reader.latest(&self.code)
    }
}

/// First letter upper case, the rest lower case
fn capitalize(code: &str) -> String {
    let mut chars = code.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
