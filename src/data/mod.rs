//! Core data models for pollenwatch
//!
//! This module contains the normalized pollen types published by the refresh
//! coordinator: one observation per code and day offset, grouped into a
//! forecast result that downstream readers query by code.

pub mod catalog;
pub mod pollen;

pub use catalog::{all_codes, default_categories, default_plants, get_code, CodeKind, KnownCode};
pub use pollen::{
    ApiErrorBody, DailyInfo, FetchError, ForecastQuery, ForecastSource, IndexInfo, InfoEntry,
    PollenClient, RawForecastPayload, SeasonFlag,
};

use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::Serialize;

/// Category reported when the source omits `indexInfo.category`
pub const NO_DATA_CATEGORY: &str = "No Data";

/// Pollen reading for one code on one day
///
/// Note: This struct only implements `Serialize`. Observations are built by
/// the reshape step from the typed wire payload and never read back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollenObservation {
    /// Stable code, e.g. "GRASS" or "BIRCH"
    pub code: String,
    /// Localized label from the service
    pub display_name: String,
    /// Ordinal severity label, or [`NO_DATA_CATEGORY`]
    pub category: String,
    /// Universal pollen index value, 0 when absent
    pub index_value: f64,
    /// Season flag as reported by the source
    pub in_season: String,
    /// Free-text index description, may be empty
    pub description: String,
    /// When the reshape that produced this observation ran
    pub last_updated: DateTime<Local>,
    /// Near-future index values, present on the day-0 observation only
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub outlook: Option<Outlook>,
}

/// Index values for the next three days, copied onto today's observation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Outlook {
    pub tomorrow: f64,
    #[serde(rename = "day 3")]
    pub day_3: f64,
    #[serde(rename = "day 4")]
    pub day_4: f64,
}

/// Observations for a single code keyed by day offset (0 = today)
pub type DaySeries = BTreeMap<usize, PollenObservation>;

/// The published result of one refresh cycle
///
/// Maps each code to its day series. A failed cycle publishes the empty
/// result; a successful one replaces the previous result wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ForecastResult {
    codes: BTreeMap<String, DaySeries>,
}

impl ForecastResult {
    /// Creates an empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when no code is present
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Number of codes in the result
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Returns the day series for a code
    pub fn series(&self, code: &str) -> Option<&DaySeries> {
        self.codes.get(code)
    }

    /// Returns today's observation for a code
    pub fn latest(&self, code: &str) -> Option<&PollenObservation> {
        self.observation(code, 0)
    }

    /// Returns the observation for a code at a given day offset
    pub fn observation(&self, code: &str, day: usize) -> Option<&PollenObservation> {
        self.codes.get(code).and_then(|series| series.get(&day))
    }

    /// Iterates over all codes in sorted order
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.codes.keys().map(String::as_str)
    }

    /// Iterates over `(code, series)` pairs in sorted code order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DaySeries)> {
        self.codes.iter().map(|(code, series)| (code.as_str(), series))
    }

    /// Stores an observation, replacing any earlier one for the same code and day
    pub(crate) fn insert(&mut self, day: usize, observation: PollenObservation) {
        self.codes
            .entry(observation.code.clone())
            .or_default()
            .insert(day, observation);
    }

    pub(crate) fn series_mut(&mut self) -> impl Iterator<Item = &mut DaySeries> {
        self.codes.values_mut()
    }
}
