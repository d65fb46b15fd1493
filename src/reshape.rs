//! Reshaping of raw forecast payloads into a [`ForecastResult`]
//!
//! Pure, synchronous work between the network call and publication: every
//! entry of every day becomes an observation keyed by code and day offset,
//! then today's observation of each code gets the next three days' index
//! values copied onto it.

use chrono::{DateTime, Local};
use tracing::warn;

use crate::data::{
    FetchError, ForecastResult, InfoEntry, Outlook, PollenObservation, RawForecastPayload,
    NO_DATA_CATEGORY,
};

/// Reshapes a payload, stamping every observation with `now`
///
/// Returns an API error without building anything when the payload embeds an
/// error object.
pub fn reshape(
    payload: &RawForecastPayload,
    now: DateTime<Local>,
) -> Result<ForecastResult, FetchError> {
    if let Some(error) = &payload.error {
        return Err(FetchError::Api {
            status: error.code,
            message: error.describe(),
        });
    }

    let mut result = ForecastResult::new();

    for (day, info) in payload.daily_info.iter().enumerate() {
        // Pollen types first, then plants; a later entry for the same code wins.
        for entry in info.pollen_type_info.iter().chain(&info.plant_info) {
            let Some(code) = entry.code.as_deref() else {
                warn!(day, "Skipping forecast entry without a code");
                continue;
            };
            result.insert(day, observe(code, entry, now));
        }
    }

    for series in result.series_mut() {
        let value_at = |day: usize| series.get(&day).map_or(0.0, |o| o.index_value);
        let outlook = Outlook {
            tomorrow: value_at(1),
            day_3: value_at(2),
            day_4: value_at(3),
        };
        if let Some(today) = series.get_mut(&0) {
            today.outlook = Some(outlook);
        }
    }

    Ok(result)
}

fn observe(code: &str, entry: &InfoEntry, now: DateTime<Local>) -> PollenObservation {
    let index = entry.index_info.as_ref();

    PollenObservation {
        code: code.to_string(),
        display_name: entry.display_name.clone().unwrap_or_default(),
        category: index
            .and_then(|i| i.category.clone())
            .unwrap_or_else(|| NO_DATA_CATEGORY.to_string()),
        index_value: index.and_then(|i| i.value).unwrap_or(0.0),
        in_season: entry
            .in_season
            .as_ref()
            .map_or_else(|| "false".to_string(), |flag| flag.as_text()),
        description: index
            .and_then(|i| i.index_description.clone())
            .unwrap_or_default(),
        last_updated: now,
        outlook: None,
    }
}
