//! Google Pollen API client
//!
//! This module issues the `forecast:lookup` request and parses the response into
//! typed wire structures. It performs exactly one round trip per call, never
//! retries, and leaves reshaping to the refresh coordinator.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::debug;

/// Endpoint of the Google Pollen forecast lookup
pub const POLLEN_BASE_URL: &str = "https://pollen.googleapis.com/v1/forecast:lookup";

/// Per-request deadline, covering connect and body
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when fetching pollen data
#[derive(Debug, Error)]
pub enum FetchError {
    /// The service rejected the key or the request (400, 401, 403)
    #[error("Authorization failed ({status}): {message}")]
    Auth { status: u16, message: String },

    /// Connection, timeout or body transfer failed
    #[error("Transport failure: {0}")]
    Transport(#[source] reqwest::Error),

    /// The service reported an error, either as a non-success status or as an
    /// error object embedded in a 200 response
    #[error("API error: {message}")]
    Api { status: Option<u16>, message: String },

    /// The response body was not a valid forecast payload
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    /// Short label used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Auth { .. } => "auth",
            FetchError::Transport(_) => "transport",
            FetchError::Api { .. } => "api",
            FetchError::Decode(_) => "decode",
        }
    }
}

/// Parameters of one forecast lookup
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastQuery {
    pub api_key: String,
    pub latitude: f64,
    pub longitude: f64,
    pub language: String,
    /// Number of forecast days, at least 1
    pub days: u32,
}

impl ForecastQuery {
    /// Query-string pairs in the order the service documents them
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("key", self.api_key.clone()),
            ("location.latitude", self.latitude.to_string()),
            ("location.longitude", self.longitude.to_string()),
            ("languageCode", self.language.clone()),
            ("days", self.days.max(1).to_string()),
            ("plantsDescription", "false".to_string()),
        ]
    }
}

/// Source of raw forecast payloads
///
/// Implemented by [`PollenClient`] for the real service; the refresh
/// coordinator is generic over it.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    /// Performs one lookup and returns the parsed payload unmodified
    async fn fetch(&self, query: &ForecastQuery) -> Result<RawForecastPayload, FetchError>;
}

/// Top-level `forecast:lookup` response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawForecastPayload {
    #[serde(default)]
    pub region_code: Option<String>,
    /// One entry per forecast day, today first
    #[serde(default, deserialize_with = "null_as_default")]
    pub daily_info: Vec<DailyInfo>,
    /// Error object some responses embed despite a success status
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

/// Forecast for a single day
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyInfo {
    #[serde(default)]
    pub date: Option<ApiDate>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pollen_type_info: Vec<InfoEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub plant_info: Vec<InfoEntry>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ApiDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// A pollen type or plant entry within a day
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoEntry {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub in_season: Option<SeasonFlag>,
    #[serde(default)]
    pub index_info: Option<IndexInfo>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub health_recommendations: Vec<String>,
}

/// Reads an explicit `null` the same as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `inSeason` as reported: normally a boolean, occasionally text
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SeasonFlag {
    Flag(bool),
    Text(String),
}

impl SeasonFlag {
    /// Textual form stored on observations
    pub fn as_text(&self) -> String {
        match self {
            SeasonFlag::Flag(flag) => flag.to_string(),
            SeasonFlag::Text(text) => text.clone(),
        }
    }
}

/// Universal Pollen Index details for an entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub index_description: Option<String>,
    #[serde(default)]
    pub color: Option<IndexColor>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct IndexColor {
    #[serde(default)]
    pub red: Option<f64>,
    #[serde(default)]
    pub green: Option<f64>,
    #[serde(default)]
    pub blue: Option<f64>,
}

/// Google API error object
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl ApiErrorBody {
    pub(crate) fn describe(&self) -> String {
        match (&self.status, self.message.is_empty()) {
            (Some(status), false) => format!("{}: {}", status, self.message),
            (Some(status), true) => status.clone(),
            (None, false) => self.message.clone(),
            (None, true) => "unspecified error".to_string(),
        }
    }
}

/// Error envelope returned with non-success statuses
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

/// Client for the Google Pollen API
#[derive(Debug, Clone)]
pub struct PollenClient {
    client: Client,
    base_url: String,
}

impl PollenClient {
    /// Create a new PollenClient pointed at the public endpoint
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(FetchError::Transport)?;

        Ok(Self {
            client,
            base_url: POLLEN_BASE_URL.to_string(),
        })
    }

    /// Create a new PollenClient with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: POLLEN_BASE_URL.to_string(),
        }
    }

    /// Point the client at another endpoint (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl ForecastSource for PollenClient {
    async fn fetch(&self, query: &ForecastQuery) -> Result<RawForecastPayload, FetchError> {
        debug!(
            latitude = query.latitude,
            longitude = query.longitude,
            language = %query.language,
            days = query.days,
            "Fetching pollen forecast"
        );

        // Strip the URL from transport errors, it carries the API key.
        let response = self
            .client
            .get(&self.base_url)
            .query(&query.params())
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.without_url()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.without_url()))?;

        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        let payload: RawForecastPayload = serde_json::from_str(&body)?;
        debug!(days = payload.daily_info.len(), "API result: {}", body);

        if let Some(error) = &payload.error {
            return Err(FetchError::Api {
                status: error.code,
                message: error.describe(),
            });
        }

        Ok(payload)
    }
}

/// Map a non-success status and its body onto the error taxonomy
fn classify_status(status: StatusCode, body: &str) -> FetchError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.describe())
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            FetchError::Auth {
                status: status.as_u16(),
                message,
            }
        }
        _ => FetchError::Api {
            status: Some(status.as_u16()),
            message,
        },
    }
}
