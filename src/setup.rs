//! Guided setup for a new location
//!
//! Two steps: credentials are checked with a one-day lookup that also lists
//! the codes the service reports for the location, then the operator picks
//! which of those codes to monitor and the location is stored.
//!
//! Errors carry the form field they belong to and a stable error code, so a
//! front end can show them next to the offending input.

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::config::{ConfigError, ConfigStore, LocationConfig};
use crate::data::{FetchError, ForecastQuery, ForecastSource, InfoEntry, RawForecastPayload};

/// Prefix of every Google API key
const API_KEY_PREFIX: &str = "AIza";

/// Characters following the prefix
const API_KEY_BODY_LEN: usize = 35;

/// Errors reported by the setup steps
#[derive(Debug, Error)]
pub enum SetupError {
    /// Key has the wrong shape or was rejected by the service
    #[error("The API key is not valid")]
    InvalidApiKey,

    /// Latitude or longitude out of range
    #[error("Invalid {0}")]
    InvalidCoordinate(&'static str),

    /// The service answered with an error
    #[error("Pollen API error: {0}")]
    Api(String),

    /// The service could not be reached
    #[error("Cannot connect to the Pollen API: {0}")]
    CannotConnect(String),

    /// A selection names a code the service did not offer
    #[error("Unknown pollen code '{0}'")]
    UnknownCode(String),

    /// The location is already configured
    #[error("Location '{0}' is already configured")]
    AlreadyConfigured(String),

    /// Storing the location failed
    #[error(transparent)]
    Config(ConfigError),
}

impl SetupError {
    /// Form field the error belongs to, `"base"` for form-wide errors
    pub fn field(&self) -> &'static str {
        match self {
            SetupError::InvalidApiKey => "api_key",
            SetupError::InvalidCoordinate(field) => *field,
            SetupError::UnknownCode(_) => "selection",
            SetupError::Api(_)
            | SetupError::CannotConnect(_)
            | SetupError::AlreadyConfigured(_)
            | SetupError::Config(_) => "base",
        }
    }

    /// Stable error code for translation
    pub fn code(&self) -> &'static str {
        match self {
            SetupError::InvalidApiKey => "invalid_api_key",
            SetupError::InvalidCoordinate(_) => "invalid_coordinate",
            SetupError::Api(_) => "api_error",
            SetupError::CannotConnect(_) => "cannot_connect",
            SetupError::UnknownCode(_) => "unknown_code",
            SetupError::AlreadyConfigured(_) => "already_configured",
            SetupError::Config(_) => "config_error",
        }
    }
}

impl From<FetchError> for SetupError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Auth { .. } => SetupError::InvalidApiKey,
            FetchError::Transport(e) => SetupError::CannotConnect(e.to_string()),
            FetchError::Api { message, .. } => SetupError::Api(message),
            FetchError::Decode(e) => SetupError::Api(e.to_string()),
        }
    }
}

impl From<ConfigError> for SetupError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::AlreadyConfigured(id) => SetupError::AlreadyConfigured(id),
            other => SetupError::Config(other),
        }
    }
}

/// A selectable code with the label the service gave it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeOption {
    pub code: String,
    pub display_name: String,
}

/// Codes the service reports for a location, split as the response splits them
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AvailableCodes {
    /// From `pollenTypeInfo`
    pub categories: Vec<CodeOption>,
    /// From `plantInfo`
    pub plants: Vec<CodeOption>,
}

impl AvailableCodes {
    fn from_payload(payload: &RawForecastPayload) -> Result<Self, FetchError> {
        if let Some(error) = &payload.error {
            return Err(FetchError::Api {
                status: error.code,
                message: error.describe(),
            });
        }

        let today = payload.daily_info.first().ok_or_else(|| FetchError::Api {
            status: None,
            message: "response contained no forecast days".to_string(),
        })?;

        Ok(Self {
            categories: options(&today.pollen_type_info),
            plants: options(&today.plant_info),
        })
    }
}

fn options(entries: &[InfoEntry]) -> Vec<CodeOption> {
    entries
        .iter()
        .filter_map(|entry| {
            let code = entry.code.clone()?;
            let display_name = entry.display_name.clone().unwrap_or_else(|| code.clone());
            Some(CodeOption { code, display_name })
        })
        .collect()
}

/// Validates credentials with a one-day lookup and lists the selectable codes
pub async fn discover_codes<S>(source: &S, query: &ForecastQuery) -> Result<AvailableCodes, FetchError>
where
    S: ForecastSource + ?Sized,
{
    let query = ForecastQuery {
        days: 1,
        ..query.clone()
    };
    let payload = source.fetch(&query).await?;
    AvailableCodes::from_payload(&payload)
}

/// Returns true when `key` looks like a Google API key
pub fn is_valid_api_key(key: &str) -> bool {
    key.strip_prefix(API_KEY_PREFIX).is_some_and(|body| {
        body.len() == API_KEY_BODY_LEN
            && body
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}

/// Input of the first step
#[derive(Debug, Clone)]
pub struct CredentialsInput {
    pub api_key: String,
    pub latitude: f64,
    pub longitude: f64,
    pub language: String,
}

/// Setup flow bound to a forecast source
pub struct SetupFlow<S> {
    source: S,
}

impl<S: ForecastSource> SetupFlow<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// First step: validate the key and coordinates and discover the codes
    ///
    /// A malformed key is rejected without a network call.
    pub async fn submit_credentials(
        &self,
        input: CredentialsInput,
    ) -> Result<PollenSelection, SetupError> {
        if !is_valid_api_key(&input.api_key) {
            return Err(SetupError::InvalidApiKey);
        }
        if !(-90.0..=90.0).contains(&input.latitude) {
            return Err(SetupError::InvalidCoordinate("latitude"));
        }
        if !(-180.0..=180.0).contains(&input.longitude) {
            return Err(SetupError::InvalidCoordinate("longitude"));
        }

        let query = ForecastQuery {
            api_key: input.api_key.clone(),
            latitude: input.latitude,
            longitude: input.longitude,
            language: input.language.clone(),
            days: 1,
        };

        let available = discover_codes(&self.source, &query).await.map_err(|err| {
            error!(kind = err.kind(), "Error validating API key: {}", err);
            SetupError::from(err)
        })?;

        let location = LocationConfig::new(
            input.api_key,
            input.latitude,
            input.longitude,
            input.language,
        )?;

        Ok(PollenSelection {
            location,
            available,
        })
    }
}

/// Second step: choose the codes to monitor
#[derive(Debug, Clone)]
pub struct PollenSelection {
    location: LocationConfig,
    available: AvailableCodes,
}

impl PollenSelection {
    /// Codes offered for selection
    pub fn available(&self) -> &AvailableCodes {
        &self.available
    }

    /// The location being configured, not yet stored
    pub fn location(&self) -> &LocationConfig {
        &self.location
    }

    /// Resolves the selections, stores the location and returns it
    ///
    /// Selections may name codes or display names. `None` selects every
    /// offered code of that kind.
    pub fn finish(
        self,
        categories: Option<Vec<String>>,
        plants: Option<Vec<String>>,
        store: &ConfigStore,
    ) -> Result<LocationConfig, SetupError> {
        let categories = resolve(&self.available.categories, categories)?;
        let plants = resolve(&self.available.plants, plants)?;
        let location = self.location.with_selection(categories, plants);

        store.insert(location.clone())?;
        info!(location = %location.unique_id(), "Created entry '{}'", location.title());

        Ok(location)
    }
}

fn resolve(offered: &[CodeOption], selected: Option<Vec<String>>) -> Result<Vec<String>, SetupError> {
    let Some(selected) = selected else {
        return Ok(offered.iter().map(|o| o.code.clone()).collect());
    };

    selected
        .iter()
        .map(|wanted| {
            offered
                .iter()
                .find(|o| o.code.eq_ignore_ascii_case(wanted) || o.display_name == *wanted)
                .map(|o| o.code.clone())
                .ok_or_else(|| SetupError::UnknownCode(wanted.clone()))
        })
        .collect()
}
