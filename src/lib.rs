//! Pollenwatch library
//!
//! Polls the Google Pollen API for configured locations on a fixed schedule,
//! normalizes each response into per-code, per-day observations and publishes
//! the latest result for non-blocking readers.

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod data;
pub mod reshape;
pub mod sensor;
pub mod setup;

pub use config::{ConfigError, ConfigStore, LocationConfig};
pub use coordinator::{ForecastReader, RefreshCoordinator, RefreshHandle, RefreshOutcome};
pub use data::{FetchError, ForecastResult, ForecastSource, PollenClient, PollenObservation};
pub use sensor::PollenSensor;
pub use setup::{CredentialsInput, SetupError, SetupFlow};
