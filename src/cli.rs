//! Command-line interface parsing for pollenwatch
//!
//! This module handles parsing of CLI arguments using clap: one subcommand per
//! operation on configured locations, plus global options for the config
//! directory and log verbosity.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use crate::config::DEFAULT_LANGUAGE;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The language is not a BCP-47 style tag such as "en" or "zh-Hant"
    #[error("Invalid language: '{0}'. Expected a code such as en, de or pt-BR")]
    InvalidLanguage(String),
}

/// Pollenwatch - pollen forecasts from the Google Pollen API
#[derive(Parser, Debug)]
#[command(name = "pollenwatch")]
#[command(about = "Pollen forecasts for your locations from the Google Pollen API")]
#[command(version)]
pub struct Cli {
    /// Directory holding locations.json (defaults to the platform config dir)
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate an API key for a location and store the location
    Setup(SetupArgs),

    /// Change the forecast language of a stored location
    Options {
        /// Location id as printed by `list`
        #[arg(allow_hyphen_values = true)]
        location_id: String,
        #[arg(long, value_parser = parse_language_arg)]
        language: String,
    },

    /// List stored locations
    List,

    /// Remove a stored location
    Remove {
        /// Location id as printed by `list`
        #[arg(allow_hyphen_values = true)]
        location_id: String,
    },

    /// Refresh once and print the current forecast
    Show {
        /// Only this location (all locations when omitted)
        #[arg(allow_hyphen_values = true)]
        location_id: Option<String>,
        /// Print the full forecast result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Keep refreshing every location on schedule until interrupted
    Watch,
}

/// Arguments of the `setup` subcommand
#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Google API key with the Pollen API enabled
    #[arg(long)]
    pub api_key: String,

    #[arg(long, allow_negative_numbers = true)]
    pub latitude: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub longitude: f64,

    #[arg(long, default_value = DEFAULT_LANGUAGE, value_parser = parse_language_arg)]
    pub language: String,

    /// Pollen types to monitor, by code or name (default: all offered)
    ///
    /// Example: --categories GRASS,TREE
    #[arg(long, value_delimiter = ',', value_name = "CODES")]
    pub categories: Option<Vec<String>>,

    /// Plants to monitor, by code or name (default: all offered)
    ///
    /// Example: --plants BIRCH,OAK
    #[arg(long, value_delimiter = ',', value_name = "CODES")]
    pub plants: Option<Vec<String>>,
}

/// Parses a language argument.
///
/// Accepts a 2-3 letter primary tag followed by optional 2-8 character
/// subtags, separated by '-'.
pub fn parse_language_arg(s: &str) -> Result<String, CliError> {
    let mut parts = s.split('-');
    let primary_ok = parts
        .next()
        .is_some_and(|p| (2..=3).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphabetic()));
    let rest_ok = parts.all(|p| (2..=8).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphanumeric()));

    if primary_ok && rest_ok {
        Ok(s.to_string())
    } else {
        Err(CliError::InvalidLanguage(s.to_string()))
    }
}
