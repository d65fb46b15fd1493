//! Pollenwatch - pollen forecasts from the Google Pollen API
//!
//! Stores locations through a guided setup, then refreshes each location's
//! forecast on a fixed schedule and prints the per-code sensor states.

use std::error::Error;
use std::process::ExitCode;

use clap::Parser;
use futures::future::join_all;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pollenwatch::cli::{Cli, Command, SetupArgs};
use pollenwatch::{
    ConfigError, ConfigStore, CredentialsInput, LocationConfig, PollenClient, PollenSensor,
    RefreshCoordinator, SetupFlow,
};

type BoxError = Box<dyn Error>;

/// Sets up the tracing subscriber; `RUST_LOG` wins over `--verbose`
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), BoxError> {
    let store = match cli.config_dir {
        Some(dir) => ConfigStore::with_dir(dir),
        None => ConfigStore::new().ok_or(ConfigError::NoConfigDir)?,
    };

    match cli.command {
        Command::Setup(args) => setup(args, &store).await,
        Command::Options {
            location_id,
            language,
        } => {
            let location = store.update_language(&location_id, &language)?;
            println!("{}: language set to {}", location.title(), location.language);
            Ok(())
        }
        Command::List => list(&store),
        Command::Remove { location_id } => {
            let removed = store.remove(&location_id)?;
            println!("Removed {}", removed.title());
            Ok(())
        }
        Command::Show { location_id, json } => show(&store, location_id.as_deref(), json).await,
        Command::Watch => watch(&store).await,
    }
}

async fn setup(args: SetupArgs, store: &ConfigStore) -> Result<(), BoxError> {
    let flow = SetupFlow::new(PollenClient::new()?);

    let input = CredentialsInput {
        api_key: args.api_key,
        latitude: args.latitude,
        longitude: args.longitude,
        language: args.language,
    };

    let selection = flow.submit_credentials(input).await.map_err(|err| {
        format!("{} [{}: {}]", err, err.field(), err.code())
    })?;

    let available = selection.available();
    println!(
        "Offered: {} pollen types, {} plants",
        available.categories.len(),
        available.plants.len()
    );

    let location = selection
        .finish(args.categories, args.plants, store)
        .map_err(|err| format!("{} [{}: {}]", err, err.field(), err.code()))?;

    println!("Created {} with id {}", location.title(), location.unique_id());
    println!("  pollen types: {}", location.pollen_categories.join(", "));
    println!("  plants:       {}", location.plants.join(", "));
    Ok(())
}

fn list(store: &ConfigStore) -> Result<(), BoxError> {
    let locations = store.load()?;
    if locations.is_empty() {
        println!("No locations configured. Run `pollenwatch setup` first.");
        return Ok(());
    }

    for location in &locations {
        println!(
            "{:<24} {}  language={}  codes={}",
            location.unique_id(),
            location.title(),
            location.language,
            location.selected_codes().count()
        );
    }
    Ok(())
}

/// Locations to act on: one by id, or all of them
fn select_locations(
    store: &ConfigStore,
    location_id: Option<&str>,
) -> Result<Vec<LocationConfig>, BoxError> {
    match location_id {
        Some(id) => {
            let location = store
                .get(id)?
                .ok_or_else(|| ConfigError::NotFound(id.to_string()))?;
            Ok(vec![location])
        }
        None => {
            let locations = store.load()?;
            if locations.is_empty() {
                return Err("no locations configured; run `pollenwatch setup` first".into());
            }
            Ok(locations)
        }
    }
}

async fn show(store: &ConfigStore, location_id: Option<&str>, json: bool) -> Result<(), BoxError> {
    let locations = select_locations(store, location_id)?;
    let client = PollenClient::new()?;

    let refreshed = join_all(locations.iter().map(|location| {
        let mut coordinator = RefreshCoordinator::new(client.clone(), location);
        async move {
            coordinator.refresh().await;
            coordinator
        }
    }))
    .await;

    for (location, coordinator) in locations.iter().zip(&refreshed) {
        if json {
            println!("{}", serde_json::to_string_pretty(&*coordinator.all_latest())?);
        } else {
            let sensors = PollenSensor::for_location(&coordinator.reader(), location);
            print_sensors(location, &sensors);
        }
    }
    Ok(())
}

async fn watch(store: &ConfigStore) -> Result<(), BoxError> {
    let locations = select_locations(store, None)?;
    let client = PollenClient::new()?;

    // Every first refresh completes before any sensor is printed.
    let handles = join_all(
        locations
            .iter()
            .map(|location| RefreshCoordinator::new(client.clone(), location).start()),
    )
    .await;

    let printers: Vec<_> = locations
        .iter()
        .zip(&handles)
        .map(|(location, handle)| {
            let location = location.clone();
            let mut reader = handle.reader();
            let sensors = PollenSensor::for_location(&reader, &location);
            tokio::spawn(async move {
                loop {
                    print_sensors(&location, &sensors);
                    if !reader.changed().await {
                        break;
                    }
                }
            })
        })
        .collect();

    info!(locations = handles.len(), "Watching; press Ctrl-C to stop");
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", err);
    }

    join_all(handles.into_iter().map(|handle| handle.shutdown())).await;
    for printer in printers {
        printer.abort();
    }
    Ok(())
}

fn print_sensors(location: &LocationConfig, sensors: &[PollenSensor]) {
    println!("{} [{}]", location.title(), location.unique_id());
    for sensor in sensors {
        match sensor.attributes() {
            Some(today) => {
                let outlook = today.outlook.unwrap_or_default();
                println!(
                    "  {:<18} {:<14} {:>3}  tomorrow {:>3}  day 3 {:>3}  day 4 {:>3}",
                    sensor.name(),
                    sensor.state(),
                    today.index_value,
                    outlook.tomorrow,
                    outlook.day_3,
                    outlook.day_4
                );
            }
            None => println!("  {:<18} {}", sensor.name(), sensor.state()),
        }
    }
}
