//! Refresh coordinator
//!
//! Owns the poll schedule for one configured location. Each cycle fetches the
//! forecast, reshapes it and publishes the result into a single slot that
//! readers borrow without blocking. Failures of any kind publish the empty
//! result and are logged once; nothing escapes the refresh entry point.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::LocationConfig;
use crate::data::{FetchError, ForecastQuery, ForecastResult, ForecastSource, PollenObservation};
use crate::reshape::reshape;

/// Interval between scheduled refreshes
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(4 * 60 * 60);

/// Days requested on every scheduled refresh (today plus three)
pub const FORECAST_DAYS: u32 = 4;

/// What a reader sees in the published slot
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Result of the most recent cycle, empty after a failure
    pub result: Arc<ForecastResult>,
    /// Whether the most recent cycle succeeded
    pub last_update_success: bool,
    /// When the most recent cycle finished, `None` before the first one
    pub refreshed_at: Option<DateTime<Local>>,
}

/// Result of one refresh cycle
///
/// A degraded cycle is not an error for the caller: the failure has already
/// been logged and the empty result published.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// A fresh result with this many codes was published
    Published { codes: usize },
    /// The cycle failed and the empty result was published
    Degraded(FetchError),
}

impl RefreshOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, RefreshOutcome::Published { .. })
    }
}

/// Fetch-reshape-publish loop for a single location
pub struct RefreshCoordinator<S> {
    source: S,
    query: ForecastQuery,
    label: String,
    slot: watch::Sender<Snapshot>,
}

impl<S: ForecastSource> RefreshCoordinator<S> {
    /// Creates a coordinator for a stored location
    pub fn new(source: S, location: &LocationConfig) -> Self {
        let query = ForecastQuery {
            api_key: location.api_key.clone(),
            latitude: location.latitude,
            longitude: location.longitude,
            language: location.language.clone(),
            days: FORECAST_DAYS,
        };
        Self::with_query(source, query, location.unique_id())
    }

    /// Creates a coordinator for an explicit query
    pub fn with_query(source: S, query: ForecastQuery, label: impl Into<String>) -> Self {
        let (slot, _) = watch::channel(Snapshot::default());
        Self {
            source,
            query,
            label: label.into(),
            slot,
        }
    }

    /// Identifier used in log lines, normally the location's unique id
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns a reader of the published slot
    pub fn reader(&self) -> ForecastReader {
        ForecastReader {
            rx: self.slot.subscribe(),
        }
    }

    /// Today's observation for a code from the published slot
    pub fn latest(&self, code: &str) -> Option<PollenObservation> {
        self.slot.borrow().result.latest(code).cloned()
    }

    /// The whole published result
    pub fn all_latest(&self) -> Arc<ForecastResult> {
        Arc::clone(&self.slot.borrow().result)
    }

    /// Runs one fetch-reshape-publish cycle
    ///
    /// Takes `&mut self` so a cycle can never overlap another one on the same
    /// coordinator.
    pub async fn refresh(&mut self) -> RefreshOutcome {
        let fetched = self.source.fetch(&self.query).await;

        // Everything below is synchronous: a cycle abandoned at the fetch
        // leaves the slot untouched.
        match fetched.and_then(|payload| reshape(&payload, Local::now())) {
            Ok(result) => {
                let codes = result.len();
                debug!(location = %self.label, ?result, "Result data");
                self.publish(result, true);
                info!(location = %self.label, codes, "Pollen forecast refreshed");
                RefreshOutcome::Published { codes }
            }
            Err(err) => {
                self.log_failure(&err);
                self.publish(ForecastResult::new(), false);
                RefreshOutcome::Degraded(err)
            }
        }
    }

    /// Performs the first refresh, then hands the coordinator to a background
    /// task that refreshes every [`REFRESH_INTERVAL`]
    ///
    /// Returns only after the first refresh has been published, so readers
    /// obtained from the handle always see a completed cycle.
    pub async fn start(mut self) -> RefreshHandle
    where
        S: 'static,
    {
        self.refresh().await;

        let reader = self.reader();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let task = tokio::spawn(self.run(shutdown_rx));

        RefreshHandle {
            reader,
            shutdown_tx,
            task,
        }
    }

    async fn run(mut self, mut shutdown_rx: mpsc::Receiver<()>) {
        let mut interval = time::interval_at(Instant::now() + REFRESH_INTERVAL, REFRESH_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                _ = async {
                    interval.tick().await;
                    self.refresh().await;
                } => {}
            }
        }

        debug!(location = %self.label, "Refresh loop stopped");
    }

    fn publish(&self, result: ForecastResult, success: bool) {
        self.slot.send_replace(Snapshot {
            result: Arc::new(result),
            last_update_success: success,
            refreshed_at: Some(Local::now()),
        });
    }

    fn log_failure(&self, err: &FetchError) {
        let kind = err.kind();
        match err {
            FetchError::Transport(_) => {
                warn!(location = %self.label, kind, "Network error updating pollen data: {}", err)
            }
            FetchError::Auth { .. } => {
                error!(location = %self.label, kind, "Pollen API rejected the key: {}", err)
            }
            FetchError::Api { .. } | FetchError::Decode(_) => {
                error!(location = %self.label, kind, "Data error updating pollen data: {}", err)
            }
        }
    }
}

/// Non-blocking view of a coordinator's published slot
#[derive(Debug, Clone)]
pub struct ForecastReader {
    rx: watch::Receiver<Snapshot>,
}

impl ForecastReader {
    /// Today's observation for a code
    pub fn latest(&self, code: &str) -> Option<PollenObservation> {
        self.rx.borrow().result.latest(code).cloned()
    }

    /// The whole published result
    pub fn all_latest(&self) -> Arc<ForecastResult> {
        Arc::clone(&self.rx.borrow().result)
    }

    /// A copy of the current snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.rx.borrow().clone()
    }

    pub fn last_update_success(&self) -> bool {
        self.rx.borrow().last_update_success
    }

    /// Waits for the next publication
    ///
    /// Returns `false` once the coordinator is gone and nothing more will be
    /// published.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Handle for a running coordinator
pub struct RefreshHandle {
    reader: ForecastReader,
    /// Channel to signal shutdown
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Returns a reader of the coordinator's slot
    pub fn reader(&self) -> ForecastReader {
        self.reader.clone()
    }

    /// Stops the refresh loop, abandoning any fetch in flight
    ///
    /// Readers keep the last published snapshot.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(err) = self.task.await {
            warn!("Refresh task ended abnormally: {}", err);
        }
    }
}
