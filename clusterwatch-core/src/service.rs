//! The polling service: target registry, refresh scheduler and queries.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clusterwatch_types::{
    current_timestamp_ms, FetchFailure, HistoryEntry, Registration, TargetStatus,
};
use parking_lot::RwLock;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::{FetchError, PollError};
use crate::fetch::Fetcher;
use crate::handle::PollerHandle;
use crate::monitor::{ClusterMonitor, DEFAULT_HISTORY_DEPTH};

/// Tuning for the refresh scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Time between refresh cycles, measured from tick start.
    pub interval: Duration,

    /// History entries retained per target.
    pub history_depth: usize,

    /// Upper bound on fetches in flight at once across all targets.
    pub max_concurrent_fetches: usize,

    /// Budget for a single fetch; exceeding it counts as a failure.
    pub fetch_timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            history_depth: DEFAULT_HISTORY_DEPTH,
            max_concurrent_fetches: 16,
            fetch_timeout: Duration::from_secs(20),
        }
    }
}

/// Outcome of one refresh cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CycleReport {
    /// Targets captured at the start of the cycle.
    pub targets: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Liveness view of the service as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ServiceHealth {
    /// Whether the background scheduler is currently running.
    pub running: bool,
    pub targets: usize,
    pub cycles_completed: u64,
    pub last_cycle_started_ms: Option<u64>,
}

/// Refreshes a dynamic set of targets on a fixed interval and serves their
/// latest snapshot and bounded history.
///
/// Cloning is cheap and every clone shares the same registry, so the
/// service can be handed to a query façade while the scheduler runs.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
///
/// use async_trait::async_trait;
/// use clusterwatch_core::{FetchError, Fetcher, PollingService};
/// use clusterwatch_types::{ClusterMetrics, Credentials, Registration};
///
/// struct EmptyCluster;
///
/// #[async_trait]
/// impl Fetcher for EmptyCluster {
///     async fn fetch(&self, _credentials: &Credentials) -> Result<ClusterMetrics, FetchError> {
///         Ok(ClusterMetrics::default())
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let service = PollingService::builder(EmptyCluster)
///         .interval(Duration::from_secs(30))
///         .history_depth(100)
///         .build();
///
///     service.add_target(Registration::new("prod", "production", "a2luZDogQ29uZmln"));
///
///     // Refresh runs in the background
///     let handle = service.start().unwrap();
///
///     tokio::time::sleep(Duration::from_secs(1)).await;
///     if let Ok(entry) = service.get_latest("prod") {
///         println!("prod has {} nodes", entry.metrics.nodes.total);
///     }
///
///     handle.shutdown().await;
/// }
/// ```
#[derive(Clone)]
pub struct PollingService {
    shared: Arc<Shared>,
}

struct Shared {
    fetcher: Arc<dyn Fetcher>,
    config: PollerConfig,
    targets: RwLock<BTreeMap<String, Arc<ClusterMonitor>>>,
    limiter: Arc<Semaphore>,
    started: AtomicBool,
    running: AtomicBool,
    cycles_completed: AtomicU64,
    /// Zero until the first cycle starts.
    last_cycle_started_ms: AtomicU64,
}

impl PollingService {
    /// Create a service with the default configuration.
    pub fn new<F>(fetcher: F) -> Self
    where
        F: Fetcher + 'static,
    {
        Self::builder(fetcher).build()
    }

    /// Create a builder for configuring the service.
    pub fn builder<F>(fetcher: F) -> PollingServiceBuilder
    where
        F: Fetcher + 'static,
    {
        PollingServiceBuilder::new(Arc::new(fetcher))
    }

    pub fn config(&self) -> &PollerConfig {
        &self.shared.config
    }

    /// Register a target with an empty history.
    ///
    /// Re-adding an existing name replaces its monitor, dropping prior
    /// history and failure counts. Callers validate the registration first.
    pub fn add_target(&self, registration: Registration) {
        let name = registration.name.clone();
        let monitor = Arc::new(ClusterMonitor::new(
            registration,
            self.shared.config.history_depth,
        ));

        let replaced = self.shared.targets.write().insert(name.clone(), monitor);
        if replaced.is_some() {
            info!(target_name = %name, "Replaced target, history reset");
        } else {
            info!(target_name = %name, "Added target");
        }
    }

    /// Discard a target and its history.
    ///
    /// Returns `false` if no target had this name.
    pub fn remove_target(&self, name: &str) -> bool {
        let removed = self.shared.targets.write().remove(name).is_some();
        if removed {
            info!(target_name = %name, "Removed target");
        }
        removed
    }

    /// The most recent successful snapshot for `name`.
    pub fn get_latest(&self, name: &str) -> Result<HistoryEntry, PollError> {
        self.monitor(name)?
            .latest()
            .ok_or_else(|| PollError::NoDataYet(name.to_string()))
    }

    /// All retained snapshots for `name`, oldest first. Empty until the
    /// first successful refresh.
    pub fn get_history(&self, name: &str) -> Result<Vec<HistoryEntry>, PollError> {
        Ok(self.monitor(name)?.snapshot_history())
    }

    pub fn get_status(&self, name: &str) -> Result<TargetStatus, PollError> {
        Ok(self.monitor(name)?.status())
    }

    /// Status of every registered target, ordered by name.
    pub fn statuses(&self) -> Vec<TargetStatus> {
        self.snapshot_monitors()
            .iter()
            .map(|monitor| monitor.status())
            .collect()
    }

    /// Registered target names in sorted order.
    pub fn targets(&self) -> Vec<String> {
        self.shared.targets.read().keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.shared.targets.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.shared.targets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.targets.read().is_empty()
    }

    pub fn health(&self) -> ServiceHealth {
        let last = self.shared.last_cycle_started_ms.load(Ordering::Relaxed);
        ServiceHealth {
            running: self.shared.running.load(Ordering::Relaxed),
            targets: self.len(),
            cycles_completed: self.shared.cycles_completed.load(Ordering::Relaxed),
            last_cycle_started_ms: (last != 0).then_some(last),
        }
    }

    /// Run a single refresh cycle over every currently registered target
    /// and wait for all of its fetches to settle.
    pub async fn refresh_once(&self) -> CycleReport {
        self.shared.clone().refresh().await
    }

    /// Start the background scheduler.
    ///
    /// Returns immediately; the first cycle begins right away and later
    /// cycles follow every `interval`. Can only be called once per service.
    pub fn start(&self) -> Result<PollerHandle, PollError> {
        if self.shared.started.swap(true, Ordering::SeqCst) {
            return Err(PollError::AlreadyStarted);
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let shared = self.shared.clone();
        // Flip before spawning so health() never reports a started service as idle
        shared.running.store(true, Ordering::Relaxed);
        let task = tokio::spawn(run_scheduler(shared, stop_rx));

        info!(
            interval = ?self.shared.config.interval,
            max_concurrent_fetches = self.shared.config.max_concurrent_fetches,
            "Started refresh scheduler"
        );
        Ok(PollerHandle::new(stop_tx, task))
    }

    fn monitor(&self, name: &str) -> Result<Arc<ClusterMonitor>, PollError> {
        self.shared
            .targets
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| PollError::NotFound(name.to_string()))
    }

    fn snapshot_monitors(&self) -> Vec<Arc<ClusterMonitor>> {
        self.shared.targets.read().values().cloned().collect()
    }
}

impl std::fmt::Debug for PollingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingService")
            .field("config", &self.shared.config)
            .field("targets", &self.len())
            .finish()
    }
}

async fn run_scheduler(shared: Arc<Shared>, mut stop_rx: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(shared.config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut in_flight: Option<JoinHandle<CycleReport>> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let busy = in_flight.as_ref().is_some_and(|cycle| !cycle.is_finished());
                if busy {
                    debug!("Previous refresh cycle still running, skipping tick");
                } else {
                    in_flight = Some(tokio::spawn(shared.clone().refresh()));
                }
            }
            changed = stop_rx.changed() => {
                // A dropped handle counts as a stop request
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
        }
    }

    if let Some(cycle) = in_flight.take() {
        debug!("Waiting for in-flight refresh cycle");
        if let Err(err) = cycle.await {
            warn!(error = %err, "Refresh cycle ended abnormally");
        }
    }

    shared.running.store(false, Ordering::Relaxed);
    info!("Stopped refresh scheduler");
}

impl Shared {
    async fn refresh(self: Arc<Self>) -> CycleReport {
        self.last_cycle_started_ms
            .store(current_timestamp_ms(), Ordering::Relaxed);

        // Point-in-time copy; the registry lock is released before any fetch
        let monitors: Vec<Arc<ClusterMonitor>> = self.targets.read().values().cloned().collect();

        let mut report = CycleReport {
            targets: monitors.len(),
            ..CycleReport::default()
        };

        let tasks: Vec<_> = monitors
            .into_iter()
            .map(|monitor| tokio::spawn(self.clone().refresh_target(monitor)))
            .collect();

        for task in tasks {
            match task.await {
                Ok(true) => report.succeeded += 1,
                Ok(false) | Err(_) => report.failed += 1,
            }
        }

        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        debug!(
            targets = report.targets,
            succeeded = report.succeeded,
            failed = report.failed,
            "Refresh cycle complete"
        );
        report
    }

    /// Fetch one target and record the outcome on its monitor.
    async fn refresh_target(self: Arc<Self>, monitor: Arc<ClusterMonitor>) -> bool {
        let _permit = match self.limiter.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return false,
        };

        let fetcher = self.fetcher.clone();
        let credentials = monitor.registration().credentials.clone();
        // Own task so a panicking fetcher only takes down this target's fetch
        let fetch = tokio::spawn(async move { fetcher.fetch(&credentials).await });
        let abort = fetch.abort_handle();

        let timeout = self.config.fetch_timeout;
        let outcome = match tokio::time::timeout(timeout, fetch).await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) if err.is_panic() => Err(FetchError::other("fetch panicked")),
            Ok(Err(_)) => Err(FetchError::other("fetch cancelled")),
            Err(_) => {
                abort.abort();
                Err(FetchError::timed_out(timeout))
            }
        };

        match outcome {
            Ok(metrics) => {
                monitor.record(HistoryEntry::now(metrics));
                true
            }
            Err(err) => {
                let failure = FetchFailure::new(current_timestamp_ms(), err.to_string());
                let consecutive = monitor.record_failure(failure);
                warn!(
                    target_name = %monitor.name(),
                    error = %err,
                    consecutive_failures = consecutive,
                    "Failed to refresh target"
                );
                false
            }
        }
    }
}

/// Builder for configuring a [`PollingService`].
pub struct PollingServiceBuilder {
    fetcher: Arc<dyn Fetcher>,
    config: PollerConfig,
}

impl PollingServiceBuilder {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            config: PollerConfig::default(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: PollerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the refresh interval.
    ///
    /// Defaults to 30 seconds.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Set how many snapshots each target retains.
    ///
    /// Defaults to 100.
    pub fn history_depth(mut self, depth: usize) -> Self {
        self.config.history_depth = depth;
        self
    }

    pub fn max_concurrent_fetches(mut self, max: usize) -> Self {
        self.config.max_concurrent_fetches = max;
        self
    }

    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch_timeout = timeout;
        self
    }

    /// Build the service. Zero values are raised to their smallest usable
    /// setting.
    pub fn build(self) -> PollingService {
        let mut config = self.config;
        config.interval = config.interval.max(Duration::from_millis(1));
        config.history_depth = config.history_depth.max(1);
        config.max_concurrent_fetches = config.max_concurrent_fetches.max(1);

        PollingService {
            shared: Arc::new(Shared {
                fetcher: self.fetcher,
                limiter: Arc::new(Semaphore::new(config.max_concurrent_fetches)),
                config,
                targets: RwLock::new(BTreeMap::new()),
                started: AtomicBool::new(false),
                running: AtomicBool::new(false),
                cycles_completed: AtomicU64::new(0),
                last_cycle_started_ms: AtomicU64::new(0),
            }),
        }
    }
}
