//! # clusterwatch-core
//!
//! Multi-target polling engine with a bounded per-target history.
//!
//! A [`PollingService`] owns a set of named targets. A background scheduler
//! refreshes every target on a fixed interval through a [`Fetcher`] and
//! appends each successful snapshot to that target's [`ClusterMonitor`],
//! evicting the oldest entry once the history is full. Queries read the
//! latest snapshot or the full history of one target without blocking the
//! scheduler or each other.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use clusterwatch_core::{FetchError, Fetcher, PollingService};
//! use clusterwatch_types::{ClusterMetrics, Credentials, Registration};
//!
//! struct StaticFetcher;
//!
//! #[async_trait]
//! impl Fetcher for StaticFetcher {
//!     async fn fetch(&self, _credentials: &Credentials) -> Result<ClusterMetrics, FetchError> {
//!         Ok(ClusterMetrics::builder().namespaces(4).build())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = PollingService::new(StaticFetcher);
//!     service.add_target(Registration::new("prod", "production", "a2luZDogQ29uZmln"));
//!
//!     // One cycle by hand; `start()` runs them in the background
//!     let report = service.refresh_once().await;
//!     assert_eq!(report.succeeded, 1);
//!
//!     let latest = service.get_latest("prod").unwrap();
//!     assert_eq!(latest.metrics.namespaces, 4);
//! }
//! ```
//!
//! ## Features
//!
//! - **Independent targets**: one slow or failing cluster never delays another
//! - **Bounded memory**: FIFO history per target, 100 entries by default
//! - **Failure tracking**: consecutive failures and the last error per target
//! - **Bounded fan-out**: a semaphore caps fetches in flight
//! - **Non-blocking reads**: per-target locks, never held across an await

mod error;
mod fetch;
mod handle;
mod monitor;
mod service;

pub use error::{FetchError, FetchErrorKind, PollError};
pub use fetch::Fetcher;
pub use handle::PollerHandle;
pub use monitor::{ClusterMonitor, DEFAULT_HISTORY_DEPTH};
pub use service::{CycleReport, PollerConfig, PollingService, PollingServiceBuilder, ServiceHealth};

// Re-export types for convenience
pub use clusterwatch_types::{
    ClusterMetrics, Credentials, FetchFailure, HistoryEntry, Registration, TargetStatus,
};
