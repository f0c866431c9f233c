//! # clusterwatch-adapters
//!
//! Pre-built fetchers for collecting metrics from clusters.
//!
//! Each adapter implements [`clusterwatch_core::Fetcher`], so it can be
//! handed straight to a [`PollingService`](clusterwatch_core::PollingService).
//!
//! ## Supported Systems
//!
//! - **Kubernetes** (`kubernetes` feature, on by default) - Collects node
//!   readiness, pod phases, service types and resource capacity/usage via
//!   the core API and `metrics.k8s.io`
//!
//! ## Quick Start (Kubernetes)
//!
//! ```rust,no_run
//! use clusterwatch_adapters::kubernetes::KubeFetcher;
//! use clusterwatch_core::PollingService;
//! use clusterwatch_types::Registration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = PollingService::new(KubeFetcher::default());
//!     service.add_target(Registration::new(
//!         "prod",
//!         "production",
//!         std::env::var("KUBECONFIG_B64")?,
//!     ));
//!
//!     let report = service.refresh_once().await;
//!     println!("{} of {} clusters refreshed", report.succeeded, report.targets);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod quantity;

#[cfg(feature = "kubernetes")]
pub mod kubernetes;

pub use error::AdapterError;

// Re-export types for convenience
pub use clusterwatch_types::{ClusterMetrics, Credentials, ResourceUsage};
