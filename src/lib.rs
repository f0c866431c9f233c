//! # clusterwatch
//!
//! Polls a set of Kubernetes clusters on a fixed interval and serves each
//! cluster's latest metrics and recent history over HTTP.
//!
//! ## Architecture
//!
//! ```text
//!  HTTP ──▶ api ──▶ PollingService (core) ──▶ KubeFetcher (adapters)
//!            │
//!            ▼
//!         registry ◀──▶ clusters.json
//! ```
//!
//! - **[`api`]**: HTTP routes, API-key guard and error mapping
//! - **[`registry`]**: Durable set of registrations, reloaded at startup
//! - **[`config`]**: Layered settings (defaults, file, env, flags)
//! - **[`duration`]**: Human-readable durations such as `30s` or `1m`
//!
//! The polling engine itself lives in `clusterwatch-core` and the
//! Kubernetes fetcher in `clusterwatch-adapters`.

pub mod api;
pub mod config;
pub mod duration;
pub mod registry;

pub use api::{router, AppState};
pub use config::{Overrides, Settings};
pub use registry::{FileRegistry, Registry, RegistryStore};
