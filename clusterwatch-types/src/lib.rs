//! # clusterwatch-types
//!
//! Core types shared by the clusterwatch polling engine, its fetchers and
//! its query surfaces.
//!
//! ## Design Goals
//!
//! - **Minimal dependencies**: Types work without any serialization framework
//! - **Optional serialization**: Enable the `serde` feature for JSON and friends
//! - **Opaque snapshots**: The polling engine stores [`ClusterMetrics`] without
//!   ever looking inside; only fetchers build them
//! - **Versioned schema**: Snapshots include version info for forward compatibility
//! - **Ergonomic builders**: Fluent API for constructing snapshots
//!
//! ## Features
//!
//! - `serde`: JSON/YAML/etc. serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use clusterwatch_types::{ClusterMetrics, HistoryEntry, PodPhase};
//!
//! let metrics = ClusterMetrics::builder()
//!     .node("worker-1", |n| n.ready(true).capacity("4", "16Gi"))
//!     .node("worker-2", |n| n.ready(false).capacity("4", "16Gi"))
//!     .pod("default", PodPhase::Running)
//!     .pod("default", PodPhase::Pending)
//!     .service("ClusterIP")
//!     .namespaces(3)
//!     .build();
//!
//! assert_eq!(metrics.nodes.total, 2);
//! assert_eq!(metrics.nodes.ready, 1);
//! assert_eq!(metrics.pods.status.running, 1);
//!
//! let entry = HistoryEntry::new(1703160000000, metrics);
//! assert_eq!(entry.timestamp_ms, 1703160000000);
//! ```
//!
//! ## Schema Version
//!
//! The current schema version is **1**. The version is included in serialized
//! snapshots to allow consumers to handle format evolution gracefully.

mod history;
mod metrics;
mod registration;

pub use history::*;
pub use metrics::*;
pub use registration::*;

/// Version stamped into every [`ClusterMetrics`].
///
/// Increment this when making breaking changes to the snapshot format.
pub const SCHEMA_VERSION: u32 = 1;
