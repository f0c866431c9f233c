//! History entries and per-target fetch status.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::ClusterMetrics;

/// One successful fetch: when it was captured and what it returned.
///
/// Created exactly once per successful fetch and never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct HistoryEntry {
    /// Unix timestamp in milliseconds when the snapshot was captured.
    pub timestamp_ms: u64,

    pub metrics: ClusterMetrics,
}

impl HistoryEntry {
    pub fn new(timestamp_ms: u64, metrics: ClusterMetrics) -> Self {
        Self {
            timestamp_ms,
            metrics,
        }
    }

    /// Stamp `metrics` with the current wall-clock time.
    pub fn now(metrics: ClusterMetrics) -> Self {
        Self::new(current_timestamp_ms(), metrics)
    }
}

/// The most recent failed fetch for a target.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct FetchFailure {
    pub timestamp_ms: u64,
    pub message: String,
}

impl FetchFailure {
    pub fn new(timestamp_ms: u64, message: impl Into<String>) -> Self {
        Self {
            timestamp_ms,
            message: message.into(),
        }
    }
}

/// Read-only view of a target's refresh health.
///
/// Lets callers tell "healthy but slow to report" apart from "has been
/// failing for hours".
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct TargetStatus {
    pub name: String,
    pub environment: String,

    /// Entries currently held in the history buffer.
    pub history_len: usize,

    /// Maximum number of entries the buffer retains.
    pub capacity: usize,

    /// Timestamp of the last refresh attempt that completed, success or not.
    pub last_update_ms: Option<u64>,

    /// Timestamp of the last successful refresh.
    pub last_success_ms: Option<u64>,

    /// Failed refreshes since the last success.
    pub consecutive_failures: u32,

    pub total_failures: u64,
    pub total_successes: u64,

    pub last_error: Option<FetchFailure>,
}

impl TargetStatus {
    /// True once the target has reported and its latest refresh succeeded.
    pub fn is_healthy(&self) -> bool {
        self.last_success_ms.is_some() && self.consecutive_failures == 0
    }

    /// True until the first successful refresh.
    pub fn awaiting_first_fetch(&self) -> bool {
        self.last_success_ms.is_none()
    }
}

/// Get current timestamp in milliseconds since Unix epoch.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
