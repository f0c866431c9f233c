//! Per-target history buffer and fetch bookkeeping.

use std::collections::VecDeque;

use clusterwatch_types::{FetchFailure, HistoryEntry, Registration, TargetStatus};
use parking_lot::RwLock;

/// Default number of history entries kept per target.
pub const DEFAULT_HISTORY_DEPTH: usize = 100;

/// One target's registration, bounded history and refresh bookkeeping.
///
/// All state sits behind the monitor's own lock: appends take it
/// exclusively, reads share it. Monitors never touch each other's locks, so
/// refreshing one target never blocks reads of another.
#[derive(Debug)]
pub struct ClusterMonitor {
    registration: Registration,
    capacity: usize,
    state: RwLock<MonitorState>,
}

#[derive(Debug, Default)]
struct MonitorState {
    /// Oldest first.
    history: VecDeque<HistoryEntry>,
    last_update_ms: Option<u64>,
    last_success_ms: Option<u64>,
    consecutive_failures: u32,
    total_failures: u64,
    total_successes: u64,
    last_error: Option<FetchFailure>,
}

impl ClusterMonitor {
    /// Create a monitor with an empty history.
    ///
    /// A capacity of zero is treated as one.
    pub fn new(registration: Registration, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            registration,
            capacity,
            state: RwLock::new(MonitorState {
                history: VecDeque::with_capacity(capacity),
                ..MonitorState::default()
            }),
        }
    }

    /// Append a successful fetch, evicting the oldest entry when full.
    pub fn record(&self, entry: HistoryEntry) {
        let mut state = self.state.write();
        while state.history.len() >= self.capacity {
            state.history.pop_front();
        }
        state.last_update_ms = Some(entry.timestamp_ms);
        state.last_success_ms = Some(entry.timestamp_ms);
        state.consecutive_failures = 0;
        state.total_successes += 1;
        state.history.push_back(entry);
    }

    /// Note a failed fetch. History is left untouched.
    ///
    /// Returns the number of consecutive failures including this one.
    pub fn record_failure(&self, failure: FetchFailure) -> u32 {
        let mut state = self.state.write();
        state.last_update_ms = Some(failure.timestamp_ms);
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.total_failures += 1;
        state.last_error = Some(failure);
        state.consecutive_failures
    }

    /// The most recently appended entry, if any fetch has succeeded yet.
    pub fn latest(&self) -> Option<HistoryEntry> {
        self.state.read().history.back().cloned()
    }

    /// A copy of the full history, oldest first.
    pub fn snapshot_history(&self) -> Vec<HistoryEntry> {
        self.state.read().history.iter().cloned().collect()
    }

    pub fn status(&self) -> TargetStatus {
        let state = self.state.read();
        TargetStatus {
            name: self.registration.name.clone(),
            environment: self.registration.environment.clone(),
            history_len: state.history.len(),
            capacity: self.capacity,
            last_update_ms: state.last_update_ms,
            last_success_ms: state.last_success_ms,
            consecutive_failures: state.consecutive_failures,
            total_failures: state.total_failures,
            total_successes: state.total_successes,
            last_error: state.last_error.clone(),
        }
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    pub fn name(&self) -> &str {
        &self.registration.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.state.read().history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().history.is_empty()
    }
}
