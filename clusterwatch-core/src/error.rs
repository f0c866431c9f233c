//! Error types for the polling engine.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Errors returned synchronously by [`PollingService`](crate::PollingService)
/// operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    /// No target is registered under this name.
    #[error("cluster '{0}' not found")]
    NotFound(String),

    /// The target is registered but has never been refreshed successfully.
    #[error("no metrics available yet for cluster '{0}'")]
    NoDataYet(String),

    /// `start` was called on a service whose scheduler is already running.
    #[error("poller already started")]
    AlreadyStarted,
}

/// Broad classification of a fetch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Credentials could not be decoded or were rejected.
    Credentials,
    /// The cluster could not be reached.
    Connection,
    /// The cluster answered with an error.
    Api,
    /// The fetch exceeded its time budget.
    Timeout,
    /// Anything else, including a fetch that panicked.
    Other,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FetchErrorKind::Credentials => "credentials",
            FetchErrorKind::Connection => "connection",
            FetchErrorKind::Api => "api",
            FetchErrorKind::Timeout => "timeout",
            FetchErrorKind::Other => "other",
        };
        f.write_str(label)
    }
}

/// A single target's fetch failed during a refresh cycle.
///
/// Never fatal: the monitor records it and the scheduler moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} error: {message}")]
pub struct FetchError {
    kind: FetchErrorKind,
    message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Connection, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Other, message)
    }

    pub(crate) fn timed_out(after: Duration) -> Self {
        Self::new(
            FetchErrorKind::Timeout,
            format!("fetch timed out after {:?}", after),
        )
    }

    pub fn kind(&self) -> FetchErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
