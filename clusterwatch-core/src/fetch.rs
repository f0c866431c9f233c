//! The capability the scheduler uses to pull a snapshot from one target.

use std::sync::Arc;

use async_trait::async_trait;
use clusterwatch_types::{ClusterMetrics, Credentials};

use crate::error::FetchError;

/// Fetches a metrics snapshot for a single target.
///
/// The scheduler calls this concurrently for different targets, so
/// implementations must not rely on exclusive access to shared state.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use clusterwatch_core::{FetchError, Fetcher};
/// use clusterwatch_types::{ClusterMetrics, Credentials};
///
/// struct EmptyCluster;
///
/// #[async_trait]
/// impl Fetcher for EmptyCluster {
///     async fn fetch(&self, _credentials: &Credentials) -> Result<ClusterMetrics, FetchError> {
///         Ok(ClusterMetrics::default())
///     }
/// }
/// ```
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, credentials: &Credentials) -> Result<ClusterMetrics, FetchError>;
}

#[async_trait]
impl<F> Fetcher for Arc<F>
where
    F: Fetcher + ?Sized,
{
    async fn fetch(&self, credentials: &Credentials) -> Result<ClusterMetrics, FetchError> {
        (**self).fetch(credentials).await
    }
}
