//! Error types for adapters.

use clusterwatch_core::{FetchError, FetchErrorKind};
use thiserror::Error;

/// Errors that can occur when collecting metrics from a cluster.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Credentials could not be decoded.
    #[error("invalid kubeconfig encoding: {0}")]
    Credentials(String),

    /// Credentials decoded but are not a usable kubeconfig.
    #[error("invalid kubeconfig: {0}")]
    Kubeconfig(String),

    /// The cluster API answered with an error.
    #[error("API request failed: {0}")]
    Api(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// A resource quantity could not be parsed.
    #[error("invalid quantity '{0}'")]
    Quantity(String),
}

impl From<AdapterError> for FetchError {
    fn from(err: AdapterError) -> Self {
        let kind = match &err {
            AdapterError::Credentials(_) | AdapterError::Kubeconfig(_) => {
                FetchErrorKind::Credentials
            }
            AdapterError::Connection(_) => FetchErrorKind::Connection,
            AdapterError::Api(_) | AdapterError::Quantity(_) => FetchErrorKind::Api,
        };
        FetchError::new(kind, err.to_string())
    }
}

#[cfg(feature = "kubernetes")]
impl From<kube::Error> for AdapterError {
    fn from(err: kube::Error) -> Self {
        match &err {
            kube::Error::Api(_) => AdapterError::Api(err.to_string()),
            kube::Error::HyperError(_) | kube::Error::Service(_) => {
                AdapterError::Connection(err.to_string())
            }
            kube::Error::InferConfig(_) | kube::Error::Auth(_) => {
                AdapterError::Kubeconfig(err.to_string())
            }
            _ => AdapterError::Api(err.to_string()),
        }
    }
}
