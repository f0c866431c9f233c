//! Registration - identifies one monitored cluster.

use std::fmt;

use thiserror::Error;

/// One monitored target.
///
/// `name` is the primary key and is never changed once stored. The
/// credentials are opaque to everything except the fetcher that knows how to
/// use them (a base64-encoded kubeconfig for the Kubernetes fetcher).
///
/// # Example
///
/// ```rust
/// use clusterwatch_types::Registration;
///
/// let reg = Registration::new("prod-eu", "production", "YXBpVmVyc2lvbjogdjE=");
/// assert!(reg.validate().is_ok());
///
/// let bad = Registration::new("  ", "production", "YXBpVmVyc2lvbjogdjE=");
/// assert!(bad.validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Registration {
    /// Unique name of the cluster.
    pub name: String,

    /// Connection credentials handed to the fetcher.
    #[cfg_attr(feature = "serde", serde(rename = "kubeConfig"))]
    pub credentials: Credentials,

    /// Free-form environment label (e.g. "production", "staging").
    pub environment: String,
}

impl Registration {
    pub fn new(
        name: impl Into<String>,
        environment: impl Into<String>,
        credentials: impl Into<Credentials>,
    ) -> Self {
        Self {
            name: name.into(),
            credentials: credentials.into(),
            environment: environment.into(),
        }
    }

    /// Check the fields every registration needs regardless of fetcher.
    ///
    /// Fetcher-specific checks (e.g. that the credentials parse as a
    /// kubeconfig) are the fetcher's business.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.environment.trim().is_empty() {
            return Err(ValidationError::MissingField("environment"));
        }
        if self.credentials.is_empty() {
            return Err(ValidationError::MissingField("kubeConfig"));
        }
        Ok(())
    }
}

/// Opaque connection credentials.
///
/// The `Debug` impl never prints the secret.
#[derive(Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Credentials(String);

impl Credentials {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for Credentials {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for Credentials {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credentials")
            .field(&format_args!("<{} bytes redacted>", self.0.len()))
            .finish()
    }
}

/// A registration was rejected before reaching the polling engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was empty or whitespace.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The credentials could not be decoded or parsed.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
}
