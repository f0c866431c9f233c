//! Layered server settings.
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML
//! file, `CLUSTERWATCH_*` environment variables, then command-line flags.
//!
//! ```toml
//! listen_addr = "0.0.0.0:8080"
//! registry_path = "clusters.json"
//! refresh_interval = "30s"
//! history_depth = 100
//! max_concurrent_fetches = 16
//! fetch_timeout = "20s"
//! api_key = "change-me"
//! # auth_disabled = true
//! dashboard_dir = "./static"
//! log_level = "info"
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clusterwatch_core::PollerConfig;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::duration::parse_duration;

const ENV_PREFIX: &str = "CLUSTERWATCH";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub listen_addr: String,
    pub registry_path: PathBuf,
    pub refresh_interval: String,
    pub history_depth: usize,
    pub max_concurrent_fetches: usize,
    pub fetch_timeout: String,
    /// Required unless `auth_disabled` is set.
    pub api_key: Option<String>,
    /// Serve `/clusters` without a key. Must be asked for explicitly.
    pub auth_disabled: bool,
    pub dashboard_dir: Option<PathBuf>,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            registry_path: PathBuf::from("clusters.json"),
            refresh_interval: "30s".to_string(),
            history_depth: 100,
            max_concurrent_fetches: 16,
            fetch_timeout: "20s".to_string(),
            api_key: None,
            auth_disabled: false,
            dashboard_dir: None,
            log_level: "info".to_string(),
        }
    }
}

/// Command-line values that win over every other source.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listen_addr: Option<String>,
    pub registry_path: Option<PathBuf>,
    pub refresh_interval: Option<String>,
    pub history_depth: Option<usize>,
    pub dashboard_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub auth_disabled: Option<bool>,
}

impl Settings {
    /// Load settings from all sources.
    pub fn load(config_path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .set_override_option("listen_addr", overrides.listen_addr.clone())?
            .set_override_option(
                "registry_path",
                overrides.registry_path.as_deref().map(path_string),
            )?
            .set_override_option("refresh_interval", overrides.refresh_interval.clone())?
            .set_override_option(
                "history_depth",
                overrides.history_depth.map(|d| d as i64),
            )?
            .set_override_option(
                "dashboard_dir",
                overrides.dashboard_dir.as_deref().map(path_string),
            )?
            .set_override_option("log_level", overrides.log_level.clone())?
            .set_override_option("auth_disabled", overrides.auth_disabled)?;

        let settings: Settings = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check the values that are parsed lazily, so a bad file fails at startup.
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;
        self.poller_config()?;
        anyhow::ensure!(
            self.auth_disabled || self.api_key().is_some(),
            "api_key is required; set auth_disabled = true (or pass --no-auth) to serve without one"
        );
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_addr
            .parse()
            .with_context(|| format!("Invalid listen_addr: {}", self.listen_addr))
    }

    pub fn poller_config(&self) -> Result<PollerConfig> {
        let interval = parse_duration(&self.refresh_interval)
            .with_context(|| format!("Invalid refresh_interval: {}", self.refresh_interval))?;
        let fetch_timeout = parse_duration(&self.fetch_timeout)
            .with_context(|| format!("Invalid fetch_timeout: {}", self.fetch_timeout))?;

        anyhow::ensure!(!interval.is_zero(), "refresh_interval must be greater than zero");
        anyhow::ensure!(!fetch_timeout.is_zero(), "fetch_timeout must be greater than zero");
        anyhow::ensure!(self.history_depth > 0, "history_depth must be at least 1");

        Ok(PollerConfig {
            interval,
            history_depth: self.history_depth,
            max_concurrent_fetches: self.max_concurrent_fetches.max(1),
            fetch_timeout,
        })
    }

    /// The API key, treating an empty string as unset.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
