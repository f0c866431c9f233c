use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use clusterwatch::{router, AppState, FileRegistry, Overrides, Registry, Settings};
use clusterwatch_adapters::kubernetes::KubeFetcher;
use clusterwatch_core::PollingService;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "clusterwatch")]
#[command(about = "Polls Kubernetes clusters and serves their metrics over HTTP")]
#[command(version)]
struct Args {
    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (e.g., "0.0.0.0:8080")
    #[arg(short, long)]
    listen: Option<String>,

    /// Path of the cluster registry file
    #[arg(short, long)]
    registry: Option<PathBuf>,

    /// Refresh interval (e.g., "30s", "1m")
    #[arg(short, long)]
    interval: Option<String>,

    /// Snapshots kept per cluster
    #[arg(long)]
    history_depth: Option<usize>,

    /// Directory served under /dashboard
    #[arg(long)]
    dashboard: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,

    /// Serve /clusters without an API key
    #[arg(long)]
    no_auth: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            listen_addr: self.listen.clone(),
            registry_path: self.registry.clone(),
            refresh_interval: self.interval.clone(),
            history_depth: self.history_depth,
            dashboard_dir: self.dashboard.clone(),
            log_level: self.log_level.clone(),
            auth_disabled: self.no_auth.then_some(true),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref(), &args.overrides())?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .context("Invalid log_level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let registry = Registry::open(FileRegistry::new(&settings.registry_path))
        .with_context(|| format!("Failed to load {}", settings.registry_path.display()))?;
    let registry = Arc::new(registry);

    let service = PollingService::builder(KubeFetcher::default())
        .config(settings.poller_config()?)
        .build();
    for registration in registry.list() {
        service.add_target(registration);
    }
    info!(
        clusters = service.len(),
        path = %settings.registry_path.display(),
        "Loaded cluster registry"
    );

    let mut state = AppState::new(service.clone(), registry)
        .with_credential_check(|creds| {
            KubeFetcher::validate_credentials(creds).map_err(|e| e.to_string())
        });
    if settings.auth_disabled {
        warn!("Authentication disabled, /clusters endpoints are open to anyone");
    } else if let Some(key) = settings.api_key() {
        state = state.with_api_key(key);
    }

    let app = router(state, settings.dashboard_dir.as_deref());

    let handle = service.start()?;

    let addr = settings.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down poller");
    handle.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
