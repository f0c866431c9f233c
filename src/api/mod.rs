//! HTTP façade over the polling service and the persistent registry.
//!
//! | Method | Path                        | Auth |
//! |--------|-----------------------------|------|
//! | GET    | `/health`                   | no   |
//! | GET    | `/clusters`                 | yes  |
//! | POST   | `/clusters`                 | yes  |
//! | GET    | `/clusters/:name`           | yes  |
//! | DELETE | `/clusters/:name`           | yes  |
//! | GET    | `/clusters/:name/history`   | yes  |
//! | GET    | `/clusters/:name/status`    | yes  |
//!
//! `/dashboard` serves static files when a directory is configured.

mod auth;
mod error;
mod handlers;

use std::path::Path;
use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use clusterwatch_core::PollingService;
use clusterwatch_types::Credentials;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use auth::API_KEY_HEADER;
pub use error::ApiError;

use crate::registry::Registry;

/// Fetcher-specific credential check run before a registration is accepted.
pub type CredentialCheck = Arc<dyn Fn(&Credentials) -> Result<(), String> + Send + Sync>;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: PollingService,
    pub registry: Arc<Registry>,
    pub credential_check: Option<CredentialCheck>,
    /// `None` leaves `/clusters` open; the binary only does this under `auth_disabled`.
    pub api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(service: PollingService, registry: Arc<Registry>) -> Self {
        Self {
            service,
            registry,
            credential_check: None,
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_credential_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&Credentials) -> Result<(), String> + Send + Sync + 'static,
    {
        self.credential_check = Some(Arc::new(check));
        self
    }
}

/// Build the application router.
pub fn router(state: AppState, dashboard_dir: Option<&Path>) -> Router {
    let clusters = Router::new()
        .route(
            "/clusters",
            get(handlers::list_clusters).post(handlers::create_cluster),
        )
        .route(
            "/clusters/:name",
            get(handlers::get_cluster).delete(handlers::delete_cluster),
        )
        .route("/clusters/:name/history", get(handlers::get_history))
        .route("/clusters/:name/status", get(handlers::get_status))
        .route_layer(from_fn_with_state(state.clone(), auth::require_api_key));

    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .merge(clusters);

    if let Some(dir) = dashboard_dir {
        app = app.nest_service("/dashboard", ServeDir::new(dir));
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    app.layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
