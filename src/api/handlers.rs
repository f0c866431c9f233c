use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use clusterwatch_core::{PollError, ServiceHealth};
use clusterwatch_types::{ClusterMetrics, HistoryEntry, Registration, TargetStatus, ValidationError};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use super::error::ApiError;
use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub service: ServiceHealth,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResponse {
    pub name: String,
    pub environment: String,
    pub metrics: ClusterMetrics,
    pub last_update: u64,
    /// "connected" while the latest refresh succeeded, "degraded" otherwise.
    pub status: &'static str,
    pub consecutive_failures: u32,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub name: String,
    pub history: Vec<HistoryEntry>,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: state.service.health(),
    })
}

pub async fn list_clusters(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "clusters": state.registry.names() }))
}

/// Validate, persist, then start polling under the registry lock.
///
/// An existing registration with the same name is replaced and its history
/// starts over.
pub async fn create_cluster(
    State(state): State<AppState>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(registration) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    registration.validate()?;
    if let Some(check) = &state.credential_check {
        check(&registration.credentials).map_err(ValidationError::InvalidCredentials)?;
    }

    let registry = state.registry.clone();
    let service = state.service.clone();
    let persisted = registration.clone();
    blocking(move || registry.insert_with(persisted, |r| service.add_target(r))).await?;

    info!(
        cluster = %registration.name,
        environment = %registration.environment,
        "Registered cluster"
    );

    let body = json!({
        "message": "cluster registered successfully",
        "name": registration.name,
        "environment": registration.environment,
    });

    Ok((StatusCode::CREATED, Json(body)))
}

pub async fn get_cluster(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ClusterResponse>, ApiError> {
    let latest = state.service.get_latest(&name)?;
    let status = state.service.get_status(&name)?;

    Ok(Json(ClusterResponse {
        name: status.name,
        environment: status.environment,
        metrics: latest.metrics,
        last_update: latest.timestamp_ms,
        status: if status.consecutive_failures == 0 {
            "connected"
        } else {
            "degraded"
        },
        consecutive_failures: status.consecutive_failures,
    }))
}

pub async fn get_history(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let history = state.service.get_history(&name)?;
    Ok(Json(HistoryResponse { name, history }))
}

pub async fn get_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<TargetStatus>, ApiError> {
    Ok(Json(state.service.get_status(&name)?))
}

/// Persist the removal, then stop polling under the registry lock.
pub async fn delete_cluster(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.registry.contains(&name) && !state.service.contains(&name) {
        return Err(PollError::NotFound(name).into());
    }

    let registry = state.registry.clone();
    let service = state.service.clone();
    let target = name.clone();
    blocking(move || {
        registry.remove_with(&target, |name| {
            service.remove_target(name);
        })
    })
    .await?;

    info!(cluster = %name, "Removed cluster");

    Ok(Json(json!({
        "message": "cluster deleted successfully",
        "name": name,
    })))
}

/// Run a registry write off the async workers; it does file IO under a lock.
async fn blocking<T, F>(write: F) -> Result<T, ApiError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(write)
        .await
        .map_err(|e| ApiError::Persistence(anyhow::anyhow!("registry write aborted: {e}")))?
        .map_err(ApiError::Persistence)
}
