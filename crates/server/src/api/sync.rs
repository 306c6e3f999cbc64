//! Sync control API handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use pokeindex_core::{SyncError, SyncStatus};

use super::handlers::{api_error, internal_error, ApiError, SuccessResponse};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SyncStatusResponse {
    #[serde(flatten)]
    pub status: SyncStatus,
    pub records: u64,
}

fn sync_error(err: SyncError) -> ApiError {
    match err {
        SyncError::ControllerStopped => api_error(StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        other => internal_error(other),
    }
}

/// POST /api/v1/sync
///
/// Start (or resume) the catalog sync. Returns immediately.
pub async fn start_sync(State(state): State<Arc<AppState>>) -> (StatusCode, Json<SuccessResponse>) {
    state.sync().sync_all_catalog().await;
    (
        StatusCode::ACCEPTED,
        Json(SuccessResponse {
            message: "Catalog sync started".to_string(),
        }),
    )
}

/// GET /api/v1/sync/status
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SyncStatusResponse>, ApiError> {
    let status = state.sync().status().await.map_err(sync_error)?;
    let records = state.store().count().map_err(internal_error)?;
    Ok(Json(SyncStatusResponse { status, records }))
}

/// POST /api/v1/reset
///
/// Delete every cached record and forget pagination progress.
pub async fn reset(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.sync().reset_all().await.map_err(sync_error)?;
    Ok(Json(SuccessResponse {
        message: "All records deleted".to_string(),
    }))
}
