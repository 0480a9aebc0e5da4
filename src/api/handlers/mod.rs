use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::{AppState, VerifiedUser};
use crate::error::{StoreError, SyncError};
use crate::models::TaskFailure;

/// Body returned by the per-user sync routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    pub message: String,
    pub created: usize,
    pub already_synced: usize,
    pub errors: Vec<TaskFailure>,
}

/// Body returned by the fan-out route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub message: String,
    pub triggered: usize,
}

// ============================================================
// Error Handling
// ============================================================

/// Map a sync failure to a response. Internal details are logged, not
/// returned.
fn sync_error(e: SyncError) -> Result<Json<SyncResponse>, (StatusCode, String)> {
    match e {
        SyncError::NoTasks(uid) => {
            tracing::info!(uid = %uid, "No task list to sync");
            Ok(Json(SyncResponse {
                message: "No tasks to sync".to_string(),
                created: 0,
                already_synced: 0,
                errors: Vec::new(),
            }))
        }
        SyncError::NoCredential(uid) => {
            tracing::info!(uid = %uid, "Calendar not connected");
            Err((
                StatusCode::NOT_FOUND,
                "Calendar not connected".to_string(),
            ))
        }
        SyncError::Store(StoreError::InvalidPath(path)) => {
            tracing::warn!("Validation error: invalid path {}", path);
            Err((StatusCode::BAD_REQUEST, "Invalid user id".to_string()))
        }
        other => {
            tracing::error!("Internal error: {}", other);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ))
        }
    }
}

async fn run_sync(state: &AppState, uid: &str) -> Result<Json<SyncResponse>, (StatusCode, String)> {
    match state.executor.sync(uid).await {
        Ok(report) => Ok(Json(SyncResponse {
            message: format!("Synced {} new events", report.created),
            created: report.created,
            already_synced: report.already_synced,
            errors: report.errors,
        })),
        Err(e) => sync_error(e),
    }
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Sync
// ============================================================

/// Sync the authenticated caller's own tasks and wait for the result.
pub async fn sync_self(
    State(state): State<AppState>,
    Extension(user): Extension<VerifiedUser>,
) -> Result<Json<SyncResponse>, (StatusCode, String)> {
    run_sync(&state, &user.uid).await
}

/// Sync one user on behalf of the scheduler.
pub async fn sync_user(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<SyncResponse>, (StatusCode, String)> {
    run_sync(&state, &uid).await
}

/// Dispatch a sync for every connected user and return without waiting.
pub async fn sync_all(
    State(state): State<AppState>,
) -> Result<Json<TriggerResponse>, (StatusCode, String)> {
    let summary = state.fanout.trigger_all().map_err(|e| {
        tracing::error!("Internal error: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    })?;

    Ok(Json(TriggerResponse {
        message: format!("Triggered sync for {} users", summary.triggered),
        triggered: summary.triggered,
    }))
}
