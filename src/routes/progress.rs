use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::AppState;
use crate::constants::ERR_INVALID_TIMESTAMP;
use crate::db;
use crate::error::{AppError, Result};
use crate::models::{Progress, ProgressResponse};
use crate::security::CurrentUser;

#[derive(Debug, Deserialize)]
pub struct ProgressUpdate {
    pub current_timestamp: f64,
}

/// The caller's progress on a video, created on first access
pub async fn get_progress(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(video_id): Path<u64>,
) -> Result<Json<ProgressResponse>> {
    let db = state.db.clone();
    let progress = tokio::task::spawn_blocking(move || {
        if db::videos::get(&db, video_id)?.is_none() {
            return Err(AppError::VideoNotFound);
        }
        db::progress::get_or_create(&db, user.id, video_id)
    })
    .await??;

    Ok(Json(ProgressResponse::from(&progress)))
}

/// Save the watch position; nothing else on the row changes
pub async fn update_progress(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(video_id): Path<u64>,
    Json(payload): Json<ProgressUpdate>,
) -> Result<Json<Value>> {
    let timestamp = payload.current_timestamp;
    if !Progress::is_valid_timestamp(timestamp) {
        return Err(AppError::InvalidInput(ERR_INVALID_TIMESTAMP.to_string()));
    }

    let db = state.db.clone();
    tokio::task::spawn_blocking(move || {
        if db::videos::get(&db, video_id)?.is_none() {
            return Err(AppError::VideoNotFound);
        }
        db::progress::update(&db, user.id, video_id, |progress| {
            progress.current_timestamp = timestamp;
            progress.last_updated = Utc::now().timestamp();
        })
    })
    .await??;

    Ok(Json(json!({ "status": "updated" })))
}
