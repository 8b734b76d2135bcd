use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::AppState;
use crate::db;

/// Landing endpoint
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "TubeTutor API" }))
}

/// Health check endpoint
///
/// Returns the health status of the server and database connection.
/// Used by load balancers and monitoring systems.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let db = state.db.clone();
    let db_status = tokio::task::spawn_blocking(move || {
        if db::ping(&db) {
            "connected"
        } else {
            "disconnected"
        }
    })
    .await
    .unwrap_or("error");

    Json(json!({
        "status": if db_status == "connected" { "healthy" } else { "unhealthy" },
        "database": db_status,
        "llm": if state.tutor.is_enabled() { "configured" } else { "fallback" },
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
