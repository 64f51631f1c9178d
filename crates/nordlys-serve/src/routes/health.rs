//! Health check endpoint.

use axum::extract::State;
use axum::Json;

use crate::error::ApiError;
use crate::state::AppState;

/// `GET /health`
///
/// Confirms the process is up and the database answers.
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.health_check().await?;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "feeds": state.registry.len(),
    })))
}
