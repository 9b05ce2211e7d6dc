use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::AppState;

/// GET /health — database probe plus the active selection/broadcast settings
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let settings = json!({
        "selection_cutoff_hour": state.config.selection_cutoff_hour,
        "menu_broadcast_enabled": state.config.menu_broadcast_enabled,
    });
    match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "db": "connected", "settings": settings })),
        ),
        Err(e) => {
            tracing::warn!("Health check: database unreachable: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "error", "db": e.to_string() })),
            )
        }
    }
}
