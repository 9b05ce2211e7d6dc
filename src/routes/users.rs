use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{
    models::{auth::AuthenticatedUser, user::RegisterRequest},
    services::auth::AuthService,
    AppState,
};

/// POST /users — public sign-up
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    AuthService::register(&state.db, &body)
        .await
        .map(|profile| (StatusCode::CREATED, Json(json!(profile))))
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))))
}

/// GET /users/me
pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match AuthService::profile(&state.db, user.user_id).await {
        Ok(Some(profile)) => Ok(Json(json!(profile))),
        Ok(None) => Err((StatusCode::NOT_FOUND, Json(json!({ "error": "User not found" })))),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )),
    }
}
