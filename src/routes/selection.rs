use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    models::{
        auth::AuthenticatedUser,
        selection::{CreateSelectionRequest, SelectionListQuery, UpdateSelectionRequest},
    },
    services::{
        date_window::{local_now, to_local},
        eligibility::check_selection,
        menu::MenuService,
        metrics::SELECTIONS_COUNTER,
        selection::SelectionService,
    },
    AppState,
};

fn internal(e: anyhow::Error) -> (StatusCode, Json<Value>) {
    tracing::error!("Selection storage error: {e:#}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
    )
}

fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Selection not found" })))
}

/// GET /menu-selections — own selections; staff see everyone's
pub async fn list_selections(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<SelectionListQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let order = params
        .order_clause()
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(json!({ "error": e }))))?;

    SelectionService::list(&state.db, &user, params.selected_at, &order)
        .await
        .map(|selections| Json(json!(selections)))
        .map_err(internal)
}

/// POST /menu-selections — only today's menus, only before the cutoff hour
pub async fn create_selection(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateSelectionRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let menu = MenuService::get(&state.db, body.menu)
        .await
        .map_err(internal)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, Json(json!({ "error": "Menu not found" }))))?;

    if let Err(rejected) = check_selection(
        local_now(),
        to_local(menu.preparation_date),
        state.config.selection_cutoff_hour,
    ) {
        SELECTIONS_COUNTER.with_label_values(&["rejected"]).inc();
        tracing::info!("Selection of menu {} by '{}' refused: {}", menu.id, user.username, rejected);
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "menu": rejected.messages() })),
        ));
    }

    let selection = SelectionService::create(&state.db, user.user_id, menu.id, &body.customizations)
        .await
        .map_err(internal)?;
    SELECTIONS_COUNTER.with_label_values(&["accepted"]).inc();
    Ok((StatusCode::CREATED, Json(json!(selection))))
}

/// GET /menu-selections/{id}
pub async fn get_selection(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match SelectionService::get(&state.db, &user, id).await.map_err(internal)? {
        Some(selection) => Ok(Json(json!(selection))),
        None => Err(not_found()),
    }
}

/// PATCH /menu-selections/{id} — customizations only
pub async fn update_selection(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateSelectionRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match SelectionService::update_customizations(&state.db, &user, id, &body.customizations)
        .await
        .map_err(internal)?
    {
        Some(selection) => Ok(Json(json!(selection))),
        None => Err(not_found()),
    }
}

/// DELETE /menu-selections/{id}
pub async fn delete_selection(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    if !SelectionService::delete(&state.db, &user, id).await.map_err(internal)? {
        return Err(not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}
