use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    models::{
        auth::StaffUser,
        menu::{CreateMenuRequest, MenuFields, MenuListQuery, UpdateMenuRequest},
    },
    services::{date_window::to_local, menu::MenuService},
    AppState,
};

fn internal(e: anyhow::Error) -> (StatusCode, Json<Value>) {
    tracing::error!("Menu storage error: {e:#}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
    )
}

fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Menu not found" })))
}

/// GET /menus?weekday=N&date=YYYY-MM-DD — public
pub async fn list_menus(
    State(state): State<AppState>,
    Query(params): Query<MenuListQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    MenuService::list(&state.db, &params)
        .await
        .map(|menus| Json(json!(menus)))
        .map_err(internal)
}

/// GET /menus/{id} — public
pub async fn get_menu(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match MenuService::get(&state.db, id).await.map_err(internal)? {
        Some(menu) => Ok(Json(json!(menu))),
        None => Err(not_found()),
    }
}

/// POST /menus — staff only
pub async fn create_menu(
    State(state): State<AppState>,
    StaffUser(user): StaffUser,
    Json(body): Json<CreateMenuRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let preparation_date = body.preparation_date.unwrap_or_else(Utc::now);
    let fields = MenuFields::from_create(body, preparation_date, to_local(preparation_date))
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))))?;

    let menu = MenuService::create(&state.db, &fields, user.user_id)
        .await
        .map_err(internal)?;
    tracing::info!("Menu {} created by '{}'", menu.id, user.username);
    Ok((StatusCode::CREATED, Json(json!(menu))))
}

/// PATCH /menus/{id} — staff only
pub async fn update_menu(
    State(state): State<AppState>,
    StaffUser(_user): StaffUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateMenuRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let current = MenuService::get(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(not_found)?;

    let preparation_date = body.preparation_date.unwrap_or(current.preparation_date);
    let fields = MenuFields::merge(&current, body, to_local(preparation_date))
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))))?;

    match MenuService::update(&state.db, id, &fields).await.map_err(internal)? {
        Some(menu) => Ok(Json(json!(menu))),
        None => Err(not_found()),
    }
}

/// DELETE /menus/{id} — staff only
pub async fn delete_menu(
    State(state): State<AppState>,
    StaffUser(user): StaffUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    if !MenuService::delete(&state.db, id).await.map_err(internal)? {
        return Err(not_found());
    }
    tracing::info!("Menu {} deleted by '{}'", id, user.username);
    Ok(StatusCode::NO_CONTENT)
}
