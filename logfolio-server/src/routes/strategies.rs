//! Investment strategy CRUD.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use logfolio_common::util::generate_id;
use tracing::info;

use super::AppState;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    CreateStrategyRequest, Strategy, StrategyPatch, DEFAULT_STRATEGY_COLOR, DEFAULT_STRATEGY_ICON,
};

fn strategy_not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("Strategy {id}"))
}

pub(super) async fn list_strategies(
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    let strategies = state.storage.list_strategies().await?;
    Ok(Json(strategies))
}

pub(super) async fn create_strategy(
    State(state): State<AppState>,
    body: Result<Json<CreateStrategyRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = body?;
    let name = request
        .name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| ApiError::invalid("Name is required"))?;

    let now = Utc::now();
    let strategy = Strategy {
        id: generate_id("strategy"),
        name,
        description: request.description.unwrap_or_default(),
        color: request
            .color
            .unwrap_or_else(|| DEFAULT_STRATEGY_COLOR.to_string()),
        icon: request
            .icon
            .unwrap_or_else(|| DEFAULT_STRATEGY_ICON.to_string()),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    state.storage.create_strategy(&strategy).await?;
    info!(strategy_id = %strategy.id, name = %strategy.name, "Strategy created");

    Ok((StatusCode::CREATED, Json(strategy)))
}

pub(super) async fn get_strategy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let strategy = state
        .storage
        .get_strategy(&id)
        .await?
        .ok_or_else(|| strategy_not_found(&id))?;
    Ok(Json(strategy))
}

pub(super) async fn update_strategy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<StrategyPatch>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(patch) = body?;
    if patch.is_empty() {
        return Err(ApiError::invalid("No fields to update"));
    }

    let strategy = state
        .storage
        .update_strategy(&id, &patch)
        .await?
        .ok_or_else(|| strategy_not_found(&id))?;
    Ok(Json(strategy))
}

/// Delete a strategy; stocks lose the link but are kept.
pub(super) async fn delete_strategy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    if !state.storage.delete_strategy(&id).await? {
        return Err(strategy_not_found(&id));
    }
    info!(strategy_id = %id, "Strategy deleted");
    Ok(Json(serde_json::json!({ "success": true })))
}
