//! Stock CRUD.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::info;

use super::{AppState, IdQuery};
use crate::error::{ApiError, ApiResult};
use crate::models::{CreateStockRequest, StockPatch};

pub(super) async fn list_stocks(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let stocks = state.storage.list_stock_views().await?;
    Ok(Json(stocks))
}

pub(super) async fn create_stock(
    State(state): State<AppState>,
    body: Result<Json<CreateStockRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = body?;
    let new_stock = request
        .into_new_stock()
        .ok_or_else(|| ApiError::invalid("Ticker and name are required"))?;

    let view = state.storage.create_stock(new_stock).await?;
    info!(stock_id = %view.stock.id, ticker = %view.stock.ticker, "Stock created");

    Ok((StatusCode::CREATED, Json(view)))
}

pub(super) async fn get_stock(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let view = state
        .storage
        .get_stock_view(&id)
        .await?
        .ok_or_else(|| ApiError::stock_not_found(&id))?;
    Ok(Json(view))
}

pub(super) async fn update_stock(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<StockPatch>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(patch) = body?;
    if patch.is_empty() {
        return Err(ApiError::invalid("No fields to update"));
    }

    state
        .storage
        .update_stock(&id, &patch)
        .await?
        .ok_or_else(|| ApiError::stock_not_found(&id))?;

    Ok(Json(serde_json::json!({ "success": true })))
}

pub(super) async fn delete_stock(
    State(state): State<AppState>,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let id = query.require("Stock")?;

    if !state.storage.delete_stock(&id).await? {
        return Err(ApiError::stock_not_found(&id));
    }
    info!(stock_id = %id, "Stock deleted");

    Ok(Json(serde_json::json!({ "success": true })))
}
