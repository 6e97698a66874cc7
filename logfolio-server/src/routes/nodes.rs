//! Thesis canvas nodes.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::debug;

use super::{today, AppState, IdQuery};
use crate::error::{ApiError, ApiResult};
use crate::models::{CreateNodeRequest, NodePatch, ThesisUpdate};

fn node_not_found(node_id: &str) -> ApiError {
    ApiError::NotFound(format!("Node {node_id}"))
}

/// Nodes with the central thesis node kept in step with the journal.
pub(super) async fn list_nodes(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.require_stock(&id).await?;
    let nodes = state.storage.sync_central_thesis(&id).await?;
    Ok(Json(nodes))
}

pub(super) async fn create_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<CreateNodeRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = body?;
    let (Some(node_type), Some(position), Some(data)) =
        (request.node_type, request.position, request.data)
    else {
        return Err(ApiError::invalid("Type, position and data are required"));
    };

    state.require_stock(&id).await?;
    let node = state
        .storage
        .create_node(&id, node_type, position, data)
        .await?;
    debug!(stock_id = %id, node_id = %node.id, node_type = node_type.as_str(), "Node created");

    Ok((StatusCode::CREATED, Json(node)))
}

pub(super) async fn update_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<NodePatch>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(patch) = body?;
    let node_id = patch
        .id
        .filter(|node_id| !node_id.trim().is_empty())
        .ok_or_else(|| ApiError::invalid("Node id is required"))?;

    state.require_stock(&id).await?;
    let node = state
        .storage
        .update_node(&id, &node_id, patch.position, patch.data)
        .await?
        .ok_or_else(|| node_not_found(&node_id))?;

    Ok(Json(node))
}

pub(super) async fn delete_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let node_id = query.require("Node")?;

    state.require_stock(&id).await?;
    if !state.storage.delete_node(&id, &node_id).await? {
        return Err(node_not_found(&node_id));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Write the thesis to the central node and today's journal entry.
pub(super) async fn update_thesis(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ThesisUpdate>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(update) = body?;

    state.require_stock(&id).await?;
    let (node, entry) = state
        .storage
        .save_thesis(&id, &update.content, today())
        .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "node": node,
        "entry": entry
    })))
}
