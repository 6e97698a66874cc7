//! Journal entries and debounced drafts.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use logfolio_common::util::truncate_with_ellipsis;
use tracing::debug;

use super::{today, AppState};
use crate::error::{ApiError, ApiResult};
use crate::models::{parse_journal_date, CreateJournalRequest, JournalPatch};

fn entry_not_found(entry_id: &str) -> ApiError {
    ApiError::NotFound(format!("Journal entry {entry_id}"))
}

pub(super) async fn list_entries(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.require_stock(&id).await?;
    let entries = state.storage.list_journal(&id).await?;
    Ok(Json(entries))
}

pub(super) async fn create_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<CreateJournalRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = body?;
    let date = request
        .date
        .as_deref()
        .and_then(parse_journal_date)
        .ok_or_else(|| ApiError::invalid("A valid date (YYYY-MM-DD) is required"))?;

    state.require_stock(&id).await?;
    let entry = state
        .storage
        .create_journal(&id, date, request.content.as_deref().unwrap_or(""))
        .await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

/// Today's entry, created empty on first access.
pub(super) async fn today_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.require_stock(&id).await?;
    let entry = state.storage.journal_for_day(&id, today()).await?;
    Ok(Json(entry))
}

pub(super) async fn update_entry(
    State(state): State<AppState>,
    Path((id, entry_id)): Path<(String, String)>,
    body: Result<Json<JournalPatch>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(patch) = body?;
    let content = patch
        .content
        .ok_or_else(|| ApiError::invalid("Content is required"))?;

    state.require_stock(&id).await?;
    let entry = state
        .storage
        .update_journal(&id, &entry_id, &content)
        .await?
        .ok_or_else(|| entry_not_found(&entry_id))?;

    Ok(Json(entry))
}

pub(super) async fn delete_entry(
    State(state): State<AppState>,
    Path((id, entry_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    state.require_stock(&id).await?;
    if !state.storage.delete_journal(&id, &entry_id).await? {
        return Err(entry_not_found(&entry_id));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Queue editor content for a debounced save.
pub(super) async fn save_draft(
    State(state): State<AppState>,
    Path((id, entry_id)): Path<(String, String)>,
    body: Result<Json<JournalPatch>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(patch) = body?;
    let content = patch
        .content
        .ok_or_else(|| ApiError::invalid("Content is required"))?;

    state
        .storage
        .get_journal(&id, &entry_id)
        .await?
        .ok_or_else(|| entry_not_found(&entry_id))?;

    debug!(
        stock_id = %id,
        entry_id = %entry_id,
        preview = %truncate_with_ellipsis(&content, 40),
        "Draft queued"
    );
    let key = (id, entry_id);
    state.drafts.schedule(key.clone(), content).await;
    let status = state.drafts.status(&key).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "status": status })),
    ))
}

pub(super) async fn draft_status(
    State(state): State<AppState>,
    Path((id, entry_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let status = state.drafts.status(&(id, entry_id)).await;
    Ok(Json(serde_json::json!({ "status": status })))
}
