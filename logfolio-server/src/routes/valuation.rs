//! DCF calculator endpoint.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use logfolio_valuation::{render_text, MetricLabels, ValuationForm};

use super::AppState;
use crate::error::ApiResult;

/// Evaluate a calculator form. Insufficient input yields `"result": null`.
pub(super) async fn calculate_dcf(
    State(state): State<AppState>,
    body: Result<Json<ValuationForm>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(form) = body?;
    let result = form.evaluate();
    let report = render_text(result.as_ref(), form.metric, state.display);

    Ok(Json(serde_json::json!({
        "result": result,
        "labels": MetricLabels::from(form.metric),
        "report": report
    })))
}
