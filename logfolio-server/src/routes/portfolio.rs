//! Portfolio/watchlist page.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::IntoResponse,
    Json,
};
use logfolio_common::util::format_currency;
use serde::Serialize;

use super::AppState;
use crate::error::ApiResult;
use crate::portfolio::{build_summary, PortfolioQuery, PortfolioSummary};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PortfolioResponse {
    #[serde(flatten)]
    summary: PortfolioSummary,
    /// Total as display text, masked when currency blur is on
    portfolio_total_display: String,
}

pub(super) async fn get_portfolio(
    State(state): State<AppState>,
    query: Result<Query<PortfolioQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let views = state.storage.list_stock_views().await?;
    let summary = build_summary(views, &query);
    let portfolio_total_display =
        format_currency(summary.portfolio_total, state.display.blur_currency);

    Ok(Json(PortfolioResponse {
        summary,
        portfolio_total_display,
    }))
}
