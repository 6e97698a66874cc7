//! HTTP API routes.

mod health;
mod journal;
mod nodes;
mod portfolio;
mod stocks;
mod strategies;
mod valuation;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use chrono::{NaiveDate, Utc};
use logfolio_common::logging::generate_trace_id;
use logfolio_common::{Config, DisplayConfig};
use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::autosave::AutosaveCoordinator;
use crate::error::{ApiError, ApiResult};
use crate::storage::LocalStorage;

/// `(stock id, journal entry id)` of a journal draft.
pub type DraftKey = (String, String);

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub storage: LocalStorage,
    pub display: DisplayConfig,
    /// Debounced journal drafts
    pub drafts: AutosaveCoordinator<DraftKey>,
}

impl AppState {
    pub fn new(storage: LocalStorage, config: &Config) -> Self {
        Self::with_debounce(
            storage,
            config.display,
            Duration::from_millis(config.autosave.debounce_ms),
        )
    }

    pub fn with_debounce(storage: LocalStorage, display: DisplayConfig, debounce: Duration) -> Self {
        let sink_storage = storage.clone();
        let drafts = AutosaveCoordinator::new(
            debounce,
            move |(stock_id, entry_id): DraftKey, content: String| {
                let storage = sink_storage.clone();
                async move {
                    storage
                        .update_journal(&stock_id, &entry_id, &content)
                        .await?
                        .ok_or_else(|| {
                            logfolio_common::Error::NotFound(format!("Journal entry {entry_id}"))
                        })?;
                    Ok::<(), logfolio_common::Error>(())
                }
            },
        );

        Self {
            storage,
            display,
            drafts,
        }
    }

    /// 404 unless the stock exists.
    pub(crate) async fn require_stock(&self, id: &str) -> ApiResult<()> {
        if self.storage.stock_exists(id).await? {
            Ok(())
        } else {
            Err(ApiError::stock_not_found(id))
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Stocks
        .route(
            "/api/stocks",
            get(stocks::list_stocks)
                .post(stocks::create_stock)
                .delete(stocks::delete_stock),
        )
        .route(
            "/api/stocks/:id",
            get(stocks::get_stock).patch(stocks::update_stock),
        )
        // Journal
        .route(
            "/api/stocks/:id/journal",
            get(journal::list_entries).post(journal::create_entry),
        )
        .route("/api/stocks/:id/journal/today", post(journal::today_entry))
        .route(
            "/api/stocks/:id/journal/:entry_id",
            axum::routing::patch(journal::update_entry).delete(journal::delete_entry),
        )
        .route(
            "/api/stocks/:id/journal/:entry_id/draft",
            get(journal::draft_status).put(journal::save_draft),
        )
        // Canvas
        .route(
            "/api/stocks/:id/nodes",
            get(nodes::list_nodes)
                .post(nodes::create_node)
                .patch(nodes::update_node)
                .delete(nodes::delete_node),
        )
        .route("/api/stocks/:id/thesis", put(nodes::update_thesis))
        // Strategies
        .route(
            "/api/strategies",
            get(strategies::list_strategies).post(strategies::create_strategy),
        )
        .route(
            "/api/strategies/:id",
            get(strategies::get_strategy)
                .patch(strategies::update_strategy)
                .delete(strategies::delete_strategy),
        )
        // Portfolio
        .route("/api/portfolio", get(portfolio::get_portfolio))
        // Valuation
        .route("/api/valuation/dcf", post(valuation::calculate_dcf))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

// ============ Shared Helpers ============

/// `?id=` query used by collection-level deletes.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct IdQuery {
    pub id: Option<String>,
}

impl IdQuery {
    pub(crate) fn require(self, what: &str) -> ApiResult<String> {
        self.id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ApiError::invalid(format!("{what} id is required")))
    }
}

/// Today's date for journal entries (UTC).
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

async fn log_requests(request: Request, next: Next) -> Response {
    let trace_id = generate_trace_id();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    tracing::debug!(
        trace_id = %trace_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Handled request"
    );

    response
}
