//! Logfolio Server Library
//!
//! HTTP service behind the Logfolio investment journal: stocks, dated
//! journal entries, a thesis canvas per stock, investment strategies, the
//! portfolio/watchlist view and the DCF calculator.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    logfolio (Rust Service)                   │
//! │                           :4460                              │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐    │
//! │  │  Routes      │  │  Autosave    │  │  Valuation       │    │
//! │  │  (axum)      │  │  (debounce)  │  │  (DCF engine)    │    │
//! │  └──────┬───────┘  └──────┬───────┘  └──────────────────┘    │
//! │         └────────┬────────┘                                  │
//! │          ┌───────▼────────┐                                  │
//! │          │ LocalStorage   │                                  │
//! │          │ (SQLite)       │                                  │
//! │          └────────────────┘                                  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod autosave;
pub mod error;
pub mod models;
pub mod portfolio;
pub mod routes;
pub mod seed;
pub mod storage;

pub use autosave::{AutosaveCoordinator, SaveStatus};
pub use error::{ApiError, ApiResult};
pub use routes::{build_router, AppState};
pub use storage::LocalStorage;

use anyhow::{Context, Result};
use logfolio_common::Config;
use tower_http::cors::{Any, CorsLayer};

/// Main Logfolio service
pub struct LogfolioService {
    config: Config,
}

impl LogfolioService {
    /// Create a new service
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Open storage and serve HTTP until Ctrl-C.
    pub async fn start(self) -> Result<()> {
        let storage = LocalStorage::open(&self.config.db_path())?;
        let state = AppState::new(storage, &self.config);
        let drafts = state.drafts.clone();

        let mut app = build_router(state);
        if self.config.network.cors_allow_any {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            app = app.layer(cors);
        }

        let host = self.config.bind_address();
        let port = self.config.port();
        let listener = tokio::net::TcpListener::bind((host, port))
            .await
            .with_context(|| format!("Failed to bind {host}:{port}"))?;
        tracing::info!(
            address = %listener.local_addr()?,
            endpoint = %self.config.endpoint(),
            "Starting HTTP server"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        // Persist whatever the editor typed during the last quiet period.
        drafts.flush_all().await;
        tracing::info!("Server stopped");

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
