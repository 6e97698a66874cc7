//! Default data and one-off data migrations.
//!
//! Every operation is safe to run repeatedly: existing rows are skipped.

use chrono::Utc;
use logfolio_common::{Result, ResultExt};
use serde::Serialize;
use tracing::{debug, info};

use crate::models::{InvestmentType, Stock, Strategy};
use crate::storage::LocalStorage;

/// `(id, name, description, color, icon)`
const DEFAULT_STRATEGIES: &[(&str, &str, &str, &str, &str)] = &[
    (
        "strategy_short_term",
        "Short-term Trade",
        "Quick trades to capitalize on short-term price movements",
        "#f97316",
        "TrendingUp",
    ),
    (
        "strategy_long_term",
        "Long-term Appreciation",
        "Buy and hold for long-term capital appreciation",
        "#3b82f6",
        "TrendingUp",
    ),
    (
        "strategy_dividend_growth",
        "Dividend Growth",
        "Invest in companies with growing dividend payments",
        "#22c55e",
        "DollarSign",
    ),
    (
        "strategy_high_dividend",
        "High Dividend",
        "Focus on high current dividend yield",
        "#a855f7",
        "Coins",
    ),
    (
        "strategy_core",
        "Core",
        "Core portfolio holdings for stability",
        "#6366f1",
        "Shield",
    ),
    (
        "strategy_speculative",
        "Speculative",
        "Higher risk, potentially higher reward investments",
        "#ef4444",
        "Zap",
    ),
];

/// `(id, name, ticker, investment type)`
const SAMPLE_STOCKS: &[(&str, &str, &str, InvestmentType)] = &[
    ("aapl", "Apple Inc.", "AAPL", InvestmentType::LongTermAppreciation),
    ("msft", "Microsoft Corporation", "MSFT", InvestmentType::LongTermAppreciation),
    ("jnj", "Johnson & Johnson", "JNJ", InvestmentType::DividendGrowth),
    ("t", "AT&T Inc.", "T", InvestmentType::HighDividend),
    ("googl", "Alphabet Inc.", "GOOGL", InvestmentType::LongTermAppreciation),
    ("ko", "The Coca-Cola Company", "KO", InvestmentType::DividendGrowth),
];

/// Outcome of a seed or migration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub migrated: usize,
    pub skipped: usize,
}

impl std::fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} migrated, {} skipped", self.migrated, self.skipped)
    }
}

/// The built-in strategies with fresh timestamps.
pub fn default_strategies() -> Vec<Strategy> {
    let now = Utc::now();
    DEFAULT_STRATEGIES
        .iter()
        .map(|&(id, name, description, color, icon)| Strategy {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            color: color.to_string(),
            icon: icon.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .collect()
}

/// The sample stocks with fresh timestamps.
pub fn sample_stocks() -> Vec<Stock> {
    let now = Utc::now();
    SAMPLE_STOCKS
        .iter()
        .map(|&(id, name, ticker, investment_type)| Stock {
            id: id.to_string(),
            name: name.to_string(),
            ticker: ticker.to_string(),
            investment_type,
            shares: 0,
            price: "0".to_string(),
            thesis: String::new(),
            is_watchlist: false,
            is_favorite: false,
            price_target: None,
            created_at: now,
            updated_at: now,
        })
        .collect()
}

/// Insert the default strategies that are not present yet.
pub async fn seed_strategies(storage: &LocalStorage) -> Result<MigrationReport> {
    let mut report = MigrationReport::default();
    for strategy in default_strategies() {
        if storage.insert_strategy_if_absent(&strategy).await? {
            debug!(strategy_id = %strategy.id, "Seeded strategy");
            report.migrated += 1;
        } else {
            report.skipped += 1;
        }
    }
    info!(migrated = report.migrated, skipped = report.skipped, "Seeded strategies");
    Ok(report)
}

/// Insert the sample stocks that are not present yet.
pub async fn seed_stocks(storage: &LocalStorage) -> Result<MigrationReport> {
    let mut report = MigrationReport::default();
    for stock in sample_stocks() {
        if storage.insert_stock_if_absent(&stock).await? {
            report.migrated += 1;
        } else {
            report.skipped += 1;
        }
    }
    info!(migrated = report.migrated, skipped = report.skipped, "Seeded stocks");
    Ok(report)
}

/// Link each unlinked stock to the strategy mapped from its investment type.
///
/// Expects the default strategies to exist; run [`seed_strategies`] first.
pub async fn migrate_strategies(storage: &LocalStorage) -> Result<MigrationReport> {
    let mut report = MigrationReport::default();
    for stock in storage.list_stocks().await? {
        if storage.link_count(&stock.id).await? > 0 {
            report.skipped += 1;
            continue;
        }
        let strategy_id = stock.investment_type.strategy_id();
        storage.link_strategy(&stock.id, strategy_id).await?;
        debug!(ticker = %stock.ticker, strategy_id, "Linked strategy");
        report.migrated += 1;
    }
    info!(migrated = report.migrated, skipped = report.skipped, "Migrated stock strategies");
    Ok(report)
}

/// Copy each stock's legacy thesis into a journal entry dated at the
/// stock's creation day.
///
/// Stocks with a blank thesis, or whose thesis already sits in an entry on
/// that day, are skipped.
pub async fn migrate_journal(storage: &LocalStorage) -> Result<MigrationReport> {
    let mut report = MigrationReport::default();
    for stock in storage.list_stocks().await? {
        if stock.thesis.trim().is_empty() {
            report.skipped += 1;
            continue;
        }

        let date = stock.created_at.date_naive();
        let already = storage
            .list_journal(&stock.id)
            .await?
            .iter()
            .any(|entry| entry.date == date && entry.content == stock.thesis);
        if already {
            report.skipped += 1;
            continue;
        }

        storage
            .create_journal(&stock.id, date, &stock.thesis)
            .await
            .context(format!("Migrating thesis of {}", stock.ticker))?;
        debug!(ticker = %stock.ticker, %date, "Migrated thesis to journal");
        report.migrated += 1;
    }
    info!(migrated = report.migrated, skipped = report.skipped, "Migrated theses to journal");
    Ok(report)
}
