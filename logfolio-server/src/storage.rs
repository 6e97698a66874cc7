//! SQLite persistence for stocks, journal entries, canvas nodes and
//! strategies.
//!
//! A single connection is shared behind an async mutex. Each public method
//! takes the lock once, so compound operations (creating a stock with its
//! strategy links, syncing the central thesis node) run in one transaction.

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use logfolio_common::util::generate_id;
use logfolio_common::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::models::{
    CanvasNode, InvestmentType, JournalEntry, NewStock, NodeType, Position, Stock, StockPatch,
    StockView, Strategy, StrategyPatch, DEFAULT_LINK_WEIGHT,
};

// ============================================================================
// Database Schema
// ============================================================================

const CREATE_TABLES_SQL: &str = r#"
-- Tracked companies
CREATE TABLE IF NOT EXISTS stocks (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    ticker TEXT NOT NULL,
    investment_type TEXT NOT NULL DEFAULT 'core',
    shares INTEGER NOT NULL DEFAULT 0,
    price TEXT NOT NULL DEFAULT '0',
    thesis TEXT NOT NULL DEFAULT '',
    is_watchlist INTEGER NOT NULL DEFAULT 0,
    is_favorite INTEGER NOT NULL DEFAULT 0,
    price_target TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Thesis canvas nodes
CREATE TABLE IF NOT EXISTS canvas_nodes (
    id TEXT PRIMARY KEY,
    stock_id TEXT NOT NULL REFERENCES stocks(id) ON DELETE CASCADE,
    type TEXT NOT NULL,
    position TEXT NOT NULL,
    data TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_canvas_nodes_stock
ON canvas_nodes(stock_id);

-- Dated journal entries
CREATE TABLE IF NOT EXISTS journal_entries (
    id TEXT PRIMARY KEY,
    stock_id TEXT NOT NULL REFERENCES stocks(id) ON DELETE CASCADE,
    date TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_journal_entries_stock_date
ON journal_entries(stock_id, date);

-- Investment strategies
CREATE TABLE IF NOT EXISTS investment_strategies (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    color TEXT NOT NULL DEFAULT '#3b82f6',
    icon TEXT NOT NULL DEFAULT 'Circle',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Stock <-> strategy links
CREATE TABLE IF NOT EXISTS stock_strategies (
    id TEXT PRIMARY KEY,
    stock_id TEXT NOT NULL REFERENCES stocks(id) ON DELETE CASCADE,
    strategy_id TEXT NOT NULL REFERENCES investment_strategies(id) ON DELETE CASCADE,
    weight INTEGER NOT NULL DEFAULT 100,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(stock_id, strategy_id)
);
"#;

const STOCK_COLUMNS: &str = "id, name, ticker, investment_type, shares, price, thesis, \
     is_watchlist, is_favorite, price_target, created_at, updated_at";

const JOURNAL_COLUMNS: &str = "id, stock_id, date, content, created_at, updated_at";

const NODE_COLUMNS: &str = "id, stock_id, type, position, data, created_at, updated_at";

const STRATEGY_COLUMNS: &str =
    "id, name, description, color, icon, is_active, created_at, updated_at";

// ============================================================================
// Local Storage
// ============================================================================

/// SQLite-backed store.
///
/// `rusqlite::Connection` is `Send` but not `Sync`, so it lives behind a
/// `Mutex` rather than an `RwLock`.
#[derive(Clone)]
pub struct LocalStorage {
    db: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

impl LocalStorage {
    /// Open (or create) the database at `db_path` and apply the schema.
    pub fn open(db_path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )
        .context("Failed to set database pragmas")?;

        conn.execute_batch(CREATE_TABLES_SQL)
            .context("Failed to create database tables")?;

        info!(db_path = %db_path.display(), "Initialized local storage");

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            db_path: db_path.to_path_buf(),
        })
    }

    /// Get the database path
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    // ========================================================================
    // Stock Operations
    // ========================================================================

    /// All stocks with entry counts and strategies, oldest first.
    pub async fn list_stock_views(&self) -> Result<Vec<StockView>> {
        let db = self.db.lock().await;
        let stocks = query_stocks(&db)?;
        stocks
            .into_iter()
            .map(|stock| build_view(&db, stock))
            .collect()
    }

    /// Plain stock rows, oldest first.
    pub async fn list_stocks(&self) -> Result<Vec<Stock>> {
        let db = self.db.lock().await;
        query_stocks(&db)
    }

    pub async fn get_stock(&self, id: &str) -> Result<Option<Stock>> {
        let db = self.db.lock().await;
        query_stock(&db, id)
    }

    pub async fn get_stock_view(&self, id: &str) -> Result<Option<StockView>> {
        let db = self.db.lock().await;
        match query_stock(&db, id)? {
            Some(stock) => Ok(Some(build_view(&db, stock)?)),
            None => Ok(None),
        }
    }

    pub async fn stock_exists(&self, id: &str) -> Result<bool> {
        let db = self.db.lock().await;
        Ok(query_stock(&db, id)?.is_some())
    }

    /// Insert a stock and link its strategies.
    ///
    /// Fails with `InvalidInput` when a strategy id does not exist.
    pub async fn create_stock(&self, new: NewStock) -> Result<StockView> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;

        let now = Utc::now();
        let stock = Stock {
            id: generate_id("stock"),
            name: new.name,
            ticker: new.ticker,
            investment_type: new.investment_type,
            shares: new.shares,
            price: new.price,
            thesis: String::new(),
            is_watchlist: new.is_watchlist,
            is_favorite: false,
            price_target: new.price_target,
            created_at: now,
            updated_at: now,
        };
        insert_stock(&tx, &stock)?;
        insert_links(&tx, &stock.id, &new.strategy_ids)?;

        let view = build_view(&tx, stock)?;
        tx.commit()?;

        debug!(stock_id = %view.stock.id, ticker = %view.stock.ticker, "Created stock");
        Ok(view)
    }

    /// Insert a fully specified stock unless its id is taken.
    pub async fn insert_stock_if_absent(&self, stock: &Stock) -> Result<bool> {
        let db = self.db.lock().await;
        if query_stock(&db, &stock.id)?.is_some() {
            return Ok(false);
        }
        insert_stock(&db, stock)?;
        Ok(true)
    }

    /// Apply a partial update. Returns `None` when the stock does not exist.
    pub async fn update_stock(&self, id: &str, patch: &StockPatch) -> Result<Option<Stock>> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;

        let Some(mut stock) = query_stock(&tx, id)? else {
            return Ok(None);
        };

        if let Some(thesis) = &patch.thesis {
            stock.thesis = thesis.clone();
        }
        if let Some(ticker) = &patch.ticker {
            stock.ticker = ticker.trim().to_uppercase();
        }
        if let Some(name) = &patch.name {
            stock.name = name.clone();
        }
        if let Some(investment_type) = patch.investment_type {
            stock.investment_type = investment_type;
        }
        if let Some(shares) = patch.shares {
            stock.shares = shares;
        }
        if let Some(price) = &patch.price {
            stock.price = price.clone();
        }
        if let Some(is_watchlist) = patch.is_watchlist {
            stock.is_watchlist = is_watchlist;
        }
        if let Some(is_favorite) = patch.is_favorite {
            stock.is_favorite = is_favorite;
        }
        if let Some(price_target) = &patch.price_target {
            stock.price_target = price_target.clone();
        }
        stock.updated_at = Utc::now();

        tx.execute(
            "UPDATE stocks SET name = ?2, ticker = ?3, investment_type = ?4, shares = ?5,
                price = ?6, thesis = ?7, is_watchlist = ?8, is_favorite = ?9,
                price_target = ?10, updated_at = ?11
             WHERE id = ?1",
            params![
                stock.id,
                stock.name,
                stock.ticker,
                stock.investment_type.as_str(),
                stock.shares,
                stock.price,
                stock.thesis,
                stock.is_watchlist,
                stock.is_favorite,
                stock.price_target,
                stock.updated_at.to_rfc3339(),
            ],
        )?;

        if let Some(strategy_ids) = &patch.strategy_ids {
            tx.execute("DELETE FROM stock_strategies WHERE stock_id = ?1", params![id])?;
            insert_links(&tx, id, strategy_ids)?;
        }

        tx.commit()?;
        Ok(Some(stock))
    }

    /// Delete a stock; journal entries, nodes and links cascade.
    pub async fn delete_stock(&self, id: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let deleted = db.execute("DELETE FROM stocks WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    // ========================================================================
    // Journal Operations
    // ========================================================================

    /// Entries for a stock in ascending date order.
    pub async fn list_journal(&self, stock_id: &str) -> Result<Vec<JournalEntry>> {
        let db = self.db.lock().await;
        query_journal(&db, stock_id)
    }

    /// The entry with the latest date, if any.
    pub async fn latest_journal(&self, stock_id: &str) -> Result<Option<JournalEntry>> {
        let db = self.db.lock().await;
        query_latest_journal(&db, stock_id)
    }

    pub async fn get_journal(&self, stock_id: &str, entry_id: &str) -> Result<Option<JournalEntry>> {
        let db = self.db.lock().await;
        Ok(query_journal_entry(&db, entry_id)?.filter(|entry| entry.stock_id == stock_id))
    }

    pub async fn create_journal(
        &self,
        stock_id: &str,
        date: NaiveDate,
        content: &str,
    ) -> Result<JournalEntry> {
        let db = self.db.lock().await;
        insert_journal(&db, stock_id, date, content)
    }

    /// The entry dated `date`, created empty when absent.
    pub async fn journal_for_day(&self, stock_id: &str, date: NaiveDate) -> Result<JournalEntry> {
        let db = self.db.lock().await;
        match query_journal_on(&db, stock_id, date)? {
            Some(entry) => Ok(entry),
            None => insert_journal(&db, stock_id, date, ""),
        }
    }

    pub async fn update_journal(
        &self,
        stock_id: &str,
        entry_id: &str,
        content: &str,
    ) -> Result<Option<JournalEntry>> {
        let db = self.db.lock().await;
        let updated = db.execute(
            "UPDATE journal_entries SET content = ?3, updated_at = ?4
             WHERE id = ?1 AND stock_id = ?2",
            params![entry_id, stock_id, content, Utc::now().to_rfc3339()],
        )?;
        if updated == 0 {
            return Ok(None);
        }
        query_journal_entry(&db, entry_id)
    }

    pub async fn delete_journal(&self, stock_id: &str, entry_id: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let deleted = db.execute(
            "DELETE FROM journal_entries WHERE id = ?1 AND stock_id = ?2",
            params![entry_id, stock_id],
        )?;
        Ok(deleted > 0)
    }

    // ========================================================================
    // Canvas Operations
    // ========================================================================

    /// Nodes for a stock, central thesis first.
    pub async fn list_nodes(&self, stock_id: &str) -> Result<Vec<CanvasNode>> {
        let db = self.db.lock().await;
        query_nodes(&db, stock_id)
    }

    pub async fn create_node(
        &self,
        stock_id: &str,
        node_type: NodeType,
        position: Position,
        data: serde_json::Value,
    ) -> Result<CanvasNode> {
        let db = self.db.lock().await;
        insert_node(&db, stock_id, node_type, position, data)
    }

    /// Move a node and/or replace its data.
    pub async fn update_node(
        &self,
        stock_id: &str,
        node_id: &str,
        position: Option<Position>,
        data: Option<serde_json::Value>,
    ) -> Result<Option<CanvasNode>> {
        let db = self.db.lock().await;
        let Some(mut node) = query_node(&db, stock_id, node_id)? else {
            return Ok(None);
        };
        if let Some(position) = position {
            node.position = position;
        }
        if let Some(data) = data {
            node.data = data;
        }
        node.updated_at = Utc::now();
        write_node(&db, &node)?;
        Ok(Some(node))
    }

    pub async fn delete_node(&self, stock_id: &str, node_id: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let deleted = db.execute(
            "DELETE FROM canvas_nodes WHERE id = ?1 AND stock_id = ?2",
            params![node_id, stock_id],
        )?;
        Ok(deleted > 0)
    }

    /// List nodes, making sure the central thesis node exists and mirrors
    /// the latest journal entry.
    ///
    /// A missing node is created at the origin. An existing node is only
    /// refreshed when the latest entry has content that differs from it.
    pub async fn sync_central_thesis(&self, stock_id: &str) -> Result<Vec<CanvasNode>> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;

        let latest = query_latest_journal(&tx, stock_id)?
            .map(|entry| entry.content)
            .unwrap_or_default();

        match query_central_node(&tx, stock_id)? {
            None => {
                let node = insert_node(
                    &tx,
                    stock_id,
                    NodeType::CentralThesis,
                    Position::default(),
                    serde_json::json!({ "content": latest }),
                )?;
                debug!(stock_id, node_id = %node.id, "Created central thesis node");
            }
            Some(mut node) if !latest.is_empty() && node.content() != Some(latest.as_str()) => {
                set_content(&mut node.data, &latest);
                node.updated_at = Utc::now();
                write_node(&tx, &node)?;
                debug!(stock_id, node_id = %node.id, "Refreshed central thesis node");
            }
            Some(_) => {}
        }

        let nodes = query_nodes(&tx, stock_id)?;
        tx.commit()?;
        Ok(nodes)
    }

    /// Write new thesis content to the central node and to `today`'s
    /// journal entry, creating either when missing.
    pub async fn save_thesis(
        &self,
        stock_id: &str,
        content: &str,
        today: NaiveDate,
    ) -> Result<(CanvasNode, JournalEntry)> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;

        let node = match query_central_node(&tx, stock_id)? {
            Some(mut node) => {
                set_content(&mut node.data, content);
                node.updated_at = Utc::now();
                write_node(&tx, &node)?;
                node
            }
            None => insert_node(
                &tx,
                stock_id,
                NodeType::CentralThesis,
                Position::default(),
                serde_json::json!({ "content": content }),
            )?,
        };

        let entry = match query_journal_on(&tx, stock_id, today)? {
            Some(entry) => {
                tx.execute(
                    "UPDATE journal_entries SET content = ?2, updated_at = ?3 WHERE id = ?1",
                    params![entry.id, content, Utc::now().to_rfc3339()],
                )?;
                query_journal_entry(&tx, &entry.id)?
                    .ok_or_else(|| Error::Internal(format!("Journal entry {} vanished", entry.id)))?
            }
            None => insert_journal(&tx, stock_id, today, content)?,
        };

        tx.commit()?;
        Ok((node, entry))
    }

    // ========================================================================
    // Strategy Operations
    // ========================================================================

    /// All strategies ordered by name.
    pub async fn list_strategies(&self) -> Result<Vec<Strategy>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {STRATEGY_COLUMNS} FROM investment_strategies ORDER BY name"
        ))?;
        let strategies = stmt
            .query_map([], row_to_strategy)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(strategies)
    }

    pub async fn get_strategy(&self, id: &str) -> Result<Option<Strategy>> {
        let db = self.db.lock().await;
        query_strategy(&db, id)
    }

    pub async fn create_strategy(&self, strategy: &Strategy) -> Result<()> {
        let db = self.db.lock().await;
        insert_strategy(&db, strategy)?;
        Ok(())
    }

    /// Insert unless a strategy with the same id exists.
    pub async fn insert_strategy_if_absent(&self, strategy: &Strategy) -> Result<bool> {
        let db = self.db.lock().await;
        if query_strategy(&db, &strategy.id)?.is_some() {
            return Ok(false);
        }
        insert_strategy(&db, strategy)?;
        Ok(true)
    }

    pub async fn update_strategy(
        &self,
        id: &str,
        patch: &StrategyPatch,
    ) -> Result<Option<Strategy>> {
        let db = self.db.lock().await;
        let Some(mut strategy) = query_strategy(&db, id)? else {
            return Ok(None);
        };

        if let Some(name) = &patch.name {
            strategy.name = name.clone();
        }
        if let Some(description) = &patch.description {
            strategy.description = description.clone();
        }
        if let Some(color) = &patch.color {
            strategy.color = color.clone();
        }
        if let Some(icon) = &patch.icon {
            strategy.icon = icon.clone();
        }
        if let Some(is_active) = patch.is_active {
            strategy.is_active = is_active;
        }
        strategy.updated_at = Utc::now();

        db.execute(
            "UPDATE investment_strategies
             SET name = ?2, description = ?3, color = ?4, icon = ?5, is_active = ?6, updated_at = ?7
             WHERE id = ?1",
            params![
                strategy.id,
                strategy.name,
                strategy.description,
                strategy.color,
                strategy.icon,
                strategy.is_active,
                strategy.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(Some(strategy))
    }

    /// Delete a strategy; its stock links cascade.
    pub async fn delete_strategy(&self, id: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let deleted = db.execute("DELETE FROM investment_strategies WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    /// Number of strategies linked to a stock.
    pub async fn link_count(&self, stock_id: &str) -> Result<i64> {
        let db = self.db.lock().await;
        let count = db.query_row(
            "SELECT COUNT(*) FROM stock_strategies WHERE stock_id = ?1",
            params![stock_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Link one strategy to a stock.
    pub async fn link_strategy(&self, stock_id: &str, strategy_id: &str) -> Result<()> {
        let db = self.db.lock().await;
        insert_links(&db, stock_id, &[strategy_id.to_string()])
    }
}

// ============================================================================
// Row Mapping
// ============================================================================

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn conversion_error(
    column: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, err.into())
}

fn row_to_stock(row: &rusqlite::Row) -> rusqlite::Result<Stock> {
    let investment_type: String = row.get(3)?;
    let investment_type = investment_type
        .parse::<InvestmentType>()
        .map_err(|e| conversion_error(3, e))?;
    let created_at: String = row.get(10)?;
    let updated_at: String = row.get(11)?;

    Ok(Stock {
        id: row.get(0)?,
        name: row.get(1)?,
        ticker: row.get(2)?,
        investment_type,
        shares: row.get(4)?,
        price: row.get(5)?,
        thesis: row.get(6)?,
        is_watchlist: row.get(7)?,
        is_favorite: row.get(8)?,
        price_target: row.get(9)?,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

fn row_to_journal(row: &rusqlite::Row) -> rusqlite::Result<JournalEntry> {
    let date: String = row.get(2)?;
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| conversion_error(2, e))?;
    let created_at: String = row.get(4)?;
    let updated_at: String = row.get(5)?;

    Ok(JournalEntry {
        id: row.get(0)?,
        stock_id: row.get(1)?,
        date,
        content: row.get(3)?,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

fn row_to_node(row: &rusqlite::Row) -> rusqlite::Result<CanvasNode> {
    let node_type: String = row.get(2)?;
    let node_type = node_type
        .parse::<NodeType>()
        .map_err(|e| conversion_error(2, e))?;
    let position: String = row.get(3)?;
    let position: Position =
        serde_json::from_str(&position).map_err(|e| conversion_error(3, e))?;
    let data: String = row.get(4)?;
    let data: serde_json::Value = serde_json::from_str(&data).map_err(|e| conversion_error(4, e))?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;

    Ok(CanvasNode {
        id: row.get(0)?,
        stock_id: row.get(1)?,
        node_type,
        position,
        data,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

fn row_to_strategy(row: &rusqlite::Row) -> rusqlite::Result<Strategy> {
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;

    Ok(Strategy {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        color: row.get(3)?,
        icon: row.get(4)?,
        is_active: row.get(5)?,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

// ============================================================================
// Queries
// ============================================================================

fn query_stocks(conn: &Connection) -> Result<Vec<Stock>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {STOCK_COLUMNS} FROM stocks ORDER BY created_at, rowid"
    ))?;
    let stocks = stmt
        .query_map([], row_to_stock)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(stocks)
}

fn query_stock(conn: &Connection, id: &str) -> Result<Option<Stock>> {
    let stock = conn
        .query_row(
            &format!("SELECT {STOCK_COLUMNS} FROM stocks WHERE id = ?1"),
            params![id],
            row_to_stock,
        )
        .optional()?;
    Ok(stock)
}

fn insert_stock(conn: &Connection, stock: &Stock) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO stocks ({STOCK_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        ),
        params![
            stock.id,
            stock.name,
            stock.ticker,
            stock.investment_type.as_str(),
            stock.shares,
            stock.price,
            stock.thesis,
            stock.is_watchlist,
            stock.is_favorite,
            stock.price_target,
            stock.created_at.to_rfc3339(),
            stock.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn build_view(conn: &Connection, stock: Stock) -> Result<StockView> {
    let entry_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM journal_entries WHERE stock_id = ?1",
        params![stock.id],
        |row| row.get(0),
    )?;
    let strategies = query_stock_strategies(conn, &stock.id)?;
    let logo_url = stock.logo_url();

    Ok(StockView {
        stock,
        entry_count,
        strategies,
        logo_url,
    })
}

fn query_stock_strategies(conn: &Connection, stock_id: &str) -> Result<Vec<Strategy>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.name, s.description, s.color, s.icon, s.is_active, s.created_at, s.updated_at
         FROM stock_strategies l
         JOIN investment_strategies s ON s.id = l.strategy_id
         WHERE l.stock_id = ?1
         ORDER BY s.name",
    )?;
    let strategies = stmt
        .query_map(params![stock_id], row_to_strategy)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(strategies)
}

/// Link strategies to a stock, ignoring duplicate ids.
fn insert_links(conn: &Connection, stock_id: &str, strategy_ids: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    let now = Utc::now().to_rfc3339();

    for strategy_id in strategy_ids {
        if !seen.insert(strategy_id.as_str()) {
            continue;
        }
        if query_strategy(conn, strategy_id)?.is_none() {
            return Err(Error::InvalidInput(format!("Unknown strategy: {strategy_id}")));
        }
        conn.execute(
            "INSERT OR IGNORE INTO stock_strategies
                (id, stock_id, strategy_id, weight, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                generate_id("stock_strategy"),
                stock_id,
                strategy_id,
                DEFAULT_LINK_WEIGHT,
                now,
            ],
        )?;
    }
    Ok(())
}

fn query_journal(conn: &Connection, stock_id: &str) -> Result<Vec<JournalEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {JOURNAL_COLUMNS} FROM journal_entries
         WHERE stock_id = ?1 ORDER BY date, created_at, rowid"
    ))?;
    let entries = stmt
        .query_map(params![stock_id], row_to_journal)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entries)
}

fn query_latest_journal(conn: &Connection, stock_id: &str) -> Result<Option<JournalEntry>> {
    let entry = conn
        .query_row(
            &format!(
                "SELECT {JOURNAL_COLUMNS} FROM journal_entries
                 WHERE stock_id = ?1 ORDER BY date DESC, created_at DESC, rowid DESC LIMIT 1"
            ),
            params![stock_id],
            row_to_journal,
        )
        .optional()?;
    Ok(entry)
}

fn query_journal_on(
    conn: &Connection,
    stock_id: &str,
    date: NaiveDate,
) -> Result<Option<JournalEntry>> {
    let entry = conn
        .query_row(
            &format!(
                "SELECT {JOURNAL_COLUMNS} FROM journal_entries
                 WHERE stock_id = ?1 AND date = ?2 ORDER BY created_at, rowid LIMIT 1"
            ),
            params![stock_id, date.format("%Y-%m-%d").to_string()],
            row_to_journal,
        )
        .optional()?;
    Ok(entry)
}

fn query_journal_entry(conn: &Connection, entry_id: &str) -> Result<Option<JournalEntry>> {
    let entry = conn
        .query_row(
            &format!("SELECT {JOURNAL_COLUMNS} FROM journal_entries WHERE id = ?1"),
            params![entry_id],
            row_to_journal,
        )
        .optional()?;
    Ok(entry)
}

fn insert_journal(
    conn: &Connection,
    stock_id: &str,
    date: NaiveDate,
    content: &str,
) -> Result<JournalEntry> {
    let now = Utc::now();
    let entry = JournalEntry {
        id: generate_id("entry"),
        stock_id: stock_id.to_string(),
        date,
        content: content.to_string(),
        created_at: now,
        updated_at: now,
    };
    conn.execute(
        &format!("INSERT INTO journal_entries ({JOURNAL_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
        params![
            entry.id,
            entry.stock_id,
            entry.date.format("%Y-%m-%d").to_string(),
            entry.content,
            entry.created_at.to_rfc3339(),
            entry.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(entry)
}

fn query_nodes(conn: &Connection, stock_id: &str) -> Result<Vec<CanvasNode>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NODE_COLUMNS} FROM canvas_nodes
         WHERE stock_id = ?1
         ORDER BY (type = 'central-thesis') DESC, created_at, rowid"
    ))?;
    let nodes = stmt
        .query_map(params![stock_id], row_to_node)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(nodes)
}

fn query_node(conn: &Connection, stock_id: &str, node_id: &str) -> Result<Option<CanvasNode>> {
    let node = conn
        .query_row(
            &format!("SELECT {NODE_COLUMNS} FROM canvas_nodes WHERE id = ?1 AND stock_id = ?2"),
            params![node_id, stock_id],
            row_to_node,
        )
        .optional()?;
    Ok(node)
}

fn query_central_node(conn: &Connection, stock_id: &str) -> Result<Option<CanvasNode>> {
    let node = conn
        .query_row(
            &format!(
                "SELECT {NODE_COLUMNS} FROM canvas_nodes
                 WHERE stock_id = ?1 AND type = 'central-thesis'
                 ORDER BY created_at, rowid LIMIT 1"
            ),
            params![stock_id],
            row_to_node,
        )
        .optional()?;
    Ok(node)
}

fn insert_node(
    conn: &Connection,
    stock_id: &str,
    node_type: NodeType,
    position: Position,
    data: serde_json::Value,
) -> Result<CanvasNode> {
    let now = Utc::now();
    let node = CanvasNode {
        id: generate_id("node"),
        stock_id: stock_id.to_string(),
        node_type,
        position,
        data,
        created_at: now,
        updated_at: now,
    };
    conn.execute(
        &format!("INSERT INTO canvas_nodes ({NODE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        params![
            node.id,
            node.stock_id,
            node.node_type.as_str(),
            serde_json::to_string(&node.position)?,
            serde_json::to_string(&node.data)?,
            node.created_at.to_rfc3339(),
            node.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(node)
}

fn write_node(conn: &Connection, node: &CanvasNode) -> Result<()> {
    conn.execute(
        "UPDATE canvas_nodes SET position = ?2, data = ?3, updated_at = ?4 WHERE id = ?1",
        params![
            node.id,
            serde_json::to_string(&node.position)?,
            serde_json::to_string(&node.data)?,
            node.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Set `data.content`, keeping any other keys.
fn set_content(data: &mut serde_json::Value, content: &str) {
    match data.as_object_mut() {
        Some(map) => {
            map.insert("content".to_string(), serde_json::Value::from(content));
        }
        None => *data = serde_json::json!({ "content": content }),
    }
}

fn query_strategy(conn: &Connection, id: &str) -> Result<Option<Strategy>> {
    let strategy = conn
        .query_row(
            &format!("SELECT {STRATEGY_COLUMNS} FROM investment_strategies WHERE id = ?1"),
            params![id],
            row_to_strategy,
        )
        .optional()?;
    Ok(strategy)
}

fn insert_strategy(conn: &Connection, strategy: &Strategy) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO investment_strategies ({STRATEGY_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        ),
        params![
            strategy.id,
            strategy.name,
            strategy.description,
            strategy.color,
            strategy.icon,
            strategy.is_active,
            strategy.created_at.to_rfc3339(),
            strategy.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateStockRequest;
    use tempfile::TempDir;

    async fn create_test_storage() -> (TempDir, LocalStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::open(&dir.path().join("test_logfolio.db")).unwrap();
        (dir, storage)
    }

    fn strategy(id: &str, name: &str) -> Strategy {
        let now = Utc::now();
        Strategy {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            color: "#22c55e".to_string(),
            icon: "DollarSign".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn new_stock(ticker: &str, strategy_ids: &[&str]) -> NewStock {
        CreateStockRequest {
            ticker: Some(ticker.to_string()),
            name: Some(format!("{ticker} Corp")),
            strategy_ids: Some(strategy_ids.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        }
        .into_new_stock()
        .unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_storage_creation() {
        let (dir, storage) = create_test_storage().await;
        assert!(storage.db_path().starts_with(dir.path()));
        assert!(storage.list_stocks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stock_create_with_strategies() {
        let (_dir, storage) = create_test_storage().await;
        storage
            .create_strategy(&strategy("strategy_dividend_growth", "Dividend Growth"))
            .await
            .unwrap();

        let view = storage
            .create_stock(new_stock("ko", &["strategy_dividend_growth", "strategy_dividend_growth"]))
            .await
            .unwrap();
        assert!(view.stock.id.starts_with("stock_"));
        assert_eq!(view.stock.ticker, "KO");
        assert_eq!(view.strategies.len(), 1);
        assert_eq!(view.entry_count, 0);
        assert_eq!(view.logo_url, "https://api.elbstream.com/logos/symbol/KO");

        let fetched = storage.get_stock_view(&view.stock.id).await.unwrap().unwrap();
        assert_eq!(fetched.stock, view.stock);
    }

    #[tokio::test]
    async fn test_stock_create_rejects_unknown_strategy() {
        let (_dir, storage) = create_test_storage().await;
        let err = storage
            .create_stock(new_stock("KO", &["strategy_missing"]))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(storage.list_stocks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stock_update_and_replace_links() {
        let (_dir, storage) = create_test_storage().await;
        storage.create_strategy(&strategy("strategy_core", "Core")).await.unwrap();
        storage
            .create_strategy(&strategy("strategy_speculative", "Speculative"))
            .await
            .unwrap();
        let view = storage.create_stock(new_stock("T", &["strategy_core"])).await.unwrap();

        let patch: StockPatch = serde_json::from_str(
            r#"{"isFavorite": true, "ticker": "tt", "priceTarget": "21.5",
                "strategyIds": ["strategy_speculative"]}"#,
        )
        .unwrap();
        let updated = storage.update_stock(&view.stock.id, &patch).await.unwrap().unwrap();
        assert!(updated.is_favorite);
        assert_eq!(updated.ticker, "TT");
        assert_eq!(updated.price_target.as_deref(), Some("21.5"));

        let view = storage.get_stock_view(&view.stock.id).await.unwrap().unwrap();
        let names: Vec<&str> = view.strategies.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Speculative"]);

        let missing = storage.update_stock("stock_missing", &patch).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_delete_stock_cascades() {
        let (_dir, storage) = create_test_storage().await;
        storage.create_strategy(&strategy("strategy_core", "Core")).await.unwrap();
        let view = storage.create_stock(new_stock("MSFT", &["strategy_core"])).await.unwrap();
        let id = view.stock.id.clone();

        storage.create_journal(&id, day(2024, 1, 2), "cloud").await.unwrap();
        storage.sync_central_thesis(&id).await.unwrap();

        assert!(storage.delete_stock(&id).await.unwrap());
        assert!(!storage.delete_stock(&id).await.unwrap());
        assert!(storage.list_journal(&id).await.unwrap().is_empty());
        assert!(storage.list_nodes(&id).await.unwrap().is_empty());
        assert_eq!(storage.link_count(&id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_strategy_cascades_links() {
        let (_dir, storage) = create_test_storage().await;
        storage.create_strategy(&strategy("strategy_core", "Core")).await.unwrap();
        let view = storage.create_stock(new_stock("JNJ", &["strategy_core"])).await.unwrap();

        assert!(storage.delete_strategy("strategy_core").await.unwrap());
        assert_eq!(storage.link_count(&view.stock.id).await.unwrap(), 0);
        assert!(storage.get_stock(&view.stock.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_journal_ordering_and_today() {
        let (_dir, storage) = create_test_storage().await;
        let id = storage.create_stock(new_stock("AAPL", &[])).await.unwrap().stock.id;

        storage.create_journal(&id, day(2024, 5, 1), "later").await.unwrap();
        storage.create_journal(&id, day(2024, 1, 1), "earlier").await.unwrap();

        let entries = storage.list_journal(&id).await.unwrap();
        let contents: Vec<&str> = entries.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["earlier", "later"]);
        assert_eq!(
            storage.latest_journal(&id).await.unwrap().unwrap().content,
            "later"
        );

        let first = storage.journal_for_day(&id, day(2024, 6, 1)).await.unwrap();
        let second = storage.journal_for_day(&id, day(2024, 6, 1)).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.content, "");
        assert_eq!(storage.list_journal(&id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_journal_update_scoped_to_stock() {
        let (_dir, storage) = create_test_storage().await;
        let a = storage.create_stock(new_stock("A", &[])).await.unwrap().stock.id;
        let b = storage.create_stock(new_stock("B", &[])).await.unwrap().stock.id;
        let entry = storage.create_journal(&a, day(2024, 2, 2), "x").await.unwrap();

        assert!(storage.update_journal(&b, &entry.id, "y").await.unwrap().is_none());
        let updated = storage.update_journal(&a, &entry.id, "y").await.unwrap().unwrap();
        assert_eq!(updated.content, "y");
        assert!(!storage.delete_journal(&b, &entry.id).await.unwrap());
        assert!(storage.delete_journal(&a, &entry.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_sync_central_thesis() {
        let (_dir, storage) = create_test_storage().await;
        let id = storage.create_stock(new_stock("GOOGL", &[])).await.unwrap().stock.id;

        // Created empty when there is no journal yet
        let nodes = storage.sync_central_thesis(&id).await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].node_type, NodeType::CentralThesis);
        assert_eq!(nodes[0].position, Position::default());
        assert_eq!(nodes[0].content(), Some(""));

        storage
            .create_node(&id, NodeType::Text, Position { x: 120.0, y: 40.0 }, serde_json::json!({"content": ""}))
            .await
            .unwrap();
        storage.create_journal(&id, day(2024, 3, 3), "search moat").await.unwrap();

        let nodes = storage.sync_central_thesis(&id).await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].node_type, NodeType::CentralThesis);
        assert_eq!(nodes[0].content(), Some("search moat"));

        // Still exactly one central node
        let nodes = storage.sync_central_thesis(&id).await.unwrap();
        let central = nodes
            .iter()
            .filter(|n| n.node_type == NodeType::CentralThesis)
            .count();
        assert_eq!(central, 1);
    }

    #[tokio::test]
    async fn test_save_thesis_upserts_today() {
        let (_dir, storage) = create_test_storage().await;
        let id = storage.create_stock(new_stock("KO", &[])).await.unwrap().stock.id;
        let today = day(2024, 7, 4);

        let (node, entry) = storage.save_thesis(&id, "draft", today).await.unwrap();
        assert_eq!(node.content(), Some("draft"));
        assert_eq!(entry.date, today);

        let (node2, entry2) = storage.save_thesis(&id, "final", today).await.unwrap();
        assert_eq!(node2.id, node.id);
        assert_eq!(entry2.id, entry.id);
        assert_eq!(entry2.content, "final");
        assert_eq!(storage.list_journal(&id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_node_keeps_unset_fields() {
        let (_dir, storage) = create_test_storage().await;
        let id = storage.create_stock(new_stock("T", &[])).await.unwrap().stock.id;
        let node = storage
            .create_node(&id, NodeType::Image, Position { x: 1.0, y: 2.0 }, serde_json::json!({"imageUrl": ""}))
            .await
            .unwrap();

        let moved = storage
            .update_node(&id, &node.id, Some(Position { x: 5.0, y: 6.0 }), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.position, Position { x: 5.0, y: 6.0 });
        assert_eq!(moved.data, serde_json::json!({"imageUrl": ""}));

        assert!(storage.delete_node(&id, &node.id).await.unwrap());
        assert!(storage.update_node(&id, &node.id, None, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_strategy_crud_orders_by_name() {
        let (_dir, storage) = create_test_storage().await;
        storage.create_strategy(&strategy("s2", "Speculative")).await.unwrap();
        storage.create_strategy(&strategy("s1", "Core")).await.unwrap();
        assert!(!storage.insert_strategy_if_absent(&strategy("s1", "Core")).await.unwrap());

        let names: Vec<String> = storage
            .list_strategies()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Core", "Speculative"]);

        let patch = StrategyPatch {
            is_active: Some(false),
            ..Default::default()
        };
        let updated = storage.update_strategy("s1", &patch).await.unwrap().unwrap();
        assert!(!updated.is_active);
        assert!(storage.update_strategy("nope", &patch).await.unwrap().is_none());
    }

    #[test]
    fn test_set_content_preserves_other_keys() {
        let mut data = serde_json::json!({"content": "old", "color": "yellow"});
        set_content(&mut data, "new");
        assert_eq!(data, serde_json::json!({"content": "new", "color": "yellow"}));

        let mut scalar = serde_json::json!("text");
        set_content(&mut scalar, "new");
        assert_eq!(scalar, serde_json::json!({"content": "new"}));
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("logfolio.db");
        {
            let storage = LocalStorage::open(&path).unwrap();
            tokio_test::block_on(storage.create_strategy(&strategy("s1", "Core"))).unwrap();
        }
        let storage = LocalStorage::open(&path).unwrap();
        let strategies = tokio_test::block_on(storage.list_strategies()).unwrap();
        assert_eq!(strategies.len(), 1);
    }
}
