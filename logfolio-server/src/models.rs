//! Records stored by the service and the request bodies that create or
//! patch them.
//!
//! All records serialize with camelCase keys.

use chrono::{DateTime, NaiveDate, Utc};
use logfolio_common::util::parse_float_prefix;
use serde::{Deserialize, Deserializer, Serialize};

/// Base URL for ticker logos.
pub const LOGO_BASE_URL: &str = "https://api.elbstream.com/logos/symbol";

/// Default strategy colour (blue-500).
pub const DEFAULT_STRATEGY_COLOR: &str = "#3b82f6";

/// Icon given to strategies created through the API.
pub const DEFAULT_STRATEGY_ICON: &str = "Shield";

/// Weight given to every stock/strategy link.
pub const DEFAULT_LINK_WEIGHT: i64 = 100;

// ============================================================================
// Investment Type
// ============================================================================

/// Legacy single-valued classification of a stock.
///
/// Superseded by strategy links but still stored, and used to derive the
/// initial link when migrating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvestmentType {
    ShortTerm,
    LongTermAppreciation,
    DividendGrowth,
    HighDividend,
    #[default]
    Core,
    Speculative,
}

impl InvestmentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ShortTerm => "short-term",
            Self::LongTermAppreciation => "long-term-appreciation",
            Self::DividendGrowth => "dividend-growth",
            Self::HighDividend => "high-dividend",
            Self::Core => "core",
            Self::Speculative => "speculative",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ShortTerm => "Short Term",
            Self::LongTermAppreciation => "Long Term Appreciation",
            Self::DividendGrowth => "Dividend Growth",
            Self::HighDividend => "High Dividend",
            Self::Core => "Core",
            Self::Speculative => "Speculative",
        }
    }

    /// Id of the default strategy this type maps onto.
    pub fn strategy_id(self) -> &'static str {
        match self {
            Self::ShortTerm => "strategy_short_term",
            Self::LongTermAppreciation => "strategy_long_term",
            Self::DividendGrowth => "strategy_dividend_growth",
            Self::HighDividend => "strategy_high_dividend",
            Self::Core => "strategy_core",
            Self::Speculative => "strategy_speculative",
        }
    }
}

impl std::fmt::Display for InvestmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for InvestmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short-term" => Ok(Self::ShortTerm),
            "long-term-appreciation" => Ok(Self::LongTermAppreciation),
            "dividend-growth" => Ok(Self::DividendGrowth),
            "high-dividend" => Ok(Self::HighDividend),
            "core" => Ok(Self::Core),
            "speculative" => Ok(Self::Speculative),
            other => Err(format!("Unknown investment type: {other}")),
        }
    }
}

// ============================================================================
// Stocks
// ============================================================================

/// A tracked company.
///
/// Prices are kept as the decimal text the user entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stock {
    pub id: String,
    pub name: String,
    /// Always upper-case
    pub ticker: String,
    pub investment_type: InvestmentType,
    pub shares: i64,
    pub price: String,
    pub thesis: String,
    pub is_watchlist: bool,
    pub is_favorite: bool,
    pub price_target: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Stock {
    /// Parsed price, 0 when unparseable.
    pub fn price_value(&self) -> f64 {
        parse_float_prefix(&self.price).unwrap_or(0.0)
    }

    /// Parsed price target, `None` when unset or unparseable.
    pub fn price_target_value(&self) -> Option<f64> {
        self.price_target.as_deref().and_then(parse_float_prefix)
    }

    /// `shares × price`.
    pub fn position_value(&self) -> f64 {
        self.shares as f64 * self.price_value()
    }

    pub fn logo_url(&self) -> String {
        logo_url(&self.ticker)
    }
}

/// Logo URL for a ticker.
pub fn logo_url(ticker: &str) -> String {
    format!("{LOGO_BASE_URL}/{}", ticker.to_uppercase())
}

/// A stock as returned by read endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockView {
    #[serde(flatten)]
    pub stock: Stock,
    pub entry_count: i64,
    pub strategies: Vec<Strategy>,
    pub logo_url: String,
}

/// `POST /api/stocks` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStockRequest {
    pub ticker: Option<String>,
    pub name: Option<String>,
    pub investment_type: Option<InvestmentType>,
    pub shares: Option<i64>,
    #[serde(default, deserialize_with = "optional_decimal_text")]
    pub price: Option<String>,
    pub is_watchlist: Option<bool>,
    #[serde(default, deserialize_with = "optional_decimal_text")]
    pub price_target: Option<String>,
    pub strategy_ids: Option<Vec<String>>,
}

/// Validated input for a new stock.
#[derive(Debug, Clone)]
pub struct NewStock {
    pub ticker: String,
    pub name: String,
    pub investment_type: InvestmentType,
    pub shares: i64,
    pub price: String,
    pub is_watchlist: bool,
    pub price_target: Option<String>,
    pub strategy_ids: Vec<String>,
}

impl CreateStockRequest {
    /// Apply defaults; `None` when ticker or name is missing or blank.
    pub fn into_new_stock(self) -> Option<NewStock> {
        let ticker = self.ticker.filter(|t| !t.trim().is_empty())?;
        let name = self.name.filter(|n| !n.trim().is_empty())?;

        Some(NewStock {
            ticker: ticker.trim().to_uppercase(),
            name,
            investment_type: self.investment_type.unwrap_or_default(),
            shares: self.shares.unwrap_or(0),
            price: self
                .price
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| "0".to_string()),
            is_watchlist: self.is_watchlist.unwrap_or(false),
            price_target: self.price_target.filter(|p| !p.is_empty()),
            strategy_ids: self.strategy_ids.unwrap_or_default(),
        })
    }
}

/// `PATCH /api/stocks/:id` body. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockPatch {
    pub thesis: Option<String>,
    pub ticker: Option<String>,
    pub name: Option<String>,
    pub investment_type: Option<InvestmentType>,
    pub shares: Option<i64>,
    #[serde(default, deserialize_with = "optional_decimal_text")]
    pub price: Option<String>,
    pub is_watchlist: Option<bool>,
    pub is_favorite: Option<bool>,
    /// `Some(None)` clears the target
    #[serde(default, deserialize_with = "nullable_decimal_text")]
    pub price_target: Option<Option<String>>,
    pub strategy_ids: Option<Vec<String>>,
}

impl StockPatch {
    pub fn is_empty(&self) -> bool {
        self.thesis.is_none()
            && self.ticker.is_none()
            && self.name.is_none()
            && self.investment_type.is_none()
            && self.shares.is_none()
            && self.price.is_none()
            && self.is_watchlist.is_none()
            && self.is_favorite.is_none()
            && self.price_target.is_none()
            && self.strategy_ids.is_none()
    }
}

// ============================================================================
// Journal
// ============================================================================

/// A dated journal entry for one stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    pub stock_id: String,
    /// Serialized as `YYYY-MM-DD`
    pub date: NaiveDate,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `POST /api/stocks/:id/journal` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateJournalRequest {
    pub date: Option<String>,
    pub content: Option<String>,
}

/// `PATCH /api/stocks/:id/journal/:entryId` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JournalPatch {
    pub content: Option<String>,
}

/// Parse a `YYYY-MM-DD` journal date.
pub fn parse_journal_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

// ============================================================================
// Canvas
// ============================================================================

/// Kind of canvas node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    /// The pinned node mirroring the latest journal entry
    CentralThesis,
    Text,
    Chart,
    Image,
}

impl NodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CentralThesis => "central-thesis",
            Self::Text => "text",
            Self::Chart => "chart",
            Self::Image => "image",
        }
    }
}

impl std::str::FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "central-thesis" => Ok(Self::CentralThesis),
            "text" => Ok(Self::Text),
            "chart" => Ok(Self::Chart),
            "image" => Ok(Self::Image),
            other => Err(format!("Unknown node type: {other}")),
        }
    }
}

/// Canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A node on a stock's thesis canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasNode {
    pub id: String,
    pub stock_id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub position: Position,
    /// Free-form node content; `{"content": ...}` for thesis and text nodes
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CanvasNode {
    /// The `content` string of the node's data, if any.
    pub fn content(&self) -> Option<&str> {
        self.data.get("content").and_then(serde_json::Value::as_str)
    }
}

/// `POST /api/stocks/:id/nodes` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateNodeRequest {
    #[serde(rename = "type")]
    pub node_type: Option<NodeType>,
    pub position: Option<Position>,
    pub data: Option<serde_json::Value>,
}

/// `PATCH /api/stocks/:id/nodes` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodePatch {
    pub id: Option<String>,
    pub position: Option<Position>,
    pub data: Option<serde_json::Value>,
}

/// `PUT /api/stocks/:id/thesis` body.
#[derive(Debug, Clone, Deserialize)]
pub struct ThesisUpdate {
    pub content: String,
}

// ============================================================================
// Strategies
// ============================================================================

/// A named investment strategy stocks can be tagged with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Hex colour for display
    pub color: String,
    /// Icon name for display
    pub icon: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `POST /api/strategies` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateStrategyRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

/// `PATCH /api/strategies/:id` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub is_active: Option<bool>,
}

impl StrategyPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.color.is_none()
            && self.icon.is_none()
            && self.is_active.is_none()
    }
}

// ============================================================================
// Serde helpers
// ============================================================================

/// Decimal text may arrive as a JSON string or number.
#[derive(Deserialize)]
#[serde(untagged)]
enum DecimalText {
    Text(String),
    Number(serde_json::Number),
}

impl From<DecimalText> for String {
    fn from(value: DecimalText) -> Self {
        match value {
            DecimalText::Text(s) => s,
            DecimalText::Number(n) => n.to_string(),
        }
    }
}

fn optional_decimal_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<DecimalText>::deserialize(deserializer)?.map(String::from))
}

/// Distinguishes an absent field (`None`) from an explicit null (`Some(None)`).
fn nullable_decimal_text<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(
        Option::<DecimalText>::deserialize(deserializer)?
            .map(String::from)
            .filter(|s| !s.is_empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_investment_type_wire_names() {
        let parsed: InvestmentType = serde_json::from_str("\"long-term-appreciation\"").unwrap();
        assert_eq!(parsed, InvestmentType::LongTermAppreciation);
        assert_eq!(parsed.strategy_id(), "strategy_long_term");
        assert_eq!(InvestmentType::default(), InvestmentType::Core);
        assert_eq!(
            "high-dividend".parse::<InvestmentType>(),
            Ok(InvestmentType::HighDividend)
        );
        assert!("growth".parse::<InvestmentType>().is_err());
    }

    #[test]
    fn test_create_stock_defaults() {
        let request: CreateStockRequest =
            serde_json::from_str(r#"{"ticker": " aapl ", "name": "Apple Inc.", "price": 189.5}"#)
                .unwrap();
        let stock = request.into_new_stock().unwrap();
        assert_eq!(stock.ticker, "AAPL");
        assert_eq!(stock.investment_type, InvestmentType::Core);
        assert_eq!(stock.shares, 0);
        assert_eq!(stock.price, "189.5");
        assert!(!stock.is_watchlist);
        assert!(stock.price_target.is_none());
    }

    #[test]
    fn test_create_stock_requires_ticker_and_name() {
        let missing_name: CreateStockRequest = serde_json::from_str(r#"{"ticker": "KO"}"#).unwrap();
        assert!(missing_name.into_new_stock().is_none());

        let blank_ticker: CreateStockRequest =
            serde_json::from_str(r#"{"ticker": "", "name": "Coca-Cola"}"#).unwrap();
        assert!(blank_ticker.into_new_stock().is_none());
    }

    #[test]
    fn test_stock_patch_distinguishes_null_target() {
        let absent: StockPatch = serde_json::from_str(r#"{"isFavorite": true}"#).unwrap();
        assert_eq!(absent.price_target, None);
        assert!(!absent.is_empty());

        let cleared: StockPatch = serde_json::from_str(r#"{"priceTarget": null}"#).unwrap();
        assert_eq!(cleared.price_target, Some(None));

        let set: StockPatch = serde_json::from_str(r#"{"priceTarget": "250"}"#).unwrap();
        assert_eq!(set.price_target, Some(Some("250".to_string())));

        let empty: StockPatch = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_node_serializes_type_key() {
        let node = CanvasNode {
            id: "node_1".into(),
            stock_id: "stock_1".into(),
            node_type: NodeType::CentralThesis,
            position: Position::default(),
            data: serde_json::json!({"content": "moat"}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "central-thesis");
        assert_eq!(json["stockId"], "stock_1");
        assert_eq!(json["position"]["x"], 0.0);
        assert_eq!(node.content(), Some("moat"));
    }

    #[test]
    fn test_journal_date_parsing() {
        assert_eq!(
            parse_journal_date("2024-03-09"),
            NaiveDate::from_ymd_opt(2024, 3, 9)
        );
        assert!(parse_journal_date("03/09/2024").is_none());
        assert!(parse_journal_date("2024-02-30").is_none());
    }

    #[test]
    fn test_stock_value_helpers() {
        let stock = Stock {
            id: "stock_1".into(),
            name: "AT&T Inc.".into(),
            ticker: "T".into(),
            investment_type: InvestmentType::HighDividend,
            shares: 10,
            price: "17.25".into(),
            thesis: String::new(),
            is_watchlist: false,
            is_favorite: false,
            price_target: Some("20".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(stock.position_value(), 172.5);
        assert_eq!(stock.price_target_value(), Some(20.0));
        assert_eq!(stock.logo_url(), "https://api.elbstream.com/logos/symbol/T");
    }
}
