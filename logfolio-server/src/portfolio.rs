//! Portfolio and watchlist views over the stored stocks.
//!
//! Pure functions: the route loads stock views from storage and hands them to
//! [`build_summary`].

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::models::StockView;

/// Column a portfolio table can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortColumn {
    Name,
    Shares,
    Price,
    Value,
    Allocation,
    PriceTarget,
    Difference,
    Starred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// `GET /api/portfolio` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortfolioQuery {
    /// Case-insensitive search over name, ticker and strategy names
    pub q: Option<String>,
    pub sort: Option<SortColumn>,
    #[serde(default)]
    pub dir: SortDirection,
}

/// A stock with its derived position figures.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioRow {
    #[serde(flatten)]
    pub view: StockView,
    /// `shares × price`
    pub value: f64,
    /// Share of the portfolio total in percent; 0 on the watchlist
    pub allocation: f64,
    /// Price-target difference in percent
    pub difference: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub portfolio: Vec<PortfolioRow>,
    pub watchlist: Vec<PortfolioRow>,
    pub portfolio_total: f64,
}

/// Sum of `shares × price` over non-watchlist stocks holding shares.
pub fn portfolio_total(views: &[StockView]) -> f64 {
    views
        .iter()
        .filter(|v| !v.stock.is_watchlist && v.stock.shares > 0)
        .map(|v| v.stock.position_value())
        .sum()
}

/// Allocation percent of `value` within `total`; 0 when the total is 0.
pub fn allocation_percent(value: f64, total: f64) -> f64 {
    if total == 0.0 {
        0.0
    } else {
        value / total * 100.0
    }
}

/// `(target − price) / price × 100`; `None` when either side is missing or 0.
pub fn target_difference(price: f64, target: Option<f64>) -> Option<f64> {
    match target {
        Some(target) if target != 0.0 && price != 0.0 => Some((target - price) / price * 100.0),
        _ => None,
    }
}

/// Whether a stock matches a search term.
pub fn matches_search(view: &StockView, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    view.stock.name.to_lowercase().contains(&term)
        || view.stock.ticker.to_lowercase().contains(&term)
        || view
            .strategies
            .iter()
            .any(|s| s.name.to_lowercase().contains(&term))
}

fn compare_rows(a: &PortfolioRow, b: &PortfolioRow, column: SortColumn) -> Ordering {
    match column {
        SortColumn::Name => a
            .view
            .stock
            .name
            .to_lowercase()
            .cmp(&b.view.stock.name.to_lowercase()),
        SortColumn::Shares => a.view.stock.shares.cmp(&b.view.stock.shares),
        SortColumn::Price => a
            .view
            .stock
            .price_value()
            .total_cmp(&b.view.stock.price_value()),
        SortColumn::Value => a.value.total_cmp(&b.value),
        SortColumn::Allocation => a.allocation.total_cmp(&b.allocation),
        SortColumn::PriceTarget => a
            .view
            .stock
            .price_target_value()
            .unwrap_or(0.0)
            .total_cmp(&b.view.stock.price_target_value().unwrap_or(0.0)),
        SortColumn::Difference => a
            .difference
            .unwrap_or(0.0)
            .total_cmp(&b.difference.unwrap_or(0.0)),
        SortColumn::Starred => a.view.stock.is_favorite.cmp(&b.view.stock.is_favorite),
    }
}

/// Order rows: favorites first, then by `sort` when given. The sort is
/// stable, so ties keep storage order.
pub fn sort_rows(rows: &mut [PortfolioRow], sort: Option<SortColumn>, dir: SortDirection) {
    rows.sort_by(|a, b| {
        let favorites = b.view.stock.is_favorite.cmp(&a.view.stock.is_favorite);
        let column = match sort {
            Some(column) => {
                let ord = compare_rows(a, b, column);
                match dir {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            }
            None => Ordering::Equal,
        };
        favorites.then(column)
    });
}

/// Split, filter and sort stock views into the portfolio page.
///
/// The total covers every portfolio stock, including ones hidden by search.
pub fn build_summary(views: Vec<StockView>, query: &PortfolioQuery) -> PortfolioSummary {
    let total = portfolio_total(&views);
    let term = query.q.as_deref().unwrap_or("");

    let (mut portfolio, mut watchlist): (Vec<PortfolioRow>, Vec<PortfolioRow>) = views
        .into_iter()
        .filter(|view| matches_search(view, term))
        .map(|view| {
            let value = view.stock.position_value();
            let allocation = if view.stock.is_watchlist {
                0.0
            } else {
                allocation_percent(value, total)
            };
            let difference =
                target_difference(view.stock.price_value(), view.stock.price_target_value());
            PortfolioRow {
                view,
                value,
                allocation,
                difference,
            }
        })
        .partition(|row| !row.view.stock.is_watchlist);

    sort_rows(&mut portfolio, query.sort, query.dir);
    sort_rows(&mut watchlist, query.sort, query.dir);

    PortfolioSummary {
        portfolio,
        watchlist,
        portfolio_total: total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InvestmentType, Stock, Strategy};
    use chrono::Utc;
    use test_case::test_case;

    fn view(name: &str, shares: i64, price: &str) -> StockView {
        let now = Utc::now();
        let stock = Stock {
            id: format!("stock_{}", name.to_lowercase()),
            name: name.to_string(),
            ticker: name.chars().take(4).collect::<String>().to_uppercase(),
            investment_type: InvestmentType::Core,
            shares,
            price: price.to_string(),
            thesis: String::new(),
            is_watchlist: false,
            is_favorite: false,
            price_target: None,
            created_at: now,
            updated_at: now,
        };
        let logo_url = stock.logo_url();
        StockView {
            stock,
            entry_count: 0,
            strategies: Vec::new(),
            logo_url,
        }
    }

    fn names(rows: &[PortfolioRow]) -> Vec<&str> {
        rows.iter().map(|r| r.view.stock.name.as_str()).collect()
    }

    #[test]
    fn test_total_skips_watchlist_and_empty_positions() {
        let mut watched = view("Watched", 50, "10");
        watched.stock.is_watchlist = true;
        let views = vec![view("Apple", 10, "150"), view("Empty", 0, "99"), watched];
        assert_eq!(portfolio_total(&views), 1500.0);
    }

    #[test]
    fn test_summary_split_and_allocation() {
        let mut watched = view("Watched", 5, "10");
        watched.stock.is_watchlist = true;
        let views = vec![view("Apple", 10, "150"), view("Coke", 50, "10"), watched];

        let summary = build_summary(views, &PortfolioQuery::default());
        assert_eq!(summary.portfolio_total, 2000.0);
        assert_eq!(names(&summary.portfolio), vec!["Apple", "Coke"]);
        assert_eq!(summary.portfolio[0].allocation, 75.0);
        assert_eq!(summary.portfolio[1].allocation, 25.0);
        assert_eq!(names(&summary.watchlist), vec!["Watched"]);
        assert_eq!(summary.watchlist[0].allocation, 0.0);
    }

    #[test]
    fn test_favorites_first_keeps_order() {
        let mut fav = view("Fav", 1, "1");
        fav.stock.is_favorite = true;
        let views = vec![view("A", 1, "1"), view("B", 1, "1"), fav, view("C", 1, "1")];

        let summary = build_summary(views, &PortfolioQuery::default());
        assert_eq!(names(&summary.portfolio), vec!["Fav", "A", "B", "C"]);
    }

    #[test]
    fn test_search_matches_strategy_names() {
        let mut dividend = view("Coca-Cola", 1, "60");
        let now = Utc::now();
        dividend.strategies.push(Strategy {
            id: "strategy_dividend_growth".into(),
            name: "Dividend Growth".into(),
            description: String::new(),
            color: "#22c55e".into(),
            icon: "DollarSign".into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        });
        let views = vec![view("Apple", 1, "150"), dividend];

        let query = PortfolioQuery {
            q: Some("DIVIDEND".into()),
            ..Default::default()
        };
        let summary = build_summary(views, &query);
        assert_eq!(names(&summary.portfolio), vec!["Coca-Cola"]);
        // Total still covers the hidden row
        assert_eq!(summary.portfolio_total, 210.0);
    }

    #[test_case(SortColumn::Name, SortDirection::Asc, &["apple", "Banana", "cherry"] ; "name asc is case insensitive")]
    #[test_case(SortColumn::Value, SortDirection::Desc, &["cherry", "apple", "Banana"] ; "value desc")]
    #[test_case(SortColumn::Shares, SortDirection::Asc, &["Banana", "apple", "cherry"] ; "shares asc")]
    #[test_case(SortColumn::Price, SortDirection::Desc, &["apple", "Banana", "cherry"] ; "price desc")]
    fn test_sort_columns(column: SortColumn, dir: SortDirection, expected: &[&str]) {
        let views = vec![
            view("Banana", 1, "50"),
            view("cherry", 100, "2"),
            view("apple", 2, "60"),
        ];
        let query = PortfolioQuery {
            q: None,
            sort: Some(column),
            dir,
        };
        let summary = build_summary(views, &query);
        assert_eq!(names(&summary.portfolio), expected);
    }

    #[test]
    fn test_sort_by_difference_treats_missing_as_zero() {
        let mut up = view("Up", 1, "100");
        up.stock.price_target = Some("150".into());
        let mut down = view("Down", 1, "100");
        down.stock.price_target = Some("80".into());
        let none = view("None", 1, "100");

        let query = PortfolioQuery {
            q: None,
            sort: Some(SortColumn::Difference),
            dir: SortDirection::Asc,
        };
        let summary = build_summary(vec![up, none, down], &query);
        assert_eq!(names(&summary.portfolio), vec!["Down", "None", "Up"]);
        assert_eq!(summary.portfolio[0].difference, Some(-20.0));
        assert_eq!(summary.portfolio[1].difference, None);
    }

    #[test_case(100.0, Some(125.0), Some(25.0) ; "upside")]
    #[test_case(0.0, Some(125.0), None ; "zero price")]
    #[test_case(100.0, Some(0.0), None ; "zero target")]
    #[test_case(100.0, None, None ; "no target")]
    fn test_target_difference(price: f64, target: Option<f64>, expected: Option<f64>) {
        assert_eq!(target_difference(price, target), expected);
    }

    #[test]
    fn test_query_deserializes_camel_case_columns() {
        let query: PortfolioQuery =
            serde_json::from_str(r#"{"sort": "priceTarget", "dir": "asc"}"#).unwrap();
        assert_eq!(query.sort, Some(SortColumn::PriceTarget));
        assert_eq!(query.dir, SortDirection::Asc);
        assert_eq!(allocation_percent(10.0, 0.0), 0.0);
    }
}
