//! Valuation types.
//!
//! Numeric inputs, per-year projection rows and the derived result of a DCF run.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Base share count at year 0; share counts are tracked relative to it.
pub const BASE_SHARE_COUNT: f64 = 100.0;

// ============================================================================
// Metric
// ============================================================================

/// The financial quantity being projected.
///
/// Selecting a metric only changes labels, never the formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Metric {
    #[default]
    #[serde(rename = "fcf", alias = "FreeCashFlow")]
    FreeCashFlow,
    #[serde(rename = "operating-income", alias = "OperatingIncome")]
    OperatingIncome,
    #[serde(rename = "dividend", alias = "Dividend")]
    Dividend,
    #[serde(rename = "ebitda", alias = "EBITDA")]
    Ebitda,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::FreeCashFlow,
        Metric::OperatingIncome,
        Metric::Dividend,
        Metric::Ebitda,
    ];

    /// Full display label.
    pub fn label(self) -> &'static str {
        match self {
            Self::FreeCashFlow => "Free Cash Flow",
            Self::OperatingIncome => "Operating Income",
            Self::Dividend => "Dividend",
            Self::Ebitda => "EBITDA",
        }
    }

    /// Column-width label.
    pub fn short_label(self) -> &'static str {
        match self {
            Self::FreeCashFlow => "FCF",
            Self::OperatingIncome => "Op. Income",
            Self::Dividend => "Dividend",
            Self::Ebitda => "EBITDA",
        }
    }

    /// Wire identifier, as used in JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FreeCashFlow => "fcf",
            Self::OperatingIncome => "operating-income",
            Self::Dividend => "dividend",
            Self::Ebitda => "ebitda",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Returned when a metric name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown metric '{0}' (expected fcf, operating-income, dividend or ebitda)")]
pub struct UnknownMetric(pub String);

impl std::str::FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fcf" | "free-cash-flow" | "freecashflow" => Ok(Self::FreeCashFlow),
            "operating-income" | "operatingincome" | "op-income" => Ok(Self::OperatingIncome),
            "dividend" => Ok(Self::Dividend),
            "ebitda" => Ok(Self::Ebitda),
            _ => Err(UnknownMetric(s.to_string())),
        }
    }
}

/// Display labels for a metric, sent alongside API results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricLabels {
    pub metric: Metric,
    pub label: &'static str,
    pub short_label: &'static str,
}

impl From<Metric> for MetricLabels {
    fn from(metric: Metric) -> Self {
        Self {
            metric,
            label: metric.label(),
            short_label: metric.short_label(),
        }
    }
}

// ============================================================================
// Inputs
// ============================================================================

/// Numeric DCF assumptions. Rates are fractions (`0.10` = 10%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationInputs {
    #[serde(default)]
    pub metric: Metric,
    /// Number of forecast periods
    pub projection_years: i64,
    /// Current-period value of the chosen metric
    pub current_metric_value: f64,
    /// Per-period share count growth (negative for buybacks)
    #[serde(default)]
    pub share_count_growth_rate: f64,
    /// Per-period metric growth
    #[serde(default)]
    pub metric_growth_rate: f64,
    /// Multiple applied to the final-year metric
    pub terminal_multiple: f64,
    /// Per-period discount rate (WACC)
    pub discount_rate: f64,
    pub current_share_price: f64,
    /// Current trading multiple, only used for the implied-value figure
    pub current_multiple: f64,
}

impl Default for ValuationInputs {
    fn default() -> Self {
        Self {
            metric: Metric::FreeCashFlow,
            projection_years: 5,
            current_metric_value: 1000.0,
            share_count_growth_rate: 0.0,
            metric_growth_rate: 0.10,
            terminal_multiple: 15.0,
            discount_rate: 0.10,
            current_share_price: 230.0,
            current_multiple: 25.0,
        }
    }
}

// ============================================================================
// Outputs
// ============================================================================

/// One forecast year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionRow {
    /// 1-based year
    pub year: u32,
    pub metric_value: f64,
    /// Share count relative to a base of 100 at year 0
    pub share_count: f64,
    pub per_share_value: f64,
    pub present_value: f64,
}

/// Derived DCF projection.
///
/// Built only by [`crate::project`]; fields are read through accessors so a
/// result always reflects the inputs it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationResult {
    pub(crate) metric: Metric,
    pub(crate) projections: Vec<ProjectionRow>,
    pub(crate) terminal_value: f64,
    pub(crate) terminal_present_value: f64,
    pub(crate) total_present_value: f64,
    pub(crate) fair_value_per_share: f64,
    pub(crate) current_share_price: f64,
    /// `None` when fair value or price is not positive
    pub(crate) implied_cagr: Option<f64>,
    pub(crate) upside_percent: f64,
    pub(crate) final_share_count: f64,
    pub(crate) current_implied_value: f64,
}

impl ValuationResult {
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Year-ascending projection rows.
    pub fn projections(&self) -> &[ProjectionRow] {
        &self.projections
    }

    pub fn final_year(&self) -> &ProjectionRow {
        // Non-empty: the validity gate requires at least one projection year.
        &self.projections[self.projections.len() - 1]
    }

    pub fn terminal_value(&self) -> f64 {
        self.terminal_value
    }

    pub fn terminal_present_value(&self) -> f64 {
        self.terminal_present_value
    }

    pub fn total_present_value(&self) -> f64 {
        self.total_present_value
    }

    /// Sum of the yearly present values, excluding the terminal value.
    pub fn projected_present_value(&self) -> f64 {
        self.total_present_value - self.terminal_present_value
    }

    pub fn fair_value_per_share(&self) -> f64 {
        self.fair_value_per_share
    }

    /// The price the upside and CAGR were measured against.
    pub fn current_share_price(&self) -> f64 {
        self.current_share_price
    }

    /// Implied compound annual growth, in percent.
    pub fn implied_cagr(&self) -> Option<f64> {
        self.implied_cagr
    }

    /// Upside (positive) or downside (negative) versus the current price, in percent.
    pub fn upside_percent(&self) -> f64 {
        self.upside_percent
    }

    pub fn final_share_count(&self) -> f64 {
        self.final_share_count
    }

    pub fn current_implied_value(&self) -> f64 {
        self.current_implied_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_wire_names() {
        assert_eq!(serde_json::to_string(&Metric::FreeCashFlow).unwrap(), "\"fcf\"");
        assert_eq!(
            serde_json::from_str::<Metric>("\"operating-income\"").unwrap(),
            Metric::OperatingIncome
        );
        assert_eq!(serde_json::from_str::<Metric>("\"EBITDA\"").unwrap(), Metric::Ebitda);
        for metric in Metric::ALL {
            let json = serde_json::to_string(&metric).unwrap();
            assert_eq!(json, format!("\"{}\"", metric.as_str()));
        }
    }

    #[test]
    fn test_metric_from_str() {
        assert_eq!("FCF".parse::<Metric>().unwrap(), Metric::FreeCashFlow);
        assert_eq!("dividend".parse::<Metric>().unwrap(), Metric::Dividend);
        assert!("revenue".parse::<Metric>().is_err());
    }

    #[test]
    fn test_metric_labels() {
        assert_eq!(Metric::OperatingIncome.short_label(), "Op. Income");
        let labels = MetricLabels::from(Metric::Ebitda);
        assert_eq!(labels.label, "EBITDA");
    }

    #[test]
    fn test_inputs_camel_case() {
        let inputs: ValuationInputs = serde_json::from_str(
            r#"{"projectionYears": 3, "currentMetricValue": 50, "terminalMultiple": 10,
                "discountRate": 0.08, "currentSharePrice": 12, "currentMultiple": 9}"#,
        )
        .unwrap();
        assert_eq!(inputs.projection_years, 3);
        assert_eq!(inputs.metric, Metric::FreeCashFlow);
        assert_eq!(inputs.metric_growth_rate, 0.0);
    }
}
