//! Plain-text rendering of a valuation.
//!
//! Produces the fair-value summary, the per-year projection table and the
//! terminal/total rows. Dollar amounts honour the display blur option.

use logfolio_common::util::format_currency;
use logfolio_common::DisplayConfig;

use crate::types::{Metric, ValuationResult};

/// Shown when the inputs do not pass the validity gate.
pub const INSUFFICIENT_INPUT_MESSAGE: &str = "Enter valid inputs to see calculations.";

const RULE: &str = "═══════════════════════════════════════════════════════════════\n";
const THIN_RULE: &str = "───────────────────────────────────────────────────────────────\n";

/// Render a valuation (or the insufficient-input prompt) as text.
pub fn render_text(
    result: Option<&ValuationResult>,
    metric: Metric,
    display: DisplayConfig,
) -> String {
    let mut report = String::new();

    report.push_str(RULE);
    report.push_str(&format!("  DCF Valuation ({})\n", metric.label()));
    report.push_str(RULE);

    let Some(result) = result else {
        report.push_str(&format!("\n  {INSUFFICIENT_INPUT_MESSAGE}\n\n"));
        report.push_str(RULE);
        return report;
    };

    let blur = display.blur_currency;

    // Summary
    report.push_str("\nFair Value Analysis\n");
    report.push_str(THIN_RULE);
    report.push_str(&format!(
        "  Fair Value:        {:>14}\n",
        format_currency(result.fair_value_per_share(), blur)
    ));
    report.push_str(&format!(
        "  Current Price:     {:>14}\n",
        format_currency(result.current_share_price(), blur)
    ));
    report.push_str(&format!("  Expected CAGR:     {:>14}\n", format_cagr(result.implied_cagr())));
    report.push_str(&format!(
        "  Upside/Downside:   {:>14}\n",
        format_signed_percent(result.upside_percent())
    ));

    // Projections
    let metric_header = format!("{} ($M)", metric.short_label());
    report.push_str("\nProjections\n");
    report.push_str(THIN_RULE);
    report.push_str(&format!(
        "  {:<6}{:>16}{:>15}{:>15}{:>12}\n",
        "Year", metric_header, "Shares (Rel.)", "Per Share ($)", "PV ($M)"
    ));
    for row in result.projections() {
        report.push_str(&format!(
            "  {:<6}{:>16.2}{:>15.2}{:>15.2}{:>12.2}\n",
            row.year, row.metric_value, row.share_count, row.per_share_value, row.present_value
        ));
    }
    report.push_str(THIN_RULE);
    report.push_str(&format!(
        "  {:<37}{:>15.2}{:>12.2}\n",
        "Terminal Value",
        result.terminal_value(),
        result.terminal_present_value()
    ));
    report.push_str(&format!(
        "  {:<52}{:>12.2}\n",
        "Total Present Value ($M)",
        result.total_present_value()
    ));
    report.push('\n');
    report.push_str(RULE);

    report
}

/// `"+4.35%"`, `"-13.04%"`.
pub fn format_signed_percent(value: f64) -> String {
    if value >= 0.0 {
        format!("+{value:.2}%")
    } else {
        format!("{value:.2}%")
    }
}

/// CAGR with two decimals, or `"n/a"` when undefined.
pub fn format_cagr(cagr: Option<f64>) -> String {
    match cagr {
        Some(value) => format!("{value:.2}%"),
        None => "n/a".to_string(),
    }
}
