//! Discounted-cash-flow projection.
//!
//! A pure function of [`ValuationInputs`]: every call recomputes the whole
//! projection from scratch. Horizons are a handful of years, so there is no
//! caching or incremental update.

use crate::types::{ProjectionRow, ValuationInputs, ValuationResult, BASE_SHARE_COUNT};

/// Longest horizon the engine will project. Longer horizons count as
/// insufficient input.
pub const MAX_PROJECTION_YEARS: i64 = 100;

/// Returns `true` when the inputs carry enough information to project.
///
/// Zero values for the required fields mean "not entered yet". Non-finite
/// numbers and horizons beyond [`MAX_PROJECTION_YEARS`] are treated the
/// same way.
pub fn is_computable(inputs: &ValuationInputs) -> bool {
    let required = [
        inputs.current_metric_value,
        inputs.terminal_multiple,
        inputs.discount_rate,
        inputs.current_share_price,
        inputs.current_multiple,
    ];

    (1..=MAX_PROJECTION_YEARS).contains(&inputs.projection_years)
        && required.iter().all(|v| *v != 0.0 && v.is_finite())
        && inputs.share_count_growth_rate.is_finite()
        && inputs.metric_growth_rate.is_finite()
}

/// Project a valuation, or `None` when the inputs are insufficient.
pub fn project(inputs: &ValuationInputs) -> Option<ValuationResult> {
    if !is_computable(inputs) {
        return None;
    }
    let years = u32::try_from(inputs.projection_years).ok()?;

    let discount_base = 1.0 + inputs.discount_rate;
    let mut metric_value = inputs.current_metric_value;
    let mut share_count = BASE_SHARE_COUNT;
    let mut projections = Vec::with_capacity(years as usize);

    for year in 1..=years {
        metric_value *= 1.0 + inputs.metric_growth_rate;
        share_count *= 1.0 + inputs.share_count_growth_rate;

        projections.push(ProjectionRow {
            year,
            metric_value,
            share_count,
            per_share_value: metric_value / share_count,
            present_value: metric_value / discount_base.powi(year as i32),
        });
    }

    let final_metric = metric_value;
    let final_share_count = share_count;

    let terminal_value = final_metric * inputs.terminal_multiple;
    let terminal_present_value = terminal_value / discount_base.powi(years as i32);
    let total_present_value =
        projections.iter().map(|row| row.present_value).sum::<f64>() + terminal_present_value;
    let fair_value_per_share = total_present_value / final_share_count;

    let upside_percent =
        (fair_value_per_share - inputs.current_share_price) / inputs.current_share_price * 100.0;
    let implied_cagr = implied_cagr(
        fair_value_per_share,
        inputs.current_share_price,
        inputs.projection_years,
    );

    // What today's metric is worth per share when re-rated from the current
    // multiple to the terminal one.
    let current_implied_value = inputs.current_metric_value
        / (BASE_SHARE_COUNT * (inputs.current_multiple / inputs.terminal_multiple));

    Some(ValuationResult {
        metric: inputs.metric,
        projections,
        terminal_value,
        terminal_present_value,
        total_present_value,
        fair_value_per_share,
        current_share_price: inputs.current_share_price,
        implied_cagr,
        upside_percent,
        final_share_count,
        current_implied_value,
    })
}

/// Annualised growth, in percent, from `price` to `fair_value` over `years`.
///
/// Undefined for a non-positive fair value or price, where the fractional
/// power would have no real result.
pub fn implied_cagr(fair_value: f64, price: f64, years: i64) -> Option<f64> {
    if fair_value <= 0.0 || price <= 0.0 || years <= 0 {
        return None;
    }
    let cagr = ((fair_value / price).powf(1.0 / years as f64) - 1.0) * 100.0;
    cagr.is_finite().then_some(cagr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 0.01,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_default_inputs_project() {
        let result = project(&ValuationInputs::default()).unwrap();
        assert_eq!(result.projections().len(), 5);
        assert_close(result.fair_value_per_share(), 200.0);
        assert_close(result.current_implied_value(), 6.0);
        assert_close(result.final_share_count(), 100.0);
    }

    #[test_case(|i: &mut ValuationInputs| i.projection_years = 0 ; "zero years")]
    #[test_case(|i: &mut ValuationInputs| i.projection_years = -3 ; "negative years")]
    #[test_case(|i: &mut ValuationInputs| i.projection_years = MAX_PROJECTION_YEARS + 1 ; "horizon too long")]
    #[test_case(|i: &mut ValuationInputs| i.projection_years = 4_000_000_000 ; "horizon past u32")]
    #[test_case(|i: &mut ValuationInputs| i.current_metric_value = 0.0 ; "zero metric")]
    #[test_case(|i: &mut ValuationInputs| i.terminal_multiple = 0.0 ; "zero terminal multiple")]
    #[test_case(|i: &mut ValuationInputs| i.discount_rate = 0.0 ; "zero discount rate")]
    #[test_case(|i: &mut ValuationInputs| i.current_share_price = 0.0 ; "zero price")]
    #[test_case(|i: &mut ValuationInputs| i.current_multiple = 0.0 ; "zero current multiple")]
    #[test_case(|i: &mut ValuationInputs| i.discount_rate = f64::NAN ; "nan discount rate")]
    #[test_case(|i: &mut ValuationInputs| i.metric_growth_rate = f64::INFINITY ; "infinite growth")]
    fn test_gate_refuses(mutate: fn(&mut ValuationInputs)) {
        let mut inputs = ValuationInputs::default();
        mutate(&mut inputs);
        assert!(!is_computable(&inputs));
        assert!(project(&inputs).is_none());
    }

    #[test]
    fn test_longest_horizon_projects() {
        let inputs = ValuationInputs {
            projection_years: MAX_PROJECTION_YEARS,
            ..ValuationInputs::default()
        };
        let result = project(&inputs).unwrap();
        assert_eq!(result.projections().len(), MAX_PROJECTION_YEARS as usize);
        assert_eq!(result.projections().last().unwrap().year, 100);
    }

    #[test]
    fn test_rates_do_not_gate() {
        let inputs = ValuationInputs {
            metric_growth_rate: 0.0,
            share_count_growth_rate: 0.0,
            ..Default::default()
        };
        assert!(project(&inputs).is_some());
    }

    #[test]
    fn test_negative_metric_propagates() {
        let inputs = ValuationInputs {
            current_metric_value: -500.0,
            ..Default::default()
        };
        let result = project(&inputs).unwrap();
        assert!(result.fair_value_per_share() < 0.0);
        assert!(result.implied_cagr().is_none());
        assert!(result.upside_percent() < -100.0);
    }

    #[test]
    fn test_buybacks_shrink_share_count() {
        let inputs = ValuationInputs {
            share_count_growth_rate: -0.02,
            ..Default::default()
        };
        let result = project(&inputs).unwrap();
        assert_close(result.projections()[0].share_count, 98.0);
        assert!(result.final_share_count() < 100.0);
        assert!(result.fair_value_per_share() > 200.0);
    }

    #[test_case(200.0, 230.0, 5, Some(-2.76) ; "downside")]
    #[test_case(200.0, 100.0, 1, Some(100.0) ; "double in one year")]
    #[test_case(0.0, 100.0, 5, None ; "zero fair value")]
    #[test_case(-50.0, 100.0, 5, None ; "negative fair value")]
    #[test_case(50.0, -10.0, 5, None ; "negative price")]
    fn test_implied_cagr(fair: f64, price: f64, years: i64, expected: Option<f64>) {
        match (implied_cagr(fair, price, years), expected) {
            (Some(actual), Some(expected)) => assert_close(actual, expected),
            (actual, expected) => assert_eq!(actual, expected),
        }
    }
}
