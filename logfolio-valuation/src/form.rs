//! Valuation form input.
//!
//! Holds each field as the text the user typed and coerces it leniently into
//! [`ValuationInputs`]. Percent fields are entered as percentages.

use logfolio_common::util::{parse_float_prefix, parse_int_prefix};
use serde::{Deserialize, Deserializer, Serialize};

use crate::dcf;
use crate::types::{Metric, ValuationInputs, ValuationResult};

/// Raw DCF form fields.
///
/// Any field may be omitted when deserializing; omitted fields take the form
/// defaults. Numbers are accepted in place of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValuationForm {
    pub metric: Metric,
    #[serde(deserialize_with = "lenient_text")]
    pub projection_years: String,
    #[serde(deserialize_with = "lenient_text")]
    pub current_metric_value: String,
    /// Percent
    #[serde(deserialize_with = "lenient_text")]
    pub share_count_growth_rate: String,
    /// Percent
    #[serde(deserialize_with = "lenient_text")]
    pub metric_growth_rate: String,
    #[serde(deserialize_with = "lenient_text")]
    pub terminal_multiple: String,
    /// Percent
    #[serde(deserialize_with = "lenient_text")]
    pub discount_rate: String,
    #[serde(deserialize_with = "lenient_text")]
    pub current_share_price: String,
    #[serde(deserialize_with = "lenient_text")]
    pub current_multiple: String,
}

impl Default for ValuationForm {
    fn default() -> Self {
        Self {
            metric: Metric::FreeCashFlow,
            projection_years: "5".into(),
            current_metric_value: "1000".into(),
            share_count_growth_rate: "0".into(),
            metric_growth_rate: "10".into(),
            terminal_multiple: "15".into(),
            discount_rate: "10".into(),
            current_share_price: "230".into(),
            current_multiple: "25".into(),
        }
    }
}

impl ValuationForm {
    /// Coerce the text fields into numeric inputs.
    ///
    /// Each field parses its leading numeric prefix; empty or unparseable text
    /// becomes 0, which the validity gate then treats as "not entered".
    pub fn to_inputs(&self) -> ValuationInputs {
        ValuationInputs {
            metric: self.metric,
            projection_years: parse_int_prefix(&self.projection_years).unwrap_or(0),
            current_metric_value: number(&self.current_metric_value),
            share_count_growth_rate: percent(&self.share_count_growth_rate),
            metric_growth_rate: percent(&self.metric_growth_rate),
            terminal_multiple: number(&self.terminal_multiple),
            discount_rate: percent(&self.discount_rate),
            current_share_price: number(&self.current_share_price),
            current_multiple: number(&self.current_multiple),
        }
    }

    /// Coerce and project in one step.
    pub fn evaluate(&self) -> Option<ValuationResult> {
        dcf::project(&self.to_inputs())
    }
}

fn number(text: &str) -> f64 {
    parse_float_prefix(text).unwrap_or(0.0)
}

fn percent(text: &str) -> f64 {
    number(text) / 100.0
}

/// Accept a string, a number or null for a text field.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected text or number, found {other}"
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_coerce_to_fractions() {
        let inputs = ValuationForm::default().to_inputs();
        assert_eq!(inputs, ValuationInputs::default());
    }

    #[test]
    fn test_lenient_parsing() {
        let form = ValuationForm {
            projection_years: "7.8".into(),
            metric_growth_rate: "12.5%".into(),
            share_count_growth_rate: "abc".into(),
            current_share_price: "  99.5".into(),
            ..Default::default()
        };
        let inputs = form.to_inputs();
        assert_eq!(inputs.projection_years, 7);
        assert!((inputs.metric_growth_rate - 0.125).abs() < 1e-12);
        assert_eq!(inputs.share_count_growth_rate, 0.0);
        assert_eq!(inputs.current_share_price, 99.5);
    }

    #[test]
    fn test_empty_required_field_yields_no_result() {
        let form = ValuationForm {
            current_multiple: String::new(),
            ..Default::default()
        };
        assert!(form.evaluate().is_none());
    }

    #[test]
    fn test_empty_rate_still_computes() {
        let form = ValuationForm {
            metric_growth_rate: String::new(),
            ..Default::default()
        };
        let result = form.evaluate().unwrap();
        assert_eq!(result.projections()[0].metric_value, 1000.0);
    }

    #[test]
    fn test_deserialize_partial_and_numeric() {
        let form: ValuationForm = serde_json::from_str(
            r#"{"metric": "dividend", "projectionYears": 3, "discountRate": "8", "currentMultiple": null}"#,
        )
        .unwrap();
        assert_eq!(form.metric, Metric::Dividend);
        assert_eq!(form.projection_years, "3");
        assert_eq!(form.discount_rate, "8");
        assert_eq!(form.current_multiple, "");
        assert_eq!(form.terminal_multiple, "15");
    }

    #[test]
    fn test_deserialize_rejects_objects() {
        let parsed = serde_json::from_str::<ValuationForm>(r#"{"projectionYears": {"x": 1}}"#);
        assert!(parsed.is_err());
    }
}
