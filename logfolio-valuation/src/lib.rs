//! Logfolio Valuation - Discounted-cash-flow projection engine.
//!
//! Given a handful of assumptions about a company (current value of a cash
//! metric, its growth, share count drift, a terminal multiple and a discount
//! rate) the engine projects the metric year by year, discounts it back and
//! derives a fair value per share, the implied CAGR and the upside versus the
//! current price.
//!
//! # Usage
//!
//! ```
//! use logfolio_valuation::{project, ValuationInputs};
//!
//! let result = project(&ValuationInputs::default()).expect("default inputs are valid");
//! assert!((result.fair_value_per_share() - 200.0).abs() < 0.01);
//! ```
//!
//! Insufficient inputs (a zero price, no projection years, ...) produce
//! `None` rather than an error.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod dcf;
pub mod form;
pub mod report;
pub mod types;

pub use dcf::{implied_cagr, is_computable, project, MAX_PROJECTION_YEARS};
pub use form::ValuationForm;
pub use report::render_text;
pub use types::{
    Metric, MetricLabels, ProjectionRow, UnknownMetric, ValuationInputs, ValuationResult,
    BASE_SHARE_COUNT,
};
