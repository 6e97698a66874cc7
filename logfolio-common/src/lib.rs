//! Logfolio Common - Shared types, utilities, and configuration for Logfolio.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Configuration validation
//! - Error types and handling utilities
//! - Logging setup and structured logging helpers
//! - Record id generation and currency formatting

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod util;
pub mod validation;

pub use config::{
    AutosaveConfig, Config, DisplayConfig, NetworkConfig, ObservabilityConfig, StorageConfig,
};
pub use error::{Error, Result, ResultExt};
pub use validation::{Validate, ValidationError, ValidationResult};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{Config, DisplayConfig};
    pub use crate::error::{Error, Result, ResultExt};
    pub use crate::logging::init_logging;
    pub use crate::util::{format_currency, generate_id};
    pub use crate::validation::{Validate, ValidationError};
}
