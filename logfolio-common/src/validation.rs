//! Configuration validation for Logfolio.
//!
//! Ensures required values are present and within valid ranges before the
//! service starts.

use thiserror::Error;

use crate::config::{AutosaveConfig, Config, NetworkConfig, ObservabilityConfig};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid port {port}: must be between 1 and 65535")]
    InvalidPort { port: u16, field: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "json"];
const MAX_DEBOUNCE_MS: u64 = 60_000;

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors: Vec<ValidationError> = [
            self.network.validate(),
            self.observability.validate(),
            self.autosave.validate(),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect();

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }
}

impl Validate for NetworkConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort {
                port: self.port,
                field: "network.port".into(),
            });
        }
        if self.bind.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "network.bind".into(),
            });
        }
        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        // Full EnvFilter directives (e.g. "info,logfolio_server=debug") are allowed.
        let base = self.log_level.split(',').next().unwrap_or_default();
        if !base.contains('=') && !LOG_LEVELS.contains(&base.to_ascii_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_level".into(),
                reason: format!("must be one of {}", LOG_LEVELS.join(", ")),
            });
        }
        if !LOG_FORMATS.contains(&self.log_format.as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_format".into(),
                reason: format!("must be one of {}", LOG_FORMATS.join(", ")),
            });
        }
        Ok(())
    }
}

impl Validate for AutosaveConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.debounce_ms == 0 || self.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ValidationError::InvalidValue {
                field: "autosave.debounce_ms".into(),
                reason: format!("must be between 1 and {MAX_DEBOUNCE_MS}"),
            });
        }
        Ok(())
    }
}
