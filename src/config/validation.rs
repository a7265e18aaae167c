//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (attempt counts >= 1, sane poll interval)
//! - Check URLs parse before services try to connect with them
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: WalletConfig → Result<(), Vec<ValidationError>>
//! - Runs before the config is accepted into the system

use crate::config::schema::WalletConfig;

/// One failed semantic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check every semantic constraint, collecting all violations.
pub fn validate_config(config: &WalletConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(err) = config.provider.rpc_url.parse::<url::Url>() {
        errors.push(ValidationError {
            field: "provider.rpc_url",
            message: format!("invalid URL '{}': {}", config.provider.rpc_url, err),
        });
    }

    if config.provider.max_gas_price_gwei == 0 {
        errors.push(ValidationError {
            field: "provider.max_gas_price_gwei",
            message: "must be at least 1".to_string(),
        });
    }

    if config.reporting.enabled {
        if let Err(err) = config.reporting.endpoint.parse::<url::Url>() {
            errors.push(ValidationError {
                field: "reporting.endpoint",
                message: format!("invalid URL '{}': {}", config.reporting.endpoint, err),
            });
        }
    }

    if config.reporting.poll_interval_ms < 500 {
        errors.push(ValidationError {
            field: "reporting.poll_interval_ms",
            message: "must be at least 500".to_string(),
        });
    }

    if config.reporting.max_attempts == 0 {
        errors.push(ValidationError {
            field: "reporting.max_attempts",
            message: "must be at least 1".to_string(),
        });
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError {
            field: "retries.max_attempts",
            message: "must be at least 1".to_string(),
        });
    }

    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError {
            field: "retries.base_delay_ms",
            message: "must not exceed retries.max_delay_ms".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
