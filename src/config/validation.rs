//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate endpoint URLs and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SdkConfig → Result<(), Vec<ValidationError>>

use std::fmt;

use crate::account::ss58::MAX_SS58_FORMAT;
use crate::config::schema::SdkConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const NODE_SCHEMES: [&str; 4] = ["ws", "wss", "http", "https"];

fn check_url(field: &str, raw: &str, errors: &mut Vec<ValidationError>) {
    match url::Url::parse(raw) {
        Ok(parsed) if NODE_SCHEMES.contains(&parsed.scheme()) => {}
        Ok(parsed) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", parsed.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", raw, e))),
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &SdkConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let network = &config.network;

    check_url("network.url", &network.url, &mut errors);
    for (i, url) in network.failover_urls.iter().enumerate() {
        check_url(&format!("network.failover_urls[{}]", i), url, &mut errors);
    }

    if network.ss58_format > MAX_SS58_FORMAT {
        errors.push(ValidationError::new(
            "network.ss58_format",
            format!("must be at most {}", MAX_SS58_FORMAT),
        ));
    }
    if network.timeout_secs == 0 {
        errors.push(ValidationError::new("network.timeout_secs", "must be greater than 0"));
    }
    if network.bulk_concurrency == 0 {
        errors.push(ValidationError::new("network.bulk_concurrency", "must be greater than 0"));
    }
    if network.transfer_call.trim().is_empty() {
        errors.push(ValidationError::new("network.transfer_call", "must not be empty"));
    }

    let retries = &config.retries;
    if retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if retries.base_delay_ms > retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            "must not exceed retries.max_delay_ms",
        ));
    }

    if tracing_subscriber::EnvFilter::try_new(&config.observability.log_level).is_err() {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("invalid filter '{}'", config.observability.log_level),
        ));
    }

    if config.marketplace.pallet.trim().is_empty() {
        errors.push(ValidationError::new("marketplace.pallet", "must not be empty"));
    }
    if config.marketplace.default_expiry_blocks == 0 {
        errors.push(ValidationError::new(
            "marketplace.default_expiry_blocks",
            "must be greater than 0",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
