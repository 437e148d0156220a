//! Configuration validation.
//!
//! Serde handles syntax; this module checks semantics. Every problem is
//! reported, not just the first.

use std::collections::HashSet;
use std::fmt;

use crate::config::schema::{NetworkConfig, ReactionConfig};

/// Largest supported native currency precision.
pub const MAX_DECIMALS: u8 = 36;

/// Gas consumed by a plain value transfer.
pub const MIN_TRANSFER_GAS: u64 = 21_000;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field.
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

/// Validate a full configuration.
pub fn validate_config(config: &ReactionConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = network_errors(&config.networks);

    if config.rpc.timeout_secs == 0 {
        errors.push(ValidationError::new("rpc.timeout_secs", "must be greater than 0"));
    }
    if config.rpc.gas_limit < MIN_TRANSFER_GAS {
        errors.push(ValidationError::new(
            "rpc.gas_limit",
            format!("must be at least {}", MIN_TRANSFER_GAS),
        ));
    }
    let multiplier = config.rpc.gas_price_multiplier;
    if multiplier.is_nan() || multiplier < 1.0 {
        errors.push(ValidationError::new("rpc.gas_price_multiplier", "must be at least 1.0"));
    }
    if config.confirmation.poll_interval_ms == 0 {
        errors.push(ValidationError::new(
            "confirmation.poll_interval_ms",
            "must be greater than 0",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate an ordered network list on its own.
pub fn validate_networks(networks: &[NetworkConfig]) -> Result<(), Vec<ValidationError>> {
    let errors = network_errors(networks);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn network_errors(networks: &[NetworkConfig]) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if networks.is_empty() {
        errors.push(ValidationError::new("networks", "at least one network is required"));
        return errors;
    }

    let mut seen = HashSet::new();
    for (i, network) in networks.iter().enumerate() {
        let prefix = format!("networks[{}]", i);

        if network.name.trim().is_empty() {
            errors.push(ValidationError::new(format!("{}.name", prefix), "must not be empty"));
        } else if !seen.insert(network.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.name", prefix),
                format!("duplicate network name '{}'", network.name),
            ));
        }

        if let Err(message) = check_rpc_url(&network.rpc_url) {
            errors.push(ValidationError::new(format!("{}.rpc_url", prefix), message));
        }
        for (j, url) in network.failover_urls.iter().enumerate() {
            if let Err(message) = check_rpc_url(url) {
                errors.push(ValidationError::new(
                    format!("{}.failover_urls[{}]", prefix, j),
                    message,
                ));
            }
        }

        if network.chain_id == 0 {
            errors.push(ValidationError::new(format!("{}.chain_id", prefix), "must be non-zero"));
        }
        if network.decimals > MAX_DECIMALS {
            errors.push(ValidationError::new(
                format!("{}.decimals", prefix),
                format!("must be at most {}", MAX_DECIMALS),
            ));
        }
    }

    errors
}

fn check_rpc_url(raw: &str) -> Result<(), String> {
    let url = url::Url::parse(raw).map_err(|e| format!("invalid URL '{}': {}", raw, e))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{}', expected http or https", other)),
    }
}
