//! Configuration validation.
//!
//! Serde handles syntax; this checks value ranges and that addresses and
//! URLs actually parse. All problems are reported, not just the first.

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ServiceConfig;

/// Longest accepted cache TTL (one day).
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: invalid URL {value:?}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("faults.probability must be within [0, 1], got {0}")]
    ProbabilityOutOfRange(f64),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{field} must be at most {max}, got {value}")]
    TooLarge {
        field: &'static str,
        value: u64,
        max: u64,
    },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.cache.ttl_secs == 0 {
        errors.push(ValidationError::Zero("cache.ttl_secs"));
    } else if config.cache.ttl_secs > MAX_CACHE_TTL_SECS {
        errors.push(ValidationError::TooLarge {
            field: "cache.ttl_secs",
            value: config.cache.ttl_secs,
            max: MAX_CACHE_TTL_SECS,
        });
    }
    if config.cache.sweep_interval_secs == 0 {
        errors.push(ValidationError::Zero("cache.sweep_interval_secs"));
    }
    if config.upstream.timeout_secs == Some(0) {
        errors.push(ValidationError::Zero("upstream.timeout_secs"));
    }

    let probability = config.faults.probability;
    if !(0.0..=1.0).contains(&probability) {
        errors.push(ValidationError::ProbabilityOutOfRange(probability));
    }

    if Url::parse(&config.upstream.endpoint).is_err() {
        errors.push(ValidationError::InvalidUrl {
            field: "upstream.endpoint",
            value: config.upstream.endpoint.clone(),
        });
    }

    if config.downstream.enabled && Url::parse(&config.downstream.url).is_err() {
        errors.push(ValidationError::InvalidUrl {
            field: "downstream.url",
            value: config.downstream.url.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
