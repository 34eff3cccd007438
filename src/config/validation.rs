//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and URL/header syntax
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use reqwest::header::{HeaderName, HeaderValue};
use thiserror::Error;
use url::Url;

use crate::config::schema::ClientConfig;
use crate::request::dates::is_valid_date_format;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("timeout_ms must be greater than zero")]
    ZeroTimeout,

    #[error("invalid base_url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid header name '{0}'")]
    InvalidHeaderName(String),

    #[error("invalid value for header '{0}'")]
    InvalidHeaderValue(String),

    #[error("date_format must not be empty")]
    EmptyDateFormat,

    #[error("invalid date_format '{0}'")]
    InvalidDateFormat(String),

    #[error("business codes success/error/timeout must be distinct")]
    AmbiguousBusinessCodes,

    #[error("invalid metrics_address '{0}'")]
    InvalidMetricsAddress(String),
}

pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if let Some(base_url) = &config.base_url {
        match Url::parse(base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => errors.push(ValidationError::InvalidBaseUrl {
                url: base_url.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            }),
            Err(e) => errors.push(ValidationError::InvalidBaseUrl {
                url: base_url.clone(),
                reason: e.to_string(),
            }),
        }
    }

    for (name, value) in &config.default_headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidHeaderName(name.clone()));
        } else if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::InvalidHeaderValue(name.clone()));
        }
    }

    if config.date_format.trim().is_empty() {
        errors.push(ValidationError::EmptyDateFormat);
    } else if !is_valid_date_format(&config.date_format) {
        errors.push(ValidationError::InvalidDateFormat(config.date_format.clone()));
    }

    let codes = config.business_codes;
    if codes.success == codes.error || codes.success == codes.timeout || codes.error == codes.timeout {
        errors.push(ValidationError::AmbiguousBusinessCodes);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
