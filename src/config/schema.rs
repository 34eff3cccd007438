//! Configuration schema definitions.
//!
//! `ClientConfig` holds the process-wide defaults every call starts from.
//! All types derive Serde traits for deserialization from config files; the
//! camelCase option names are accepted as aliases.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::request::dates::DEFAULT_DATE_FORMAT;
use crate::request::{ContentType, RequestOptions};

/// Root configuration for the orchestrator.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL relative call URLs resolve against (transport-level).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Scheme placed before the token in `Authorization` (e.g. "Bearer").
    #[serde(alias = "authenticationScheme")]
    pub auth_scheme: String,

    /// Default per-request timeout in milliseconds.
    #[serde(alias = "timeout")]
    pub timeout_ms: u64,

    /// Headers sent with every request unless the call sets its own.
    #[serde(alias = "headers")]
    pub default_headers: BTreeMap<String, String>,

    /// `strftime` format date leaves are rewritten into.
    pub date_format: String,

    /// Business codes carried in response envelopes.
    pub business_codes: BusinessCodes,

    /// Default request policy, overridable per call.
    #[serde(alias = "requestOptions")]
    pub request_options: RequestOptions,

    pub observability: ObservabilityConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let mut default_headers = BTreeMap::new();
        default_headers.insert("Content-Type".to_string(), ContentType::JSON.to_string());

        Self {
            base_url: None,
            auth_scheme: String::new(),
            timeout_ms: 10_000,
            default_headers,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            business_codes: BusinessCodes::default(),
            request_options: RequestOptions::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Business status codes inside the response payload's `code` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BusinessCodes {
    pub success: i64,
    pub error: i64,
    pub timeout: i64,
}

impl Default for BusinessCodes {
    fn default() -> Self {
        Self {
            success: 0,
            error: -1,
            timeout: 401,
        }
    }
}

/// Partition of business codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusinessCode {
    Success,
    Timeout,
    Error,
    Other(i64),
}

impl BusinessCodes {
    pub fn classify(&self, code: i64) -> BusinessCode {
        if code == self.success {
            BusinessCode::Success
        } else if code == self.timeout {
            BusinessCode::Timeout
        } else if code == self.error {
            BusinessCode::Error
        } else {
            BusinessCode::Other(code)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
