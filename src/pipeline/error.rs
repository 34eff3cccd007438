//! Classified errors surfaced by the pipeline.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::transport::TransportError;

/// Generic fallback when nothing better is known.
pub const GENERIC_FAILURE_MESSAGE: &str = "api request failed";
/// Business-level timeout reported inside a well-formed envelope.
pub const RESPONSE_TIMEOUT_MESSAGE: &str = "response timed out";
/// Transport-level deadline exceeded.
pub const REQUEST_TIMEOUT_MESSAGE: &str = "request timed out";
pub const NETWORK_ERROR_MESSAGE: &str = "network error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NetworkError,
    TimeoutError,
    BusinessError,
    CancelledError,
    TransformError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NetworkError => "network",
            ErrorKind::TimeoutError => "timeout",
            ErrorKind::BusinessError => "business",
            ErrorKind::CancelledError => "cancelled",
            ErrorKind::TransformError => "transform",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error with its taxonomy label and the raw detail it came from.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{kind} error: {message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    pub raw: Option<Value>,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            raw: None,
        }
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = Some(raw);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TimeoutError, message)
    }

    pub fn business(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BusinessError, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CancelledError, message)
    }

    pub fn transform(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransformError, message)
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::CancelledError
    }
}

/// Map a transport failure onto the taxonomy.
///
/// Timeouts are recognized both by tag and by the `ECONNABORTED` +
/// "timeout" text some transports report instead.
pub fn classify_transport_error(error: TransportError) -> ClassifiedError {
    let raw = Value::String(error.to_string());
    let classified = match &error {
        TransportError::Timeout(_) => ClassifiedError::timeout(REQUEST_TIMEOUT_MESSAGE),
        TransportError::Cancelled(reason) => ClassifiedError::cancelled(reason.clone()),
        TransportError::Network(_) => ClassifiedError::network(NETWORK_ERROR_MESSAGE),
        TransportError::Status { status, payload } => {
            let classified = ClassifiedError::network(error.to_string());
            return match payload {
                Some(payload) => classified.with_raw(serde_json::json!({"status": status, "payload": payload})),
                None => classified.with_raw(raw),
            };
        }
        TransportError::InvalidRequest(message) => ClassifiedError::transform(message.clone()),
        TransportError::Other { code, message } => {
            let lowered = message.to_ascii_lowercase();
            if code.as_deref() == Some("ECONNABORTED") && lowered.contains("timeout") {
                ClassifiedError::timeout(REQUEST_TIMEOUT_MESSAGE)
            } else if message.contains("Network Error") {
                ClassifiedError::network(NETWORK_ERROR_MESSAGE)
            } else {
                ClassifiedError::network(message.clone())
            }
        }
    };
    classified.with_raw(raw)
}
