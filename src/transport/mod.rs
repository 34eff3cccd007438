//! Transport boundary.
//!
//! # Data Flow
//! ```text
//! shaped RequestDescriptor
//!     → Transport::send (opaque: sockets, TLS, pooling live below this line)
//!     → ResultEnvelope { status, headers, payload }   on any 2xx
//!     → TransportError { Network | Timeout | Cancelled | Status | ... } otherwise
//! ```
//!
//! `http_client.rs` provides the reqwest-backed implementation; tests plug in
//! scripted transports through the same trait.

pub mod http_client;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::request::RequestDescriptor;

pub use http_client::HttpTransport;

/// Dispatches a shaped request and returns the decoded response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestDescriptor) -> Result<ResultEnvelope, TransportError>;
}

/// Tagged transport failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    /// Connection refused, reset, DNS failure.
    #[error("Network Error: {0}")]
    Network(String),

    /// Deadline exceeded.
    #[error("timeout of {0}ms exceeded")]
    Timeout(u64),

    /// The request was aborted before it settled.
    #[error("request cancelled: {0}")]
    Cancelled(String),

    /// Server answered with a non-success HTTP status.
    #[error("Request failed with status code {status}")]
    Status { status: u16, payload: Option<Value> },

    /// The request could not be built (bad URL, bad header).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Any other failure, with an optional error code such as `ECONNABORTED`.
    #[error("{message}")]
    Other { code: Option<String>, message: String },
}

/// The response as the transport hands it back.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct ResultEnvelope {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    /// Decoded response body; `None` when the body was empty.
    pub payload: Option<Value>,
}

impl ResultEnvelope {
    pub fn new(status: u16, payload: Option<Value>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            payload,
        }
    }

    /// Business code carried in the payload's `code` field.
    pub fn business_code(&self) -> Option<i64> {
        self.payload.as_ref()?.get("code")?.as_i64()
    }

    /// Server-supplied message, if any.
    pub fn message(&self) -> Option<&str> {
        self.payload
            .as_ref()?
            .get("message")?
            .as_str()
            .filter(|message| !message.is_empty())
    }

    /// The whole envelope as a JSON value.
    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
