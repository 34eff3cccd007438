//! reqwest-backed transport.
//!
//! # Responsibilities
//! - Resolve relative URLs against the configured base URL
//! - Encode the shaped body (JSON, form text, multipart)
//! - Enforce the per-request timeout
//! - Decode the response body and tag failures

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use url::Url;

use crate::config::ClientConfig;
use crate::request::multipart::PartValue;
use crate::request::{Body, ContentType, Method, MultipartForm, RequestDescriptor};
use crate::transport::{ResultEnvelope, Transport, TransportError};

/// HTTP transport over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Option<Url>,
    default_timeout_ms: u64,
}

impl HttpTransport {
    pub fn new(base_url: Option<&str>, default_timeout_ms: u64) -> Result<Self, TransportError> {
        let base_url = base_url
            .map(|raw| {
                Url::parse(raw).map_err(|e| TransportError::InvalidRequest(format!("Invalid base URL '{}': {}", raw, e)))
            })
            .transpose()?;

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            default_timeout_ms,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        Self::new(config.base_url.as_deref(), config.timeout_ms)
    }

    fn resolve_url(&self, wire: &str) -> Result<Url, TransportError> {
        if let Ok(absolute) = Url::parse(wire) {
            return Ok(absolute);
        }
        let base = self
            .base_url
            .as_ref()
            .ok_or_else(|| TransportError::InvalidRequest(format!("relative URL '{}' without a base URL", wire)))?;

        let joined = format!(
            "{}/{}",
            base.as_str().trim_end_matches('/'),
            wire.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| TransportError::InvalidRequest(format!("Invalid URL '{}': {}", joined, e)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<ResultEnvelope, TransportError> {
        let url = self.resolve_url(&request.wire_url())?;
        let timeout_ms = request.timeout_ms.unwrap_or(self.default_timeout_ms);

        tracing::debug!(method = %request.method, url = %url, timeout_ms, "Dispatching request");

        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), url)
            .timeout(Duration::from_millis(timeout_ms));

        for (name, value) in &request.headers {
            // Content type is derived from the encoded body below.
            if name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match &request.body {
            Body::Empty => builder,
            Body::Json(Value::String(text)) => match request.effective_content_type() {
                ContentType::Other(content_type) => builder.header(CONTENT_TYPE, content_type).body(text.clone()),
                _ => builder.json(&Value::String(text.clone())),
            },
            Body::Json(value) => builder.header(CONTENT_TYPE, ContentType::JSON).json(value),
            Body::Form(encoded) => builder
                .header(CONTENT_TYPE, ContentType::FORM_URLENCODED)
                .body(encoded.clone()),
            Body::Multipart(form) => builder.multipart(to_reqwest_form(form)?),
        };

        let response = builder.send().await.map_err(|e| map_error(e, timeout_ms))?;

        let status = response.status();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect();
        let bytes = response.bytes().await.map_err(|e| map_error(e, timeout_ms))?;

        let payload = if bytes.is_empty() {
            None
        } else {
            Some(
                serde_json::from_slice(&bytes)
                    .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned())),
            )
        };

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                payload,
            });
        }

        Ok(ResultEnvelope {
            status: status.as_u16(),
            headers,
            payload,
        })
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
        Method::Patch => reqwest::Method::PATCH,
    }
}

fn to_reqwest_form(form: &MultipartForm) -> Result<Form, TransportError> {
    let mut out = Form::new();
    for part in &form.parts {
        let encoded = match &part.value {
            PartValue::Text(text) => Part::text(text.clone()),
            PartValue::File { file_name, content, mime } => {
                let mut file_part = Part::bytes(content.clone());
                if let Some(name) = file_name {
                    file_part = file_part.file_name(name.clone());
                }
                if let Some(mime) = mime {
                    file_part = file_part
                        .mime_str(mime)
                        .map_err(|e| TransportError::InvalidRequest(format!("Invalid mime '{}': {}", mime, e)))?;
                }
                file_part
            }
        };
        out = out.part(part.name.clone(), encoded);
    }
    Ok(out)
}

fn map_error(err: reqwest::Error, timeout_ms: u64) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout_ms)
    } else if err.is_connect() || err.is_request() {
        TransportError::Network(err.to_string())
    } else if err.is_builder() {
        TransportError::InvalidRequest(err.to_string())
    } else {
        TransportError::Other {
            code: None,
            message: err.to_string(),
        }
    }
}
