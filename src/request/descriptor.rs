//! Normalized request descriptor handed between pipeline stages.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::request::multipart::{FileField, MultipartForm};
use crate::request::query;

/// Query parameter carrying the cache-busting timestamp.
pub const TIMESTAMP_PARAM: &str = "_t";

/// Correlation header attached to every dispatched request.
pub const X_REQUEST_ID: &str = "x-request-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared request content type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ContentType {
    #[default]
    Json,
    FormUrlEncoded,
    FormData,
    Other(String),
}

impl ContentType {
    pub const JSON: &'static str = "application/json;charset=UTF-8";
    pub const FORM_URLENCODED: &'static str = "application/x-www-form-urlencoded;charset=UTF-8";
    pub const FORM_DATA: &'static str = "multipart/form-data;charset=UTF-8";

    /// Parse a `Content-Type` header value, ignoring parameters and case.
    pub fn from_header(value: &str) -> ContentType {
        let essence = value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        match essence.as_str() {
            "application/json" => ContentType::Json,
            "application/x-www-form-urlencoded" => ContentType::FormUrlEncoded,
            "multipart/form-data" => ContentType::FormData,
            _ => ContentType::Other(value.to_string()),
        }
    }

    pub fn as_header(&self) -> &str {
        match self {
            ContentType::Json => Self::JSON,
            ContentType::FormUrlEncoded => Self::FORM_URLENCODED,
            ContentType::FormData => Self::FORM_DATA,
            ContentType::Other(value) => value,
        }
    }
}

/// Query parameters as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    /// Ordered key/value parameters.
    Map(Map<String, Value>),
    /// Pre-formatted suffix appended verbatim to the URL (path-style REST).
    Literal(String),
}

impl Default for Params {
    fn default() -> Self {
        Params::Map(Map::new())
    }
}

impl Params {
    pub fn is_empty(&self) -> bool {
        match self {
            Params::Map(map) => map.is_empty(),
            Params::Literal(suffix) => suffix.is_empty(),
        }
    }

    pub fn as_map(&self) -> Option<&Map<String, Value>> {
        match self {
            Params::Map(map) => Some(map),
            Params::Literal(_) => None,
        }
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Params::Map(map)
    }
}

impl From<&str> for Params {
    fn from(suffix: &str) -> Self {
        Params::Literal(suffix.to_string())
    }
}

/// Request body at the various stages of shaping.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    #[default]
    Empty,
    /// Structured body; sent as JSON unless the shaper re-encodes it.
    Json(Value),
    /// `application/x-www-form-urlencoded` text.
    Form(String),
    Multipart(MultipartForm),
}

impl Body {
    /// Whether the body carries any data worth sending.
    pub fn is_present(&self) -> bool {
        match self {
            Body::Empty => false,
            Body::Json(Value::Null) => false,
            Body::Json(Value::Object(map)) => !map.is_empty(),
            Body::Json(Value::Array(items)) => !items.is_empty(),
            Body::Json(Value::String(text)) => !text.is_empty(),
            Body::Json(_) => true,
            Body::Form(text) => !text.is_empty(),
            Body::Multipart(form) => !form.is_empty(),
        }
    }
}

/// A single outgoing call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub params: Params,
    pub body: Body,
    pub headers: BTreeMap<String, String>,
    pub timeout_ms: Option<u64>,
    /// Explicit content type; falls back to the `Content-Type` header.
    pub content_type: Option<ContentType>,
    pub ignore_dedup: bool,
    /// File attached by the upload entry point.
    pub upload: Option<FileField>,
    /// Cache-busting timestamp appended on the wire only.
    pub cache_bust: Option<u64>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn params(mut self, params: impl Into<Params>) -> Self {
        self.params = params.into();
        self
    }

    /// Add a single query parameter, converting literal params into a map.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        match &mut self.params {
            Params::Map(map) => {
                map.insert(key.into(), value.into());
            }
            Params::Literal(_) => {
                let mut map = Map::new();
                map.insert(key.into(), value.into());
                self.params = Params::Map(map);
            }
        }
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Body::Json(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn ignore_dedup(mut self, ignore: bool) -> Self {
        self.ignore_dedup = ignore;
        self
    }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The content type the shaper negotiates against.
    pub fn effective_content_type(&self) -> ContentType {
        if let Some(content_type) = &self.content_type {
            return content_type.clone();
        }
        self.header_value("content-type")
            .map(ContentType::from_header)
            .unwrap_or_default()
    }

    /// Full URL as sent on the wire, including query and cache buster.
    pub fn wire_url(&self) -> String {
        let mut pairs = match &self.params {
            Params::Map(map) => query::encode_brackets(map),
            Params::Literal(_) => String::new(),
        };
        if let Some(ts) = self.cache_bust {
            if !pairs.is_empty() {
                pairs.push('&');
            }
            pairs.push_str(&format!("{}={}", TIMESTAMP_PARAM, ts));
        }

        if pairs.is_empty() {
            return self.url.clone();
        }
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.url, separator, pairs)
    }
}
