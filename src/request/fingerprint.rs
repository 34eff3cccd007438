//! Stable identity for pending requests.
//!
//! `method & url & query & body`, with maps serialized in sorted key order so
//! that insertion order never distinguishes two otherwise equal calls. The
//! cache-busting timestamp lives outside `params` and is never part of the key.

use std::fmt;

use serde_json::Value;
use url::Url;

use crate::request::descriptor::{Body, Params, RequestDescriptor};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(descriptor: &RequestDescriptor) -> Self {
        let query = match &descriptor.params {
            Params::Map(map) => canonical_json(&Value::Object(map.clone())),
            Params::Literal(suffix) => suffix.clone(),
        };
        let body = match &descriptor.body {
            Body::Empty => String::new(),
            Body::Json(value) => canonical_json(value),
            Body::Form(encoded) => encoded.clone(),
            Body::Multipart(form) => form.field_names().join(","),
        };

        Fingerprint(format!(
            "{}&{}&{}&{}",
            descriptor.method,
            canonical_url(&descriptor.url),
            query,
            body
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn canonical_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(url) => url.to_string(),
        // Relative URLs are compared verbatim.
        Err(_) => trimmed.to_string(),
    }
}

/// JSON text with object keys sorted at every level.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
