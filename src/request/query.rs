//! Query-string and form-urlencoded serialization.
//!
//! Nested values use bracket notation: arrays become repeated `key[]=item`
//! pairs in order, objects become `key[child]=value`. Names and values are
//! percent-encoded individually so the brackets stay readable on the wire.

use serde_json::{Map, Value};
use url::form_urlencoded;

/// Percent-encode a single name or value.
pub fn encode_component(raw: &str) -> String {
    form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

/// Render a scalar the way it appears in a query string.
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(scalar_to_string).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// Serialize a mapping as `a=1&tags[]=x&tags[]=y`.
pub fn encode_brackets(map: &Map<String, Value>) -> String {
    let mut pairs = Vec::new();
    for (key, value) in map {
        push_pairs(&encode_component(key), value, &mut pairs);
    }
    pairs.join("&")
}

fn push_pairs(name: &str, value: &Value, pairs: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            let name = format!("{}[]", name);
            for item in items {
                push_pairs(&name, item, pairs);
            }
        }
        Value::Object(children) => {
            for (key, child) in children {
                push_pairs(&format!("{}[{}]", name, encode_component(key)), child, pairs);
            }
        }
        Value::Null => pairs.push(format!("{}=", name)),
        scalar => pairs.push(format!("{}={}", name, encode_component(&scalar_to_string(scalar)))),
    }
}

/// Append flat `key=value` pairs to a URL.
///
/// A URL ending in `?` gets the pairs appended directly; otherwise a single
/// trailing `/` is replaced by `?`. URLs that already carry a query are
/// extended with `&`.
pub fn join_params_to_url(base: &str, params: &Map<String, Value>) -> String {
    if params.is_empty() {
        return base.to_string();
    }
    let pairs = params
        .iter()
        .map(|(key, value)| format!("{}={}", encode_component(key), encode_component(&scalar_to_string(value))))
        .collect::<Vec<_>>()
        .join("&");

    if base.ends_with('?') || base.ends_with('&') {
        format!("{}{}", base, pairs)
    } else if base.contains('?') {
        format!("{}&{}", base, pairs)
    } else {
        format!("{}?{}", base.strip_suffix('/').unwrap_or(base), pairs)
    }
}
