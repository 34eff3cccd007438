//! Deep configuration merge.
//!
//! - Scalars in the override replace the base
//! - Objects merge key by key; base-only keys survive
//! - Arrays are replaced wholesale
//! - An absent key inherits; an explicit `null`, `false` or `0` is a value
//!   and replaces the base
//!
//! Both inputs are borrowed and left untouched.

use serde_json::{Map, Value};

use crate::config::loader::ConfigError;
use crate::config::schema::ClientConfig;

/// Merge `overrides` on top of `base`, returning a new value.
pub fn deep_merge(base: &Value, overrides: &Value) -> Value {
    match (base, overrides) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in override_map {
                let next = match base_map.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        (_, replacement) => replacement.clone(),
    }
}

/// camelCase aliases accepted at the top level of a config document.
const CONFIG_ALIASES: &[(&str, &str)] = &[
    ("authenticationScheme", "auth_scheme"),
    ("timeout", "timeout_ms"),
    ("headers", "default_headers"),
    ("requestOptions", "request_options"),
];

/// camelCase aliases accepted inside `request_options`.
const REQUEST_OPTION_ALIASES: &[(&str, &str)] = &[
    ("apiUrl", "api_url"),
    ("urlPrefix", "url_prefix"),
    ("joinPrefix", "join_prefix"),
    ("isReturnNativeResponse", "return_raw_response"),
    ("isTransformResponse", "auto_unwrap"),
    ("joinParamsToUrl", "join_params_to_url"),
    ("formatDate", "format_date"),
    ("joinTime", "join_time"),
    ("ignoreCancelToken", "ignore_cancel_token"),
    ("withToken", "with_token"),
    ("errorMessageMode", "error_message_mode"),
];

fn rename_keys(map: &Map<String, Value>, aliases: &[(&str, &str)]) -> Map<String, Value> {
    let mut renamed = Map::new();
    for (key, value) in map {
        let canonical = aliases
            .iter()
            .find(|&&(alias, _)| alias == key.as_str())
            .map_or(key.as_str(), |&(_, name)| name);
        match renamed.get(canonical) {
            // The canonical spelling wins over its alias.
            Some(_) if canonical != key.as_str() => {}
            _ => {
                renamed.insert(canonical.to_string(), value.clone());
            }
        }
    }
    renamed
}

/// Rewrite alias keys of a config override document to the field names the
/// serialized config uses, so the two merge key by key.
fn canonical_overrides(overrides: &Value) -> Value {
    let Value::Object(map) = overrides else {
        return overrides.clone();
    };
    let mut renamed = rename_keys(map, CONFIG_ALIASES);
    if let Some(Value::Object(options)) = renamed.get("request_options") {
        let options = rename_keys(options, REQUEST_OPTION_ALIASES);
        renamed.insert("request_options".to_string(), Value::Object(options));
    }
    Value::Object(renamed)
}

impl ClientConfig {
    /// Build a config from these defaults plus a sparse override document.
    ///
    /// Keys may use the snake_case field names or their camelCase aliases.
    pub fn with_overrides(&self, overrides: &Value) -> Result<ClientConfig, ConfigError> {
        let base = serde_json::to_value(self).map_err(ConfigError::Merge)?;
        let merged = deep_merge(&base, &canonical_overrides(overrides));
        serde_json::from_value(merged).map_err(ConfigError::Merge)
    }
}
