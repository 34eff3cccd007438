//! Per-call policy options.
//!
//! `RequestOptions` is the fully-resolved policy a call runs with. The
//! process-wide defaults live in `ClientConfig::request_options`; callers
//! pass a sparse `CallOptions` whose set fields win over the defaults.

use serde::{Deserialize, Serialize};

/// How classified errors are surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMessageMode {
    /// Never notify; the caller handles the error itself.
    None,
    /// Lightweight message (toast-style).
    #[default]
    #[serde(alias = "message")]
    Inline,
    /// Blocking dialog for important failures.
    Modal,
}

/// Resolved request policy.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestOptions {
    /// Absolute API root prepended after the prefix join.
    #[serde(alias = "apiUrl")]
    pub api_url: Option<String>,

    /// Path prefix joined in front of the call URL when `join_prefix` is set.
    #[serde(alias = "urlPrefix")]
    pub url_prefix: Option<String>,

    #[serde(alias = "joinPrefix")]
    pub join_prefix: bool,

    /// Hand back the full response envelope (status, headers, payload).
    #[serde(alias = "isReturnNativeResponse")]
    pub return_raw_response: bool,

    /// Unwrap the business envelope into its `result` field.
    #[serde(alias = "isTransformResponse")]
    pub auto_unwrap: bool,

    /// Also serialize params/body into the URL for non-GET calls.
    #[serde(alias = "joinParamsToUrl")]
    pub join_params_to_url: bool,

    #[serde(alias = "formatDate")]
    pub format_date: bool,

    /// Append a cache-busting timestamp to GET requests.
    #[serde(alias = "joinTime")]
    pub join_time: bool,

    /// Opt out of in-flight deduplication.
    #[serde(alias = "ignoreCancelToken")]
    pub ignore_cancel_token: bool,

    /// Attach the `Authorization` header when a token is available.
    #[serde(alias = "withToken")]
    pub with_token: bool,

    #[serde(alias = "errorMessageMode")]
    pub error_message_mode: ErrorMessageMode,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            api_url: None,
            url_prefix: None,
            join_prefix: true,
            return_raw_response: false,
            auto_unwrap: true,
            join_params_to_url: false,
            format_date: true,
            join_time: true,
            ignore_cancel_token: false,
            with_token: true,
            error_message_mode: ErrorMessageMode::Inline,
        }
    }
}

impl RequestOptions {
    /// Resolve per-call overrides against these defaults.
    ///
    /// Only fields the caller actually set are applied, so an explicit
    /// `false` overrides a `true` default.
    pub fn with_overrides(&self, overrides: &CallOptions) -> RequestOptions {
        RequestOptions {
            api_url: overrides.api_url.clone().or_else(|| self.api_url.clone()),
            url_prefix: overrides.url_prefix.clone().or_else(|| self.url_prefix.clone()),
            join_prefix: overrides.join_prefix.unwrap_or(self.join_prefix),
            return_raw_response: overrides.return_raw_response.unwrap_or(self.return_raw_response),
            auto_unwrap: overrides.auto_unwrap.unwrap_or(self.auto_unwrap),
            join_params_to_url: overrides.join_params_to_url.unwrap_or(self.join_params_to_url),
            format_date: overrides.format_date.unwrap_or(self.format_date),
            join_time: overrides.join_time.unwrap_or(self.join_time),
            ignore_cancel_token: overrides.ignore_cancel_token.unwrap_or(self.ignore_cancel_token),
            with_token: overrides.with_token.unwrap_or(self.with_token),
            error_message_mode: overrides.error_message_mode.unwrap_or(self.error_message_mode),
        }
    }
}

/// Sparse per-call overrides. `None` means "inherit".
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CallOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_prefix: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_raw_response: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_unwrap: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_params_to_url: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_date: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_time: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_cancel_token: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub with_token: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message_mode: Option<ErrorMessageMode>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer `later` on top of `self`; fields set in `later` win.
    pub fn merge(&self, later: &CallOptions) -> CallOptions {
        CallOptions {
            api_url: later.api_url.clone().or_else(|| self.api_url.clone()),
            url_prefix: later.url_prefix.clone().or_else(|| self.url_prefix.clone()),
            join_prefix: later.join_prefix.or(self.join_prefix),
            return_raw_response: later.return_raw_response.or(self.return_raw_response),
            auto_unwrap: later.auto_unwrap.or(self.auto_unwrap),
            join_params_to_url: later.join_params_to_url.or(self.join_params_to_url),
            format_date: later.format_date.or(self.format_date),
            join_time: later.join_time.or(self.join_time),
            ignore_cancel_token: later.ignore_cancel_token.or(self.ignore_cancel_token),
            with_token: later.with_token.or(self.with_token),
            error_message_mode: later.error_message_mode.or(self.error_message_mode),
        }
    }

    pub fn api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    pub fn url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = Some(prefix.into());
        self
    }

    pub fn join_prefix(mut self, join: bool) -> Self {
        self.join_prefix = Some(join);
        self
    }

    pub fn join_params_to_url(mut self, join: bool) -> Self {
        self.join_params_to_url = Some(join);
        self
    }

    pub fn format_date(mut self, format: bool) -> Self {
        self.format_date = Some(format);
        self
    }

    pub fn join_time(mut self, join: bool) -> Self {
        self.join_time = Some(join);
        self
    }

    pub fn return_raw_response(mut self, raw: bool) -> Self {
        self.return_raw_response = Some(raw);
        self
    }

    pub fn auto_unwrap(mut self, unwrap: bool) -> Self {
        self.auto_unwrap = Some(unwrap);
        self
    }

    pub fn ignore_cancel_token(mut self, ignore: bool) -> Self {
        self.ignore_cancel_token = Some(ignore);
        self
    }

    pub fn with_token(mut self, with_token: bool) -> Self {
        self.with_token = Some(with_token);
        self
    }

    pub fn error_message_mode(mut self, mode: ErrorMessageMode) -> Self {
        self.error_message_mode = Some(mode);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_overrides_are_identity() {
        let defaults = RequestOptions::default();
        assert_eq!(defaults.with_overrides(&CallOptions::default()), defaults);

        let base = CallOptions::new().join_time(false).url_prefix("/api");
        assert_eq!(base.merge(&CallOptions::default()), base);
    }

    #[test]
    fn test_explicit_false_wins() {
        let defaults = RequestOptions::default();
        assert!(defaults.join_prefix);

        let resolved = defaults.with_overrides(&CallOptions::new().join_prefix(false).with_token(false));
        assert!(!resolved.join_prefix);
        assert!(!resolved.with_token);
        // Untouched fields inherit.
        assert!(resolved.auto_unwrap);
        assert_eq!(resolved.error_message_mode, ErrorMessageMode::Inline);
    }

    #[test]
    fn test_later_override_wins() {
        let first = CallOptions::new().url_prefix("/v1").auto_unwrap(false);
        let second = CallOptions::new().url_prefix("/v2");
        let merged = first.merge(&second);
        assert_eq!(merged.url_prefix.as_deref(), Some("/v2"));
        assert_eq!(merged.auto_unwrap, Some(false));
    }

    #[test]
    fn test_camel_case_aliases() {
        let opts: RequestOptions = serde_json::from_value(serde_json::json!({
            "isTransformResponse": false,
            "errorMessageMode": "message",
            "joinTime": false,
        }))
        .unwrap();
        assert!(!opts.auto_unwrap);
        assert!(!opts.join_time);
        assert_eq!(opts.error_message_mode, ErrorMessageMode::Inline);
        assert!(opts.join_prefix);
    }
}
