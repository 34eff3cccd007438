//! The standard hook set.
//!
//! - `before_request`: reject empty URLs, join `url_prefix` then `api_url`,
//!   attach `Authorization`
//! - `on_request_error`: log and rethrow
//! - `on_response`: run the `ResultUnwrapper`
//! - `on_response_error`: notify per `error_message_mode`, then rethrow
//!
//! Cancelled calls are never shown to the user.

use std::sync::Arc;

use serde_json::Value;

use crate::auth::CredentialProvider;
use crate::notify::{Notifier, TracingNotifier};
use crate::pipeline::error::ClassifiedError;
use crate::pipeline::hooks::{BeforeRequestHook, HookContext, RequestErrorHook, ResponseErrorHook, ResponseHook};
use crate::pipeline::unwrap::ResultUnwrapper;
use crate::request::{ErrorMessageMode, RequestDescriptor};
use crate::transport::ResultEnvelope;

pub const AUTHORIZATION: &str = "Authorization";

pub struct StandardHooks {
    credentials: Option<Arc<dyn CredentialProvider>>,
    notifier: Arc<dyn Notifier>,
}

impl StandardHooks {
    pub fn new() -> Self {
        Self {
            credentials: None,
            notifier: Arc::new(TracingNotifier),
        }
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    fn authorization(&self, scheme: &str) -> Option<String> {
        let token = self.credentials.as_ref()?.current_token()?;
        if scheme.is_empty() {
            Some(token)
        } else {
            Some(format!("{} {}", scheme, token))
        }
    }
}

impl Default for StandardHooks {
    fn default() -> Self {
        Self::new()
    }
}

impl BeforeRequestHook for StandardHooks {
    fn before_request(
        &self,
        mut descriptor: RequestDescriptor,
        ctx: &HookContext<'_>,
    ) -> Result<RequestDescriptor, ClassifiedError> {
        if descriptor.url.trim().is_empty() {
            return Err(ClassifiedError::transform("request url is empty"));
        }

        let options = ctx.options;
        if options.join_prefix {
            if let Some(prefix) = options.url_prefix.as_deref() {
                descriptor.url = format!("{}{}", prefix, descriptor.url);
            }
        }
        if let Some(api_url) = options.api_url.as_deref() {
            descriptor.url = format!("{}{}", api_url, descriptor.url);
        }

        if options.with_token {
            if let Some(value) = self.authorization(&ctx.config.auth_scheme) {
                descriptor.headers.retain(|name, _| !name.eq_ignore_ascii_case(AUTHORIZATION));
                descriptor.headers.insert(AUTHORIZATION.to_string(), value);
            }
        }

        Ok(descriptor)
    }
}

impl RequestErrorHook for StandardHooks {
    fn on_request_error(&self, error: ClassifiedError, _ctx: &HookContext<'_>) -> Result<Value, ClassifiedError> {
        tracing::warn!(kind = %error.kind, message = %error.message, "Request rejected before dispatch");
        Err(error)
    }
}

impl ResponseHook for StandardHooks {
    fn on_response(&self, envelope: ResultEnvelope, ctx: &HookContext<'_>) -> Result<Value, ClassifiedError> {
        ResultUnwrapper::new(ctx.config.business_codes).unwrap(envelope, ctx.options)
    }
}

impl ResponseErrorHook for StandardHooks {
    fn on_response_error(&self, error: ClassifiedError, ctx: &HookContext<'_>) -> Result<Value, ClassifiedError> {
        let mode = ctx.options.error_message_mode;
        if !error.is_cancelled() && mode != ErrorMessageMode::None {
            self.notifier.notify(&error.message, mode);
        }
        Err(error)
    }
}
