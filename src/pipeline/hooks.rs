//! The four-stage hook chain around dispatch.
//!
//! ```text
//! before_request ──ok──▶ shape ▶ register ▶ send ──ok──▶ on_response ──ok──▶ value
//!       │                                     │               │
//!      err                                   err             err
//!       ▼                                     ▼               ▼
//! on_request_error                        on_response_error ◀─┘
//! ```
//!
//! Every stage is optional. A missing stage passes its input through:
//! `before_request` returns the descriptor unchanged, `on_response` yields
//! the envelope as a JSON value, and the error stages rethrow.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::config::ClientConfig;
use crate::pipeline::error::ClassifiedError;
use crate::request::{RequestDescriptor, RequestOptions};
use crate::transport::ResultEnvelope;

/// What every hook sees besides its input: the resolved per-call options
/// and the config snapshot the call started with.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    pub options: &'a RequestOptions,
    pub config: &'a ClientConfig,
}

pub trait BeforeRequestHook: Send + Sync {
    fn before_request(
        &self,
        descriptor: RequestDescriptor,
        ctx: &HookContext<'_>,
    ) -> Result<RequestDescriptor, ClassifiedError>;
}

/// Runs only when `before_request` failed. `Ok` recovers with a value the
/// call resolves to without dispatching.
pub trait RequestErrorHook: Send + Sync {
    fn on_request_error(&self, error: ClassifiedError, ctx: &HookContext<'_>) -> Result<Value, ClassifiedError>;
}

pub trait ResponseHook: Send + Sync {
    fn on_response(&self, envelope: ResultEnvelope, ctx: &HookContext<'_>) -> Result<Value, ClassifiedError>;
}

/// Runs for transport failures and `on_response` failures. `Ok` substitutes
/// a recovery value.
pub trait ResponseErrorHook: Send + Sync {
    fn on_response_error(&self, error: ClassifiedError, ctx: &HookContext<'_>) -> Result<Value, ClassifiedError>;
}

/// The configured stages. Cheap to clone.
#[derive(Clone, Default)]
pub struct HookSet {
    before_request: Option<Arc<dyn BeforeRequestHook>>,
    on_request_error: Option<Arc<dyn RequestErrorHook>>,
    on_response: Option<Arc<dyn ResponseHook>>,
    on_response_error: Option<Arc<dyn ResponseErrorHook>>,
}

impl HookSet {
    /// No stages: requests go out as shaped, envelopes come back as values.
    pub fn empty() -> Self {
        Self::default()
    }

    /// All four stages served by one object.
    pub fn all<H>(hooks: Arc<H>) -> Self
    where
        H: BeforeRequestHook + RequestErrorHook + ResponseHook + ResponseErrorHook + 'static,
    {
        Self {
            before_request: Some(hooks.clone()),
            on_request_error: Some(hooks.clone()),
            on_response: Some(hooks.clone()),
            on_response_error: Some(hooks),
        }
    }

    pub fn before_request(mut self, hook: Arc<dyn BeforeRequestHook>) -> Self {
        self.before_request = Some(hook);
        self
    }

    pub fn on_request_error(mut self, hook: Arc<dyn RequestErrorHook>) -> Self {
        self.on_request_error = Some(hook);
        self
    }

    pub fn on_response(mut self, hook: Arc<dyn ResponseHook>) -> Self {
        self.on_response = Some(hook);
        self
    }

    pub fn on_response_error(mut self, hook: Arc<dyn ResponseErrorHook>) -> Self {
        self.on_response_error = Some(hook);
        self
    }

    pub(crate) fn run_before_request(
        &self,
        descriptor: RequestDescriptor,
        ctx: &HookContext<'_>,
    ) -> Result<RequestDescriptor, ClassifiedError> {
        match &self.before_request {
            Some(hook) => hook.before_request(descriptor, ctx),
            None => Ok(descriptor),
        }
    }

    pub(crate) fn run_request_error(&self, error: ClassifiedError, ctx: &HookContext<'_>) -> Result<Value, ClassifiedError> {
        match &self.on_request_error {
            Some(hook) => hook.on_request_error(error, ctx),
            None => Err(error),
        }
    }

    pub(crate) fn run_response(&self, envelope: ResultEnvelope, ctx: &HookContext<'_>) -> Result<Value, ClassifiedError> {
        match &self.on_response {
            Some(hook) => hook.on_response(envelope, ctx),
            None => Ok(envelope.into_value()),
        }
    }

    pub(crate) fn run_response_error(&self, error: ClassifiedError, ctx: &HookContext<'_>) -> Result<Value, ClassifiedError> {
        match &self.on_response_error {
            Some(hook) => hook.on_response_error(error, ctx),
            None => Err(error),
        }
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSet")
            .field("before_request", &self.before_request.is_some())
            .field("on_request_error", &self.on_request_error.is_some())
            .field("on_response", &self.on_response.is_some())
            .field("on_response_error", &self.on_response_error.is_some())
            .finish()
    }
}
