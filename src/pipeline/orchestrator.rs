//! Per-call orchestration.
//!
//! # Call lifecycle
//! ```text
//! copy descriptor
//!     → resolve CallOptions against the current defaults (one snapshot)
//!     → default headers, timeout, x-request-id
//!     → before_request hook            (error → on_request_error)
//!     → PayloadShaper
//!     → InFlightRegistry::register     (unless dedup is off)
//!     → Transport::send ⟂ cancellation ⟂ timeout
//!     → registry entry released        (token dropped, every outcome)
//!     → on_response                    (error → on_response_error)
//!     → deserialize into T
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::observability::metrics;
use crate::pipeline::error::{classify_transport_error, ClassifiedError};
use crate::pipeline::hooks::{HookContext, HookSet};
use crate::pipeline::registry::{CancellationToken, InFlightRegistry};
use crate::request::{
    Body, CallOptions, ContentType, Fingerprint, Method, PayloadShaper, RequestDescriptor, UploadFileParams,
    X_REQUEST_ID,
};
use crate::transport::{Transport, TransportError};

/// Owns a transport and the policy wrapped around it.
///
/// Clones share the transport, defaults, registry and hooks.
#[derive(Clone)]
pub struct Orchestrator {
    transport: Arc<dyn Transport>,
    config: Arc<ArcSwap<ClientConfig>>,
    hooks: HookSet,
    registry: Arc<InFlightRegistry>,
    shaper: Arc<PayloadShaper>,
}

impl Orchestrator {
    pub fn new(transport: Arc<dyn Transport>, config: ClientConfig, hooks: HookSet) -> Self {
        Self {
            transport,
            config: Arc::new(ArcSwap::from_pointee(config)),
            hooks,
            registry: Arc::new(InFlightRegistry::new()),
            shaper: Arc::new(PayloadShaper::new()),
        }
    }

    /// Current defaults snapshot.
    pub fn config(&self) -> Arc<ClientConfig> {
        self.config.load_full()
    }

    /// Replace the defaults. Calls already in flight keep their snapshot.
    pub fn configure(&self, config: ClientConfig) {
        self.config.store(Arc::new(config));
        tracing::info!("Client defaults replaced");
    }

    /// Add or replace a default header for all subsequent calls.
    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        self.config.rcu(|current| {
            let mut next = ClientConfig::clone(current);
            next.default_headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
            next.default_headers.insert(name.clone(), value.clone());
            next
        });
    }

    /// Apply every config pushed on `updates` until the sender goes away.
    pub fn watch_config(&self, mut updates: mpsc::UnboundedReceiver<ClientConfig>) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            while let Some(config) = updates.recv().await {
                this.configure(config);
            }
        })
    }

    pub fn registry(&self) -> &Arc<InFlightRegistry> {
        &self.registry
    }

    /// Abort every pending call. Returns how many were aborted.
    pub fn cancel_all(&self) -> usize {
        let cancelled = self.registry.cancel_all();
        if cancelled > 0 {
            tracing::info!(cancelled, "Aborted all pending requests");
        }
        cancelled
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
        options: &CallOptions,
    ) -> Result<T, ClassifiedError> {
        self.with_method(Method::Get, descriptor, options).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
        options: &CallOptions,
    ) -> Result<T, ClassifiedError> {
        self.with_method(Method::Post, descriptor, options).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
        options: &CallOptions,
    ) -> Result<T, ClassifiedError> {
        self.with_method(Method::Put, descriptor, options).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
        options: &CallOptions,
    ) -> Result<T, ClassifiedError> {
        self.with_method(Method::Delete, descriptor, options).await
    }

    /// Run one call. The caller's descriptor is never modified.
    pub async fn request<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
        options: &CallOptions,
    ) -> Result<T, ClassifiedError> {
        self.execute(descriptor.clone(), options).await
    }

    /// Multipart upload. Always POST, always multipart, never deduplicated.
    pub async fn upload_file<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
        params: UploadFileParams,
        options: &CallOptions,
    ) -> Result<T, ClassifiedError> {
        let mut descriptor = descriptor.clone();
        let (file, fields) = params.into_parts();
        descriptor.method = Method::Post;
        descriptor.content_type = Some(ContentType::FormData);
        descriptor.ignore_dedup = true;
        descriptor.upload = Some(file);
        descriptor.body = Body::Json(Value::Object(fields));

        let options = options.clone().ignore_cancel_token(true);
        self.execute(descriptor, &options).await
    }

    async fn with_method<T: DeserializeOwned>(
        &self,
        method: Method,
        descriptor: &RequestDescriptor,
        options: &CallOptions,
    ) -> Result<T, ClassifiedError> {
        let mut descriptor = descriptor.clone();
        descriptor.method = method;
        self.execute(descriptor, options).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        mut descriptor: RequestDescriptor,
        call_options: &CallOptions,
    ) -> Result<T, ClassifiedError> {
        let start = Instant::now();
        let config = self.config.load_full();
        let options = config.request_options.with_overrides(call_options);
        let ctx = HookContext {
            options: &options,
            config: &config,
        };

        apply_defaults(&mut descriptor, &config);
        let request_id = descriptor.header_value(X_REQUEST_ID).unwrap_or_default().to_string();
        let method = descriptor.method;
        let span = tracing::info_span!(
            "request",
            request_id = %request_id,
            method = %method,
            url = %descriptor.url,
        );

        let outcome = async {
            let descriptor = match self.hooks.run_before_request(descriptor, &ctx) {
                Ok(descriptor) => descriptor,
                Err(error) => return self.hooks.run_request_error(error, &ctx),
            };

            let shaped = self.shaper.shape(descriptor, &options, &config.date_format);
            let mut token = if shaped.ignore_dedup || options.ignore_cancel_token {
                CancellationToken::detached()
            } else {
                let fingerprint = Fingerprint::of(&shaped);
                tracing::debug!(fingerprint = %fingerprint, "Registering in-flight request");
                self.registry.register(fingerprint)
            };

            let timeout_ms = shaped.timeout_ms.unwrap_or(config.timeout_ms);
            let result = tokio::select! {
                biased;
                reason = token.cancelled() => Err(TransportError::Cancelled(reason.as_str().to_string())),
                sent = tokio::time::timeout(Duration::from_millis(timeout_ms), self.transport.send(&shaped)) => {
                    sent.unwrap_or(Err(TransportError::Timeout(timeout_ms)))
                }
            };
            drop(token);

            match result {
                Ok(envelope) => {
                    tracing::debug!(status = envelope.status, "Response received");
                    self.hooks
                        .run_response(envelope, &ctx)
                        .or_else(|error| self.hooks.run_response_error(error, &ctx))
                }
                Err(error) => self.hooks.run_response_error(classify_transport_error(error), &ctx),
            }
        }
        .instrument(span.clone())
        .await;

        let typed = outcome.and_then(|value| {
            serde_json::from_value::<T>(value)
                .map_err(|e| ClassifiedError::transform(format!("unexpected response shape: {}", e)))
        });

        let _entered = span.enter();
        match &typed {
            Ok(_) => {
                tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, "Request completed");
                metrics::record_request(method.as_str(), "success", start);
            }
            Err(error) if error.is_cancelled() => {
                tracing::debug!(reason = %error.message, "Request cancelled");
                metrics::record_request(method.as_str(), error.kind.as_str(), start);
            }
            Err(error) => {
                tracing::warn!(kind = %error.kind, message = %error.message, "Request failed");
                metrics::record_request(method.as_str(), error.kind.as_str(), start);
            }
        }
        typed
    }
}

/// Fill in default headers the caller did not set, and a request id.
fn apply_defaults(descriptor: &mut RequestDescriptor, config: &ClientConfig) {
    for (name, value) in &config.default_headers {
        if descriptor.header_value(name).is_none() {
            descriptor.headers.insert(name.clone(), value.clone());
        }
    }
    if descriptor.header_value(X_REQUEST_ID).is_none() {
        descriptor
            .headers
            .insert(X_REQUEST_ID.to_string(), Uuid::new_v4().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::error::ErrorKind;
    use crate::transport::ResultEnvelope;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Answers every request with `{code: 0, result: <wire url>}` and keeps
    /// what it was sent.
    #[derive(Default)]
    struct EchoTransport {
        seen: Mutex<Vec<RequestDescriptor>>,
    }

    #[async_trait]
    impl Transport for EchoTransport {
        async fn send(&self, request: &RequestDescriptor) -> Result<ResultEnvelope, TransportError> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(ResultEnvelope::new(200, Some(json!({"code": 0, "result": request.wire_url()}))))
        }
    }

    fn orchestrator(transport: Arc<EchoTransport>) -> Orchestrator {
        let hooks = HookSet::all(Arc::new(crate::pipeline::StandardHooks::new()));
        Orchestrator::new(transport, ClientConfig::default(), hooks)
    }

    #[tokio::test]
    async fn test_caller_descriptor_untouched() {
        let transport = Arc::new(EchoTransport::default());
        let client = orchestrator(transport.clone());
        let descriptor = RequestDescriptor::get("/users").param("id", 1);
        let before = descriptor.clone();

        let url: String = client
            .post(&descriptor, &CallOptions::new().url_prefix("/api"))
            .await
            .unwrap();
        assert_eq!(url, "/api/users");
        assert_eq!(descriptor, before);

        let sent = transport.seen.lock().unwrap()[0].clone();
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.body, Body::Json(json!({"id": 1})));
        assert!(sent.header_value(X_REQUEST_ID).is_some());
        assert_eq!(sent.header_value("content-type"), Some(ContentType::JSON));
    }

    #[tokio::test]
    async fn test_set_header_applies_to_later_calls() {
        let transport = Arc::new(EchoTransport::default());
        let client = orchestrator(transport.clone());
        client.set_header("X-Tenant", "acme");

        let _: String = client
            .get(&RequestDescriptor::get("/a"), &CallOptions::new())
            .await
            .unwrap();
        let sent = transport.seen.lock().unwrap()[0].clone();
        assert_eq!(sent.header_value("x-tenant"), Some("acme"));
        assert_eq!(client.config().default_headers.len(), 2);
    }

    #[tokio::test]
    async fn test_unrenderable_date_format_sends_text_unchanged() {
        let transport = Arc::new(EchoTransport::default());
        let client = orchestrator(transport.clone());
        let mut config = ClientConfig::default();
        config.date_format = "%Q".into();
        client.configure(config);

        let descriptor = RequestDescriptor::post("/events").json(json!({"at": "2024-05-01T10:00:00Z"}));
        let handle = tokio::spawn({
            let client = client.clone();
            async move { client.post::<String>(&descriptor, &CallOptions::new()).await }
        });
        assert!(handle.await.unwrap().is_ok());

        let sent = transport.seen.lock().unwrap()[0].clone();
        assert_eq!(sent.body, Body::Json(json!({"at": "2024-05-01T10:00:00Z"})));
    }

    #[tokio::test]
    async fn test_type_mismatch_is_transform_error() {
        let client = orchestrator(Arc::new(EchoTransport::default()));
        let err = client
            .get::<u64>(&RequestDescriptor::get("/a"), &CallOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::TransformError);
    }

    #[tokio::test]
    async fn test_configure_swaps_defaults() {
        let transport = Arc::new(EchoTransport::default());
        let client = orchestrator(transport.clone());
        let config = ClientConfig::default()
            .with_overrides(&json!({"request_options": {"url_prefix": "/v2", "join_time": false}}))
            .unwrap();
        client.configure(config);

        let url: String = client
            .get(&RequestDescriptor::get("/items"), &CallOptions::new())
            .await
            .unwrap();
        assert_eq!(url, "/v2/items");
    }
}
