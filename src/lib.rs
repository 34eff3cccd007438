//! HTTP request orchestration.
//!
//! Sits between call sites and an HTTP transport: shapes outgoing requests,
//! deduplicates identical in-flight calls, unwraps business envelopes and
//! classifies failures.

pub mod auth;
pub mod config;
pub mod notify;
pub mod observability;
pub mod pipeline;
pub mod request;
pub mod transport;

pub use config::ClientConfig;
pub use pipeline::{ClassifiedError, ErrorKind, HookSet, Orchestrator, StandardHooks};
pub use request::{CallOptions, RequestDescriptor};
pub use transport::{HttpTransport, Transport};
