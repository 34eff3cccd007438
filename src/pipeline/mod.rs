//! Request pipeline.
//!
//! # Data Flow
//! ```text
//! caller
//!     → orchestrator.rs (snapshot config, resolve options)
//!     → hooks.rs (before_request, e.g. standard.rs: prefix, auth)
//!     → PayloadShaper
//!     → registry.rs (register fingerprint, supersede duplicates)
//!     → Transport
//!     → registry.rs (release)
//!     → hooks.rs (on_response → unwrap.rs, or on_response_error)
//!     → error.rs (classification of every failure)
//!     → caller receives T or ClassifiedError
//! ```
//!
//! # Design Decisions
//! - Registry bookkeeping and hooks are synchronous; the only suspension
//!   point is the transport call
//! - Release is tied to the cancellation token's `Drop`, so it happens
//!   exactly once even if the caller drops the future

pub mod error;
pub mod hooks;
pub mod orchestrator;
pub mod registry;
pub mod standard;
pub mod unwrap;

pub use error::{classify_transport_error, ClassifiedError, ErrorKind};
pub use hooks::{BeforeRequestHook, HookContext, HookSet, RequestErrorHook, ResponseErrorHook, ResponseHook};
pub use orchestrator::Orchestrator;
pub use registry::{CancelReason, CancellationToken, InFlightRegistry};
pub use standard::StandardHooks;
pub use unwrap::ResultUnwrapper;
