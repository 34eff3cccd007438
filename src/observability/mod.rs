//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline stages produce:
//!     → logging.rs (structured log events, request id on every span)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
