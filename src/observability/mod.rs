//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every pipeline step produces:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms, step timers)
//!     → tracing.rs (trace/request ids carried in the request context)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//!     → Second service (traceparent + x-request-id headers)
//! ```

pub mod logging;
pub mod metrics;
pub mod tracing;
