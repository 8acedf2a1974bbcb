//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Workflows, registry client and server produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, gauges, histograms via `metrics`)
//!
//! Consumers:
//!     → stdout (fmt layer, filtered by RUST_LOG or config)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields, never interpolated secrets
//! - Metrics calls are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
