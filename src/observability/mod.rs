//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape), when enabled
//! ```
//!
//! # Design Decisions
//! - Degraded shutdown is observable through logs alone; metrics are extra
//! - Request ID flows through every access log line
//! - Metrics are cheap (no-ops until a recorder is installed)

pub mod logging;
pub mod metrics;
