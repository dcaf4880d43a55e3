//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! client driver and transport produce:
//!     → tracing events with structured fields (attempt, delay_ms, generation)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → logging.rs subscriber (stderr, pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Auth tokens are never logged; only the caller's base URL is
//! - Stdout is reserved for stream data in the CLI, so logs go to stderr
//! - Metrics recording is a no-op until an exporter is installed

pub mod logging;
pub mod metrics;
