//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Transport closes or fails to open:
//!     → client driver increments the attempt counter
//!     → backoff.rs computes the delay (exponential, jittered, capped)
//!     → driver arms a single reconnect deadline
//! ```
//!
//! # Design Decisions
//! - Every failure is treated as transient; only `close()` or an attempt cap stops retrying
//! - Jittered backoff prevents synchronized reconnect storms across clients
//! - Delay is always bounded by the configured ceiling

pub mod backoff;

pub use backoff::Backoff;
