//! Lifecycle management for the CLI.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Apply flags → Validate → Logging → Metrics → Connect
//!
//! Shutdown:
//!     Signal received or client closed → close() → wait for final on_close → Exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: configuration errors are fatal before anything connects
//! - Shutdown waits for the final close with a deadline, then exits anyway

pub mod signals;

pub use signals::shutdown_signal;
