//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Read request to a node:
//!     → timeouts.rs (enforce per-request deadline)
//!     → On transient failure: retries.rs (retry with backoff.rs delays)
//!     → On exhaustion: ChainClient fails over to the next node
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every node call has a deadline
//! - Retries only for reads; submissions are not idempotent

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{retry, RetryPolicy};
pub use timeouts::with_timeout;
