//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms via the metrics facade)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON optional) for machine parsing
//! - Secrets never reach log fields
//! - Metrics are cheap when no recorder is installed

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
