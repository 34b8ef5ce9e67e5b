//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline and middleware produce:
//!     → tracing events (structured fields: status, error, encoding, ...)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → logging.rs subscriber (stdout, pretty or JSON)
//!     → whatever `metrics` recorder the host installs
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - The crate never installs a metrics recorder; without one, recording is a no-op
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LoggingError};
