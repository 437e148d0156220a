//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Sessions, poller and orchestrator produce:
//!     → logging.rs (structured log events, one span per transfer run)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stderr log output
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Every event carries the network name as a field
//! - Private keys never reach a log line
//! - Metrics are cheap (atomic increments) and no-ops without a recorder

pub mod logging;
pub mod metrics;
