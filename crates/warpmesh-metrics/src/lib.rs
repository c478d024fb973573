//! warpmesh-metrics — observability for placement decisions.
//!
//! # Architecture
//!
//! ```text
//! DispatchMetrics
//!   ├── record_*() ← called by the dispatcher per decision
//!   └── snapshot() → DispatchCounters
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for /metrics endpoint
//! ```

pub mod collector;
pub mod prometheus;

pub use collector::{DispatchCounters, DispatchMetrics, FetchFailure};
pub use prometheus::render_prometheus;
