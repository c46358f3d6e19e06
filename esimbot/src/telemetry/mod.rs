//! Download telemetry.
//!
//! Lock-free counters updated by the orchestrator and its hooks, read through
//! point-in-time snapshots.
//!
//! ```text
//! Orchestrator / hooks ─────► DownloadMetrics ─────► TelemetrySnapshot ─────► CLI, logs
//!                             (atomic counters)     (serialisable copy)
//! ```

mod metrics;
mod snapshot;

pub use metrics::DownloadMetrics;
pub use snapshot::TelemetrySnapshot;
