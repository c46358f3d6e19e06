//! Point-in-time telemetry copy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Copy of [`DownloadMetrics`](super::DownloadMetrics) at one instant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub uptime_secs: u64,
    pub attempts_started: u64,
    pub installed: u64,
    pub declined: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub transport_failures: u64,
    pub confirmation_code_prompts: u64,
    pub confirm_download_prompts: u64,
    pub progress_edits: u64,
}

impl TelemetrySnapshot {
    /// Attempts that reached a terminal outcome.
    pub fn finished(&self) -> u64 {
        self.installed + self.declined + self.failed + self.timed_out + self.transport_failures
    }

    /// Attempts started but not yet finished.
    pub fn in_flight(&self) -> u64 {
        self.attempts_started.saturating_sub(self.finished())
    }
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempts: {} (installed {}, declined {}, failed {}, timed out {}, transport {})",
            self.attempts_started,
            self.installed,
            self.declined,
            self.failed,
            self.timed_out,
            self.transport_failures
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_serializes() {
        let snapshot = TelemetrySnapshot {
            attempts_started: 3,
            installed: 1,
            declined: 1,
            ..Default::default()
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"attempts_started\":3"));
        let back: TelemetrySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
        assert_eq!(back.in_flight(), 1);
    }

    #[test]
    fn test_display() {
        let snapshot = TelemetrySnapshot {
            attempts_started: 2,
            installed: 2,
            ..Default::default()
        };
        assert_eq!(
            snapshot.to_string(),
            "attempts: 2 (installed 2, declined 0, failed 0, timed out 0, transport 0)"
        );
    }
}
