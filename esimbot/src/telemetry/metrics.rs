//! Atomic download counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::snapshot::TelemetrySnapshot;

/// Counters for download attempts and their interactive pauses.
#[derive(Debug)]
pub struct DownloadMetrics {
    started_at: Instant,
    attempts_started: AtomicU64,
    installed: AtomicU64,
    declined: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    transport_failures: AtomicU64,
    confirmation_code_prompts: AtomicU64,
    confirm_download_prompts: AtomicU64,
    progress_edits: AtomicU64,
}

impl Default for DownloadMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            attempts_started: AtomicU64::new(0),
            installed: AtomicU64::new(0),
            declined: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            timed_out: AtomicU64::new(0),
            transport_failures: AtomicU64::new(0),
            confirmation_code_prompts: AtomicU64::new(0),
            confirm_download_prompts: AtomicU64::new(0),
            progress_edits: AtomicU64::new(0),
        }
    }

    pub fn attempt_started(&self) {
        self.attempts_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn installed(&self) {
        self.installed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn declined(&self) {
        self.declined.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn timed_out(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn transport_failure(&self) {
        self.transport_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn confirmation_code_prompt(&self) {
        self.confirmation_code_prompts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn confirm_download_prompt(&self) {
        self.confirm_download_prompts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn progress_edit(&self) {
        self.progress_edits.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            uptime_secs: self.started_at.elapsed().as_secs(),
            attempts_started: self.attempts_started.load(Ordering::Relaxed),
            installed: self.installed.load(Ordering::Relaxed),
            declined: self.declined.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            confirmation_code_prompts: self.confirmation_code_prompts.load(Ordering::Relaxed),
            confirm_download_prompts: self.confirm_download_prompts.load(Ordering::Relaxed),
            progress_edits: self.progress_edits.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = DownloadMetrics::new();
        metrics.attempt_started();
        metrics.attempt_started();
        metrics.installed();
        metrics.timed_out();
        metrics.progress_edit();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.attempts_started, 2);
        assert_eq!(snapshot.installed, 1);
        assert_eq!(snapshot.timed_out, 1);
        assert_eq!(snapshot.progress_edits, 1);
        assert_eq!(snapshot.finished(), 2);
        assert_eq!(snapshot.in_flight(), 0);
    }
}
