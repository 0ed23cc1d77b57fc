//! Process-wide orchestrator counters, exposed as a plain snapshot struct.

use std::sync::atomic::{AtomicU64, Ordering};

/// Run counters, incremented as `start()` calls complete.
#[derive(Default)]
pub struct OrchestratorStats {
    started: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    rejected_already_running: AtomicU64,
}

/// Point-in-time snapshot of [`OrchestratorStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrchestratorStatsSnapshot {
    /// Runs started (including ones that later failed).
    pub started: u64,
    /// Runs that completed successfully.
    pub completed: u64,
    /// Runs that failed.
    pub failed: u64,
    /// `Start` calls rejected because a run was already in progress.
    pub rejected_already_running: u64,
}

impl OrchestratorStats {
    /// Build a zeroed counter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a run starting.
    pub fn record_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a run completing successfully.
    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a run failing.
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a `Start` call rejected because a run was already in progress.
    pub fn record_rejected(&self) {
        self.rejected_already_running.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot current counters.
    pub fn snapshot(&self) -> OrchestratorStatsSnapshot {
        OrchestratorStatsSnapshot {
            started: self.started.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected_already_running: self.rejected_already_running.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = OrchestratorStats::new();
        stats.record_started();
        stats.record_completed();
        stats.record_rejected();
        let snap = stats.snapshot();
        assert_eq!(snap.started, 1);
        assert_eq!(snap.completed, 1);
        assert_eq!(snap.rejected_already_running, 1);
        assert_eq!(snap.failed, 0);
    }
}
