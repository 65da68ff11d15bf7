//! Round counters for the session

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct RoundMetrics {
    started: AtomicU64,
    rejected: AtomicU64,
    won: AtomicU64,
    lost: AtomicU64,
    failed: AtomicU64,
    notifier_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub started: u64,
    pub rejected: u64,
    pub won: u64,
    pub lost: u64,
    pub failed: u64,
    pub notifier_failures: u64,
}

impl RoundMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_started(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    /// Validation failure or busy session
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_won(&self) {
        self.won.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_lost(&self) {
        self.lost.fetch_add(1, Ordering::SeqCst);
    }

    /// Round aborted after it started (resolver or storage failure)
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_notifier_failure(&self) {
        self.notifier_failures.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            started: self.started.load(Ordering::SeqCst),
            rejected: self.rejected.load(Ordering::SeqCst),
            won: self.won.load(Ordering::SeqCst),
            lost: self.lost.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            notifier_failures: self.notifier_failures.load(Ordering::SeqCst),
        }
    }
}
