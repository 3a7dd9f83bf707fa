//! Metrics counters and tracing setup

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "vidfetch=info,tower_http=info";

/// Install the global tracing subscriber
///
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Task lifecycle counters
#[derive(Debug, Default)]
pub struct Metrics {
    tasks_submitted: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
    tasks_cancelled: AtomicU64,
    tasks_swept: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task_submitted(&self) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "tasks_submitted", "Metric incremented");
    }

    pub fn task_completed(&self) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "tasks_completed", "Metric incremented");
    }

    pub fn task_failed(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "tasks_failed", "Metric incremented");
    }

    pub fn task_cancelled(&self) {
        self.tasks_cancelled.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "tasks_cancelled", "Metric incremented");
    }

    pub fn tasks_swept(&self, count: usize) {
        self.tasks_swept.fetch_add(count as u64, Ordering::Relaxed);
        tracing::debug!(counter = "tasks_swept", count, "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            tasks_cancelled: self.tasks_cancelled.load(Ordering::Relaxed),
            tasks_swept: self.tasks_swept.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub tasks_submitted: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub tasks_cancelled: u64,
    pub tasks_swept: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = Metrics::new();
        metrics.task_submitted();
        metrics.task_submitted();
        metrics.task_failed();
        metrics.tasks_swept(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tasks_submitted, 2);
        assert_eq!(snapshot.tasks_failed, 1);
        assert_eq!(snapshot.tasks_completed, 0);
        assert_eq!(snapshot.tasks_swept, 3);
    }
}
