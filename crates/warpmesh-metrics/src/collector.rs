//! Placement counters.
//!
//! Lock-free: every counter is an `AtomicU64`, so concurrent decisions can
//! record without contention.

use std::sync::atomic::{AtomicU64, Ordering};

use warpmesh_core::NodeId;

/// Why a peer dropped out of a decision during collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    Unreachable,
    Timeout,
    Malformed,
}

/// Point-in-time copy of all counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct DispatchCounters {
    pub submissions: u64,
    pub placed_local: u64,
    pub placed_remote: u64,
    pub retries: u64,
    pub completed: u64,
    pub placement_failures: u64,
    pub execution_failures: u64,
    pub fetch_unreachable: u64,
    pub fetch_timeout: u64,
    pub fetch_malformed: u64,
    pub local_probe_failures: u64,
}

#[derive(Debug, Default)]
pub struct DispatchMetrics {
    submissions: AtomicU64,
    placed_local: AtomicU64,
    placed_remote: AtomicU64,
    retries: AtomicU64,
    completed: AtomicU64,
    placement_failures: AtomicU64,
    execution_failures: AtomicU64,
    fetch_unreachable: AtomicU64,
    fetch_timeout: AtomicU64,
    fetch_malformed: AtomicU64,
    local_probe_failures: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submission(&self) {
        self.submissions.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a dispatch attempt to `node` (first try or retry).
    pub fn record_placement(&self, node: &NodeId) {
        let counter = if node.is_local() {
            &self.placed_local
        } else {
            &self.placed_remote
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_placement_failure(&self) {
        self.placement_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_execution_failure(&self) {
        self.execution_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self, kind: FetchFailure) {
        let counter = match kind {
            FetchFailure::Unreachable => &self.fetch_unreachable,
            FetchFailure::Timeout => &self.fetch_timeout,
            FetchFailure::Malformed => &self.fetch_malformed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_local_probe_failure(&self) {
        self.local_probe_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchCounters {
        DispatchCounters {
            submissions: self.submissions.load(Ordering::Relaxed),
            placed_local: self.placed_local.load(Ordering::Relaxed),
            placed_remote: self.placed_remote.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            placement_failures: self.placement_failures.load(Ordering::Relaxed),
            execution_failures: self.execution_failures.load(Ordering::Relaxed),
            fetch_unreachable: self.fetch_unreachable.load(Ordering::Relaxed),
            fetch_timeout: self.fetch_timeout.load(Ordering::Relaxed),
            fetch_malformed: self.fetch_malformed.load(Ordering::Relaxed),
            local_probe_failures: self.local_probe_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        assert_eq!(DispatchMetrics::new().snapshot(), DispatchCounters::default());
    }

    #[test]
    fn placements_split_by_locality() {
        let m = DispatchMetrics::new();
        m.record_placement(&NodeId::Local);
        m.record_placement(&NodeId::peer("a:1"));
        m.record_placement(&NodeId::peer("b:1"));

        let s = m.snapshot();
        assert_eq!(s.placed_local, 1);
        assert_eq!(s.placed_remote, 2);
    }

    #[test]
    fn fetch_failures_by_kind() {
        let m = DispatchMetrics::new();
        m.record_fetch_failure(FetchFailure::Timeout);
        m.record_fetch_failure(FetchFailure::Timeout);
        m.record_fetch_failure(FetchFailure::Malformed);

        let s = m.snapshot();
        assert_eq!(s.fetch_timeout, 2);
        assert_eq!(s.fetch_malformed, 1);
        assert_eq!(s.fetch_unreachable, 0);
    }

    #[test]
    fn concurrent_recording() {
        use std::sync::Arc;
        use std::thread;

        let m = Arc::new(DispatchMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = m.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        m.record_submission();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(m.snapshot().submissions, 400);
    }
}
