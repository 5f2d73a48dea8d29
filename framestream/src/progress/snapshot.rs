//! Shared progress counter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// Rows written so far, plus when streaming started.
///
/// The record writer is the only component that updates the counters; the
/// progress reporter only reads them. `completed` advances once per row
/// handed to the report; `durable` advances only after a successful flush,
/// so it never counts rows still sitting in a buffer.
#[derive(Debug)]
pub struct ProgressSnapshot {
    completed: AtomicU64,
    durable: AtomicU64,
    started_at: Instant,
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSnapshot {
    /// Start tracking progress now.
    pub fn new() -> Self {
        Self {
            completed: AtomicU64::new(0),
            durable: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Record one written row. Returns the new count.
    pub fn record_row(&self) -> u64 {
        self.completed.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Number of rows written so far.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    /// Record that the first `rows` rows have been flushed.
    pub fn record_durable(&self, rows: u64) {
        self.durable.fetch_max(rows, Ordering::AcqRel);
    }

    /// Number of rows known to have reached the report.
    pub fn durable(&self) -> u64 {
        self.durable.load(Ordering::Acquire)
    }

    /// Time since streaming started.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_snapshot_starts_at_zero() {
        let snapshot = ProgressSnapshot::new();
        assert_eq!(snapshot.completed(), 0);
    }

    #[test]
    fn test_record_row_is_monotonic() {
        let snapshot = ProgressSnapshot::new();
        assert_eq!(snapshot.record_row(), 1);
        assert_eq!(snapshot.record_row(), 2);
        assert_eq!(snapshot.completed(), 2);
        assert_eq!(snapshot.durable(), 0);
    }

    #[test]
    fn test_durable_never_moves_backwards() {
        let snapshot = ProgressSnapshot::new();
        snapshot.record_durable(10);
        snapshot.record_durable(4);
        assert_eq!(snapshot.durable(), 10);
    }

    #[test]
    fn test_concurrent_increments() {
        let snapshot = Arc::new(ProgressSnapshot::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let snapshot = Arc::clone(&snapshot);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        snapshot.record_row();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(snapshot.completed(), 4000);
    }
}
