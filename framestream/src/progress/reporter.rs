//! Periodic progress reporter.
//!
//! The reporter runs as its own task, polling the shared
//! [`ProgressSnapshot`] on a fixed interval and pushing a [`ProgressUpdate`]
//! to a [`ProgressObserver`]. It never touches the measurement channel, so
//! removing it changes only what the operator sees.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::eta::{format_eta, UNKNOWN_ETA};
use super::snapshot::ProgressSnapshot;

/// Default polling interval (twice per second).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Point-in-time progress, as handed to observers.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Rows written so far.
    pub completed: u64,
    /// Estimated total rows.
    pub expected: u64,
    /// `completed / expected`, or `None` when nothing is expected.
    pub fraction: Option<f64>,
    /// Time since streaming started.
    pub elapsed: Duration,
    /// Rendered time remaining.
    pub eta: String,
}

impl ProgressUpdate {
    /// Build an update from the current counter value.
    pub fn capture(snapshot: &ProgressSnapshot, expected: u64) -> Self {
        Self::compute(snapshot.completed(), expected, snapshot.elapsed())
    }

    /// Build an update from explicit values.
    pub fn compute(completed: u64, expected: u64, elapsed: Duration) -> Self {
        let fraction = (expected > 0).then(|| completed as f64 / expected as f64);
        let eta = match fraction {
            Some(f) => format_eta(elapsed.as_secs_f64(), f),
            None => UNKNOWN_ETA.to_string(),
        };
        Self {
            completed,
            expected,
            fraction,
            elapsed,
            eta,
        }
    }
}

/// Receives progress updates for display.
///
/// Implementations must be cheap: they are called from the reporter task on
/// every tick.
pub trait ProgressObserver: Send + Sync {
    /// Called once before the first update.
    fn start(&self, expected: u64);

    /// Called on every poll and once more when the pipeline completes.
    fn update(&self, update: &ProgressUpdate);

    /// Called last. Must clear or finalize the display.
    fn finish(&self);
}

/// Observer that discards all updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn start(&self, _expected: u64) {}
    fn update(&self, _update: &ProgressUpdate) {}
    fn finish(&self) {}
}

/// Handle to a running reporter task.
///
/// Call [`ProgressReporter::finish`] once the pipeline is done; dropping the
/// handle also signals the task to stop.
pub struct ProgressReporter {
    handle: Option<JoinHandle<()>>,
    done: CancellationToken,
}

impl ProgressReporter {
    /// Spawn a reporter on the current runtime.
    ///
    /// # Arguments
    ///
    /// * `snapshot` - Shared counter updated by the record writer
    /// * `expected` - Estimated total rows
    /// * `observer` - Where updates are rendered
    /// * `poll_interval` - How often to poll the counter
    pub fn spawn(
        snapshot: Arc<ProgressSnapshot>,
        expected: u64,
        observer: Arc<dyn ProgressObserver>,
        poll_interval: Duration,
    ) -> Self {
        let done = CancellationToken::new();
        let task_done = done.clone();

        let handle = tokio::spawn(async move {
            observer.start(expected);

            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;

                    _ = task_done.cancelled() => break,

                    _ = ticker.tick() => {
                        observer.update(&ProgressUpdate::capture(&snapshot, expected));
                    }
                }
            }

            // Final report
            let last = ProgressUpdate::capture(&snapshot, expected);
            debug!(
                completed = last.completed,
                expected,
                "Progress reporter stopping"
            );
            observer.update(&last);
            observer.finish();
        });

        Self {
            handle: Some(handle),
            done,
        }
    }

    /// Signal completion and wait for the reporter task to exit.
    pub async fn finish(mut self) {
        self.done.cancel();
        if let Some(handle) = self.handle.take() {
            handle.await.ok();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.done.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingObserver {
        started: Mutex<Option<u64>>,
        updates: Mutex<Vec<ProgressUpdate>>,
        finished: Mutex<bool>,
    }

    impl ProgressObserver for RecordingObserver {
        fn start(&self, expected: u64) {
            *self.started.lock() = Some(expected);
        }

        fn update(&self, update: &ProgressUpdate) {
            self.updates.lock().push(update.clone());
        }

        fn finish(&self) {
            *self.finished.lock() = true;
        }
    }

    #[test]
    fn test_update_fraction_and_eta() {
        let update = ProgressUpdate::compute(50, 100, Duration::from_secs(30));
        assert_eq!(update.fraction, Some(0.5));
        assert_eq!(update.eta, "30 seconds");
    }

    #[test]
    fn test_update_zero_expected_is_unknown() {
        let update = ProgressUpdate::compute(10, 0, Duration::from_secs(30));
        assert_eq!(update.fraction, None);
        assert_eq!(update.eta, UNKNOWN_ETA);
    }

    #[test]
    fn test_update_nothing_done_is_unknown() {
        let update = ProgressUpdate::compute(0, 100, Duration::from_secs(5));
        assert_eq!(update.eta, UNKNOWN_ETA);
    }

    #[test]
    fn test_overrun_clamps_eta_to_zero() {
        let update = ProgressUpdate::compute(150, 100, Duration::from_secs(5));
        assert_eq!(update.fraction, Some(1.5));
        assert_eq!(update.eta, "0 seconds");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reporter_polls_until_finished() {
        let snapshot = Arc::new(ProgressSnapshot::new());
        let observer = Arc::new(RecordingObserver::default());

        let reporter = ProgressReporter::spawn(
            Arc::clone(&snapshot),
            10,
            observer.clone(),
            Duration::from_millis(500),
        );

        for _ in 0..3 {
            snapshot.record_row();
            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        reporter.finish().await;

        assert_eq!(*observer.started.lock(), Some(10));
        assert!(*observer.finished.lock());

        let updates = observer.updates.lock();
        assert!(updates.len() >= 2);
        assert_eq!(updates.last().unwrap().completed, 3);
        assert!(updates
            .windows(2)
            .all(|w| w[0].completed <= w[1].completed));
    }

    #[tokio::test]
    async fn test_reporter_finishes_immediately_when_signalled() {
        let snapshot = Arc::new(ProgressSnapshot::new());
        let observer = Arc::new(RecordingObserver::default());

        let reporter = ProgressReporter::spawn(
            snapshot,
            0,
            observer.clone(),
            Duration::from_secs(3600),
        );
        reporter.finish().await;

        assert!(*observer.finished.lock());
        assert_eq!(observer.updates.lock().last().unwrap().eta, UNKNOWN_ETA);
    }
}
