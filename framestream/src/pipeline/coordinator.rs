//! Report pipeline coordinator.
//!
//! The [`ReportPipeline`] wires a producer, the record writer and the
//! progress reporter together around one bounded channel and one
//! cancellation token, then waits for the writer to finish.
//!
//! # Shutdown Order
//!
//! ```text
//! producer returns ──► sink dropped (channel closed)
//!                          │
//!                          ▼
//!                   writer drains + flushes ──► writer joined
//!                                                   │
//!                                                   ▼
//!                          reporter finished ◄── counts read, discrepancy noted
//! ```
//!
//! The first fatal error recorded by any task wins. A writer failure cancels
//! the shared token before the channel closes, so the producer stops at its
//! next checkpoint; the producer itself is never aborted. On failure the
//! reported count is the number of rows covered by a successful flush.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::channel::measurement_channel;
use super::config::PipelineConfig;
use super::error::PipelineError;
use super::writer::RecordWriter;
use crate::estimate::CountEstimate;
use crate::producer::MeasurementProducer;
use crate::progress::{NoProgress, ProgressObserver, ProgressReporter, ProgressSnapshot};

/// Holds the first fatal error; later ones are dropped.
#[derive(Debug, Default)]
struct FailureSlot(Mutex<Option<PipelineError>>);

impl FailureSlot {
    fn record(&self, error: PipelineError) -> bool {
        let mut slot = self.0.lock();
        if slot.is_some() {
            debug!(error = %error, "Ignoring error after first failure");
            return false;
        }
        *slot = Some(error);
        true
    }

    fn take(&self) -> Option<PipelineError> {
        self.0.lock().take()
    }
}

/// Mismatch between the estimate and the rows actually written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discrepancy {
    /// Estimated measurement count.
    pub expected: u64,
    /// Rows written.
    pub actual: u64,
}

impl Discrepancy {
    /// `actual - expected`.
    pub fn difference(&self) -> i64 {
        self.actual as i64 - self.expected as i64
    }
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "estimated {} frames, wrote {} ({:+})",
            self.expected,
            self.actual,
            self.difference()
        )
    }
}

/// Outcome of one pipeline run.
#[derive(Debug)]
pub struct PipelineResult {
    /// Rows written to the report, excluding the header.
    pub actual_count: u64,
    /// The estimate the run was seeded with.
    pub estimate: CountEstimate,
    /// Wall time of the run.
    pub elapsed: Duration,
    /// Report location.
    pub output_path: PathBuf,
    /// First fatal error, if any.
    pub error: Option<PipelineError>,
}

impl PipelineResult {
    /// Whether the run completed without a fatal error.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Estimated vs. actual mismatch for a successful run.
    ///
    /// Informational only; a discrepancy never makes a run fail.
    pub fn discrepancy(&self) -> Option<Discrepancy> {
        let expected = self.estimate.expected_count;
        (self.is_success() && self.actual_count != expected).then_some(Discrepancy {
            expected,
            actual: self.actual_count,
        })
    }

    /// Split off the error, if any.
    pub fn into_result(mut self) -> Result<Self, PipelineError> {
        match self.error.take() {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }
}

/// Streams measurements from a producer into a CSV report.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use framestream::estimate::CountEstimate;
/// use framestream::pipeline::ReportPipeline;
/// use framestream::producer::FfprobeFrameProducer;
///
/// let pipeline = ReportPipeline::new(Arc::new(FfprobeFrameProducer::default()));
/// let result = pipeline
///     .run("clip.mp4", "reports/clip_frames.csv".as_ref(), CountEstimate::from_count(306))
///     .await;
/// println!("{} rows", result.actual_count);
/// ```
pub struct ReportPipeline {
    producer: Arc<dyn MeasurementProducer>,
    observer: Arc<dyn ProgressObserver>,
    config: PipelineConfig,
}

impl ReportPipeline {
    /// Create a pipeline with default configuration and no progress display.
    pub fn new(producer: Arc<dyn MeasurementProducer>) -> Self {
        Self {
            producer,
            observer: Arc::new(NoProgress),
            config: PipelineConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Render progress through `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline to completion.
    pub async fn run(&self, source: &str, output: &Path, estimate: CountEstimate) -> PipelineResult {
        self.run_with_cancellation(source, output, estimate, CancellationToken::new())
            .await
    }

    /// Run the pipeline, also stopping when `parent` is cancelled.
    ///
    /// # Arguments
    ///
    /// * `source` - Identifier handed to the producer (usually a file path)
    /// * `output` - Report file, overwritten if it exists
    /// * `estimate` - Advisory count used for progress only
    /// * `parent` - External cancellation (e.g. Ctrl+C)
    pub async fn run_with_cancellation(
        &self,
        source: &str,
        output: &Path,
        estimate: CountEstimate,
        parent: CancellationToken,
    ) -> PipelineResult {
        let started = Instant::now();
        let expected = estimate.expected_count;
        let cancellation = parent.child_token();
        let failure = Arc::new(FailureSlot::default());
        let progress = Arc::new(ProgressSnapshot::new());

        info!(
            source,
            output = %output.display(),
            expected,
            channel_capacity = self.config.channel_capacity,
            "Starting report pipeline"
        );

        let reporter = ProgressReporter::spawn(
            Arc::clone(&progress),
            expected,
            Arc::clone(&self.observer),
            self.config.poll_interval,
        );

        let writer = match RecordWriter::create(output, self.config.flush_every) {
            Ok(writer) => writer,
            Err(e) => {
                warn!(error = %e, "Failed to open report");
                reporter.finish().await;
                return PipelineResult {
                    actual_count: 0,
                    estimate,
                    elapsed: started.elapsed(),
                    output_path: output.to_path_buf(),
                    error: Some(e),
                };
            }
        };

        let watchdog = spawn_deadline_watchdog(
            self.config.deadline,
            cancellation.clone(),
            Arc::clone(&failure),
        );

        let (sink, rx) = measurement_channel(self.config.channel_capacity, cancellation.clone());

        let writer_handle = {
            let progress = Arc::clone(&progress);
            let cancellation = cancellation.clone();
            let failure = Arc::clone(&failure);
            tokio::spawn(async move {
                match writer.run(rx, progress, cancellation).await {
                    Ok(rows) => Some(rows),
                    Err(e) => {
                        failure.record(e);
                        None
                    }
                }
            })
        };

        let producer_handle: JoinHandle<()> = {
            let producer = Arc::clone(&self.producer);
            let source = source.to_string();
            let cancellation = cancellation.clone();
            let failure = Arc::clone(&failure);
            tokio::spawn(async move {
                let result = producer
                    .produce(&source, &sink, cancellation.clone())
                    .await;
                // End of stream: the writer drains whatever is still buffered.
                drop(sink);

                match result {
                    Ok(()) => debug!(source = %source, "Producer finished"),
                    Err(e) if e.is_shutdown() || cancellation.is_cancelled() => {
                        debug!(source = %source, error = %e, "Producer stopped by pipeline shutdown");
                    }
                    Err(e) => {
                        warn!(source = %source, error = %e, "Producer failed");
                        failure.record(PipelineError::Producer(e));
                    }
                }
            })
        };

        // The writer finishes only after the channel closes or the run is cancelled.
        let rows = match writer_handle.await {
            Ok(Some(rows)) => Some(rows),
            Ok(None) => {
                cancellation.cancel();
                None
            }
            Err(e) => {
                failure.record(PipelineError::TaskFailed(format!("record writer: {}", e)));
                cancellation.cancel();
                None
            }
        };
        watchdog.abort();

        reporter.finish().await;

        if let Err(e) = producer_handle.await {
            failure.record(PipelineError::TaskFailed(format!("producer: {}", e)));
        }

        let result = PipelineResult {
            actual_count: rows.unwrap_or_else(|| progress.durable()),
            estimate,
            elapsed: started.elapsed(),
            output_path: output.to_path_buf(),
            error: failure.take(),
        };

        match &result.error {
            None => {
                if let Some(discrepancy) = result.discrepancy() {
                    debug!(
                        expected = discrepancy.expected,
                        actual = discrepancy.actual,
                        "Frame count differs from estimate"
                    );
                }
                info!(
                    rows = result.actual_count,
                    elapsed_ms = result.elapsed.as_millis() as u64,
                    "Report pipeline complete"
                );
            }
            Some(e) => {
                warn!(
                    rows = result.actual_count,
                    error = %e,
                    "Report pipeline failed"
                );
            }
        }

        result
    }
}

fn spawn_deadline_watchdog(
    deadline: Duration,
    cancellation: CancellationToken,
    failure: Arc<FailureSlot>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancellation.cancelled() => {}
            _ = tokio::time::sleep(deadline) => {
                warn!(deadline_secs = deadline.as_secs(), "Pipeline deadline exceeded, cancelling");
                failure.record(PipelineError::DeadlineExceeded { deadline });
                cancellation.cancel();
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::EstimateSource;
    use crate::measurement::{FrameCategory, Measurement};
    use crate::pipeline::MeasurementSink;
    use crate::producer::ProducerError;
    use futures::future::BoxFuture;

    /// Producer that emits `count` frames.
    struct CountingProducer {
        count: u64,
    }

    impl MeasurementProducer for CountingProducer {
        fn produce<'a>(
            &'a self,
            _source: &'a str,
            sink: &'a MeasurementSink,
            _cancellation: CancellationToken,
        ) -> BoxFuture<'a, Result<(), ProducerError>> {
            Box::pin(async move {
                for seq in 0..self.count {
                    sink.send(Measurement::new(seq, FrameCategory::Predicted, 100))
                        .await?;
                }
                Ok(())
            })
        }
    }

    /// Producer that emits some frames and then fails.
    struct FailingProducer;

    impl MeasurementProducer for FailingProducer {
        fn produce<'a>(
            &'a self,
            _source: &'a str,
            sink: &'a MeasurementSink,
            _cancellation: CancellationToken,
        ) -> BoxFuture<'a, Result<(), ProducerError>> {
            Box::pin(async move {
                sink.send(Measurement::new(0, FrameCategory::Key, 1)).await?;
                sink.send(Measurement::new(1, FrameCategory::Predicted, 2)).await?;
                Err(ProducerError::Failed("decoder crashed".to_string()))
            })
        }
    }

    /// Producer that never finishes on its own.
    struct StalledProducer;

    impl MeasurementProducer for StalledProducer {
        fn produce<'a>(
            &'a self,
            _source: &'a str,
            _sink: &'a MeasurementSink,
            cancellation: CancellationToken,
        ) -> BoxFuture<'a, Result<(), ProducerError>> {
            Box::pin(async move {
                cancellation.cancelled().await;
                Err(ProducerError::Failed("interrupted".to_string()))
            })
        }
    }

    #[test]
    fn test_failure_slot_keeps_first() {
        let slot = FailureSlot::default();
        assert!(slot.record(PipelineError::Cancelled));
        assert!(!slot.record(PipelineError::TaskFailed("late".to_string())));
        assert!(matches!(slot.take(), Some(PipelineError::Cancelled)));
        assert!(slot.take().is_none());
    }

    #[test]
    fn test_discrepancy_display() {
        let discrepancy = Discrepancy {
            expected: 306,
            actual: 300,
        };
        assert_eq!(discrepancy.difference(), -6);
        assert_eq!(discrepancy.to_string(), "estimated 306 frames, wrote 300 (-6)");
    }

    #[tokio::test]
    async fn test_discrepancy_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report.csv");
        let pipeline = ReportPipeline::new(Arc::new(CountingProducer { count: 300 }));

        let result = pipeline
            .run("clip.mp4", &output, CountEstimate::from_count(306))
            .await;

        assert!(result.is_success());
        assert_eq!(result.actual_count, 300);
        assert_eq!(
            result.discrepancy(),
            Some(Discrepancy {
                expected: 306,
                actual: 300
            })
        );
        assert_eq!(result.estimate.source, EstimateSource::Metadata);
    }

    #[tokio::test]
    async fn test_matching_estimate_has_no_discrepancy() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report.csv");
        let pipeline = ReportPipeline::new(Arc::new(CountingProducer { count: 10 }));

        let result = pipeline
            .run("clip.mp4", &output, CountEstimate::from_count(10))
            .await;
        assert!(result.discrepancy().is_none());
        assert!(result.into_result().is_ok());
    }

    #[tokio::test]
    async fn test_producer_failure_is_fatal_and_rows_remain() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report.csv");
        let pipeline = ReportPipeline::new(Arc::new(FailingProducer));

        let result = pipeline
            .run("clip.mp4", &output, CountEstimate::fallback())
            .await;

        assert_eq!(result.actual_count, 2);
        assert!(result.discrepancy().is_none());
        let err = result.into_result().unwrap_err();
        assert!(matches!(err, PipelineError::Producer(_)));

        let text = std::fs::read_to_string(&output).unwrap();
        assert_eq!(text.lines().count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_is_reported_distinctly() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report.csv");
        let pipeline = ReportPipeline::new(Arc::new(StalledProducer))
            .with_config(PipelineConfig::new().with_deadline(Duration::from_secs(5)));

        let result = pipeline
            .run("clip.mp4", &output, CountEstimate::fallback())
            .await;

        let err = result.error.expect("deadline should fail the run");
        assert!(err.is_deadline(), "unexpected error: {}", err);
    }

    #[tokio::test]
    async fn test_external_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report.csv");
        let pipeline = ReportPipeline::new(Arc::new(StalledProducer));
        let parent = CancellationToken::new();

        let canceller = parent.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let result = pipeline
            .run_with_cancellation("clip.mp4", &output, CountEstimate::fallback(), parent)
            .await;

        assert!(matches!(result.error, Some(PipelineError::Cancelled)));
        assert_eq!(result.actual_count, 0);
    }

    #[tokio::test]
    async fn test_unwritable_output_fails_before_streaming() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        let pipeline = ReportPipeline::new(Arc::new(CountingProducer { count: 5 }));
        let result = pipeline
            .run("clip.mp4", &blocker.join("report.csv"), CountEstimate::fallback())
            .await;

        assert_eq!(result.actual_count, 0);
        assert!(result.error.unwrap().is_io());
    }
}
