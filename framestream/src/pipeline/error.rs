//! Pipeline error types.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::producer::ProducerError;

/// Fatal errors that end a report pipeline.
///
/// A count discrepancy between the estimate and the rows written is never
/// one of these.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The measurement producer failed.
    #[error("Frame producer failed: {0}")]
    Producer(#[source] ProducerError),

    /// The output directory could not be created.
    #[error("Failed to create output directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    /// The report file could not be created.
    #[error("Failed to create report file {}: {source}", path.display())]
    CreateFile { path: PathBuf, source: io::Error },

    /// A row could not be written.
    #[error("Failed to write report {}: {source}", path.display())]
    Write { path: PathBuf, source: csv::Error },

    /// Buffered rows could not be flushed.
    #[error("Failed to flush report {}: {source}", path.display())]
    Flush { path: PathBuf, source: io::Error },

    /// The pipeline ran past its absolute deadline.
    #[error("Pipeline exceeded its deadline of {}s", deadline.as_secs())]
    DeadlineExceeded { deadline: Duration },

    /// The pipeline was cancelled from outside.
    #[error("Pipeline was cancelled")]
    Cancelled,

    /// A pipeline task panicked or was aborted.
    #[error("Pipeline task failed: {0}")]
    TaskFailed(String),
}

impl PipelineError {
    /// Whether the pipeline stopped because it took too long.
    pub fn is_deadline(&self) -> bool {
        matches!(self, PipelineError::DeadlineExceeded { .. })
    }

    /// Whether the error came from report file I/O.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            PipelineError::CreateDir { .. }
                | PipelineError::CreateFile { .. }
                | PipelineError::Write { .. }
                | PipelineError::Flush { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_is_distinct_from_io() {
        let err = PipelineError::DeadlineExceeded {
            deadline: Duration::from_secs(1800),
        };
        assert!(err.is_deadline());
        assert!(!err.is_io());
        assert_eq!(err.to_string(), "Pipeline exceeded its deadline of 1800s");
    }

    #[test]
    fn test_io_errors_display_path() {
        let err = PipelineError::CreateFile {
            path: PathBuf::from("/reports/clip_frames.csv"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.is_io());
        assert!(err.to_string().contains("/reports/clip_frames.csv"));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_producer_error_display() {
        let err = PipelineError::Producer(ProducerError::Failed("no input".to_string()));
        assert_eq!(
            err.to_string(),
            "Frame producer failed: Producer failed: no input"
        );
    }
}
