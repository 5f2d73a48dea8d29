//! Measurement producers.
//!
//! A producer turns a source (usually a media file path) into an ordered
//! stream of [`Measurement`](crate::Measurement)s pushed into a
//! [`MeasurementSink`]. The pipeline treats it as an external collaborator:
//! it is only ever asked to stop through the cancellation token, never
//! forcibly terminated.
//!
//! Producers must check the token at their own I/O boundaries and return
//! promptly once it fires.

mod ffprobe;

pub use ffprobe::{parse_frame_line, FfprobeFrameProducer};

use futures::future::BoxFuture;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::pipeline::{MeasurementSink, SinkError};

/// Errors raised by a producer.
#[derive(Debug, Error)]
pub enum ProducerError {
    /// The analysis process could not be started.
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading analysis output failed.
    #[error("I/O error reading analysis output: {0}")]
    Io(#[from] std::io::Error),

    /// The analysis process exited unsuccessfully.
    #[error("{program} exited with status {status}: {stderr}")]
    ExitStatus {
        program: String,
        status: String,
        stderr: String,
    },

    /// A line of analysis output could not be parsed.
    #[error("Unparseable analysis output at frame {sequence}: {line:?}")]
    Parse { sequence: u64, line: String },

    /// The measurement could not be handed to the writer.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Any other producer failure.
    #[error("Producer failed: {0}")]
    Failed(String),
}

impl ProducerError {
    /// Whether this error is only a consequence of pipeline shutdown
    /// (cancelled or closed sink) rather than a failure of the producer.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, ProducerError::Sink(_))
    }
}

/// Source of per-frame measurements.
///
/// `produce` pushes zero or more measurements into `sink` in production
/// order and returns once the source is exhausted. It must not assume it can
/// close the channel; end-of-stream is signalled by returning.
pub trait MeasurementProducer: Send + Sync {
    /// Stream measurements for `source` into `sink`.
    fn produce<'a>(
        &'a self,
        source: &'a str,
        sink: &'a MeasurementSink,
        cancellation: CancellationToken,
    ) -> BoxFuture<'a, Result<(), ProducerError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_detection() {
        assert!(ProducerError::Sink(SinkError::Cancelled).is_shutdown());
        assert!(ProducerError::Sink(SinkError::Closed).is_shutdown());
        assert!(!ProducerError::Failed("boom".to_string()).is_shutdown());
    }

    #[test]
    fn test_error_display() {
        let err = ProducerError::Parse {
            sequence: 7,
            line: "abc".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unparseable analysis output at frame 7: \"abc\""
        );
        assert_eq!(
            ProducerError::Sink(SinkError::Cancelled).to_string(),
            "Pipeline was cancelled"
        );
    }
}
