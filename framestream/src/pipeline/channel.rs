//! Bounded measurement channel.
//!
//! The channel is the only hand-off between producer and record writer. Its
//! capacity is small and fixed, so a slow writer throttles the producer
//! instead of letting memory grow without bound.
//!
//! The producer only ever sees a [`MeasurementSink`]. It cannot close the
//! channel: the coordinator drops the sink once the producer returns, which
//! the writer observes as end-of-stream.

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::measurement::Measurement;

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Reasons a measurement could not be handed to the writer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    /// The pipeline was cancelled or its deadline expired.
    #[error("Pipeline was cancelled")]
    Cancelled,

    /// The record writer has stopped receiving.
    #[error("Record writer is no longer receiving measurements")]
    Closed,
}

/// Producer side of the measurement channel.
#[derive(Debug)]
pub struct MeasurementSink {
    tx: mpsc::Sender<Measurement>,
    cancellation: CancellationToken,
}

impl MeasurementSink {
    /// Hand a measurement to the writer.
    ///
    /// Waits while the channel is full. Returns [`SinkError::Cancelled`] as
    /// soon as the pipeline is cancelled, even if still waiting for room.
    pub async fn send(&self, measurement: Measurement) -> Result<(), SinkError> {
        if self.cancellation.is_cancelled() {
            return Err(SinkError::Cancelled);
        }

        tokio::select! {
            biased;

            _ = self.cancellation.cancelled() => Err(SinkError::Cancelled),

            sent = self.tx.send(measurement) => sent.map_err(|_| SinkError::Closed),
        }
    }

    /// Whether the pipeline has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// Create a bounded channel whose sink honours `cancellation`.
///
/// A capacity of zero is raised to one.
pub fn measurement_channel(
    capacity: usize,
    cancellation: CancellationToken,
) -> (MeasurementSink, mpsc::Receiver<Measurement>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (MeasurementSink { tx, cancellation }, rx)
}
