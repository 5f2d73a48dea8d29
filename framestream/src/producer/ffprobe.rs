//! ffprobe-backed frame producer.
//!
//! Runs `ffprobe -show_entries frame=pkt_size,pict_type -of csv=p=0` on the
//! first video stream and turns each output line into a measurement. Lines
//! are read as ffprobe emits them, so the report grows while the analysis
//! is still running.

use std::process::Stdio;

use futures::future::BoxFuture;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{MeasurementProducer, ProducerError};
use crate::estimate::DEFAULT_FFPROBE;
use crate::measurement::{FrameCategory, Measurement};
use crate::pipeline::{MeasurementSink, SinkError};

/// Default stream selector (first video stream).
pub const DEFAULT_STREAM_SELECTOR: &str = "v:0";

/// Producer that streams per-frame sizes and picture types from ffprobe.
#[derive(Debug, Clone)]
pub struct FfprobeFrameProducer {
    program: String,
}

impl Default for FfprobeFrameProducer {
    fn default() -> Self {
        Self::new(DEFAULT_FFPROBE)
    }
}

impl FfprobeFrameProducer {
    /// Create a producer using the given ffprobe executable.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, source: &str) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(["-v", "error", "-select_streams", DEFAULT_STREAM_SELECTOR])
            .args([
                "-show_entries",
                "frame=pkt_size,pict_type",
                "-of",
                "csv=p=0",
            ])
            .arg(source)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

impl MeasurementProducer for FfprobeFrameProducer {
    fn produce<'a>(
        &'a self,
        source: &'a str,
        sink: &'a MeasurementSink,
        cancellation: CancellationToken,
    ) -> BoxFuture<'a, Result<(), ProducerError>> {
        Box::pin(async move {
            let mut child = self
                .command(source)
                .spawn()
                .map_err(|source| ProducerError::Spawn {
                    program: self.program.clone(),
                    source,
                })?;

            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| ProducerError::Failed("ffprobe stdout not captured".into()))?;

            // Drain stderr concurrently so a chatty ffprobe cannot stall on a full pipe.
            let stderr_task = child.stderr.take().map(|mut stderr| {
                tokio::spawn(async move {
                    let mut text = String::new();
                    stderr.read_to_string(&mut text).await.ok();
                    text
                })
            });

            info!(source, program = %self.program, "Starting frame analysis");

            let mut lines = BufReader::new(stdout).lines();
            let mut sequence = 0u64;

            loop {
                let line = tokio::select! {
                    biased;

                    _ = cancellation.cancelled() => {
                        debug!(source, frames = sequence, "Frame analysis cancelled");
                        child.start_kill().ok();
                        return Err(SinkError::Cancelled.into());
                    }

                    line = lines.next_line() => line?,
                };

                let Some(line) = line else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }

                sink.send(parse_frame_line(&line, sequence)?).await?;
                sequence += 1;
            }

            let status = child.wait().await?;
            let stderr = match stderr_task {
                Some(task) => task.await.unwrap_or_default(),
                None => String::new(),
            };

            if !status.success() {
                return Err(ProducerError::ExitStatus {
                    program: self.program.clone(),
                    status: status.to_string(),
                    stderr: stderr.trim().to_string(),
                });
            }

            debug!(source, frames = sequence, "Frame analysis finished");
            Ok(())
        })
    }
}

/// Parse one `pkt_size,pict_type` line of ffprobe output.
///
/// Field order is not relied upon: the first numeric field is the size and
/// the first non-numeric field is the picture type. Trailing empty fields
/// are ignored.
pub fn parse_frame_line(line: &str, sequence: u64) -> Result<Measurement, ProducerError> {
    let mut size = None;
    let mut category = None;

    for field in line.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        match field.parse::<u64>() {
            Ok(value) if size.is_none() => size = Some(value),
            Ok(_) => {}
            Err(_) if category.is_none() => category = Some(FrameCategory::from_label(field)),
            Err(_) => {}
        }
    }

    let size = size.ok_or_else(|| ProducerError::Parse {
        sequence,
        line: line.to_string(),
    })?;

    Ok(Measurement::new(
        sequence,
        category.unwrap_or(FrameCategory::Other),
        size,
    ))
}
