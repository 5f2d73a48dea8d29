//! CSV record writer.
//!
//! The writer is the sole owner of the report file. It drains the
//! measurement channel in arrival order, writes one row per measurement,
//! bumps the shared progress counter after each row, and flushes every
//! `flush_every` rows plus once more at completion. Only rows covered by a
//! successful flush count towards the durable total reported on failure.
//!
//! # Output
//!
//! ```text
//! sequence_number,category,size
//! 0,I,48213
//! 1,P,5120
//! 2,B,988
//! ```

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::PipelineError;
use crate::measurement::Measurement;
use crate::progress::ProgressSnapshot;

/// Header row, written before any measurement.
pub const REPORT_HEADER: [&str; 3] = ["sequence_number", "category", "size"];

/// Writes measurements as CSV rows.
pub struct RecordWriter<W: Write = File> {
    writer: csv::Writer<W>,
    path: PathBuf,
    flush_every: u64,
    rows: u64,
    flushed: u64,
}

impl RecordWriter<File> {
    /// Create (or overwrite) the report file at `path`.
    ///
    /// Missing parent directories are created. The header row is written
    /// immediately, so even an empty stream produces a valid report.
    pub fn create(path: &Path, flush_every: u64) -> Result<Self, PipelineError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PipelineError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let file = File::create(path).map_err(|source| PipelineError::CreateFile {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_writer(file, path, flush_every)
    }
}

impl<W: Write> RecordWriter<W> {
    /// Wrap an arbitrary sink. `path` is only used in errors and logs.
    pub fn from_writer(
        inner: W,
        path: impl Into<PathBuf>,
        flush_every: u64,
    ) -> Result<Self, PipelineError> {
        let path = path.into();
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);

        writer
            .write_record(REPORT_HEADER)
            .map_err(|source| PipelineError::Write {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            writer,
            path,
            flush_every: flush_every.max(1),
            rows: 0,
            flushed: 0,
        })
    }

    /// Rows known to have reached the underlying sink.
    pub fn flushed_rows(&self) -> u64 {
        self.flushed
    }

    /// Write one row, flushing on the configured cadence.
    pub fn write(&mut self, measurement: &Measurement) -> Result<(), PipelineError> {
        self.writer
            .serialize(measurement)
            .map_err(|source| PipelineError::Write {
                path: self.path.clone(),
                source,
            })?;
        self.rows += 1;

        if self.rows % self.flush_every == 0 {
            self.flush()?;
            debug!(rows = self.rows, "Report flushed");
        }
        Ok(())
    }

    /// Flush buffered rows to the underlying sink.
    pub fn flush(&mut self) -> Result<(), PipelineError> {
        self.writer
            .flush()
            .map_err(|source| PipelineError::Flush {
                path: self.path.clone(),
                source,
            })?;
        self.flushed = self.rows;
        Ok(())
    }

    /// Consume the writer, returning the underlying sink after a final flush.
    pub fn into_inner(mut self) -> Result<W, PipelineError> {
        self.flush()?;
        let path = self.path;
        self.writer
            .into_inner()
            .map_err(|e| PipelineError::Flush {
                path,
                source: e.into_error(),
            })
    }
}

impl<W: Write + Send + 'static> RecordWriter<W> {
    /// Drain `rx` until it closes, the pipeline is cancelled, or a write fails.
    ///
    /// Returns the number of rows written. On cancellation no further rows
    /// are written; rows already written are flushed and
    /// [`PipelineError::Cancelled`] is returned. Any failure cancels
    /// `cancellation` before the receiver is dropped, so the producer sees
    /// cancellation rather than a closed channel. The flushed row count is
    /// published to `progress` in every case.
    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<Measurement>,
        progress: Arc<ProgressSnapshot>,
        cancellation: CancellationToken,
    ) -> Result<u64, PipelineError> {
        debug!(path = %self.path.display(), "Record writer starting");

        let result = self.drain(&mut rx, &progress, &cancellation).await;
        progress.record_durable(self.flushed_rows());

        if let Err(e) = &result {
            if !matches!(e, PipelineError::Cancelled) {
                warn!(error = %e, flushed = self.flushed, "Record writer failed, cancelling pipeline");
            }
            cancellation.cancel();
        }
        result
    }

    async fn drain(
        &mut self,
        rx: &mut mpsc::Receiver<Measurement>,
        progress: &ProgressSnapshot,
        cancellation: &CancellationToken,
    ) -> Result<u64, PipelineError> {
        loop {
            tokio::select! {
                biased;

                _ = cancellation.cancelled() => {
                    self.flush()?;
                    info!(rows = self.rows, path = %self.path.display(), "Record writer cancelled");
                    return Err(PipelineError::Cancelled);
                }

                next = rx.recv() => match next {
                    Some(measurement) => {
                        self.write(&measurement)?;
                        progress.record_row();
                    }
                    None => break,
                },
            }
        }

        self.flush()?;
        info!(rows = self.rows, path = %self.path.display(), "Report written");
        Ok(self.rows)
    }
}
