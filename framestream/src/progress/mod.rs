//! Live progress feedback for a running report.
//!
//! Uses a lock-free atomic counter written by the record writer and a
//! dedicated reporter task that polls it on a timer.
//!
//! ```text
//! RecordWriter ─► ProgressSnapshot ─► ProgressReporter ─► ProgressObserver
//!                 (atomic counter)    (interval task)     (CLI bar, etc.)
//! ```

mod eta;
mod reporter;
mod snapshot;

pub use eta::{format_eta, format_seconds, remaining_secs, UNKNOWN_ETA};
pub use reporter::{
    NoProgress, ProgressObserver, ProgressReporter, ProgressUpdate, DEFAULT_POLL_INTERVAL,
};
pub use snapshot::ProgressSnapshot;
