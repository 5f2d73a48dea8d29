//! Streaming report pipeline.
//!
//! This module moves measurements from a producer to a CSV report with
//! bounded buffering, a shared cancellation signal, and deterministic
//! shutdown:
//! - Bounded hand-off channel (`channel`)
//! - CSV record writer with periodic flushing (`writer`)
//! - Coordinator owning the deadline and error policy (`coordinator`)
//!
//! # Architecture
//!
//! ```text
//! ReportPipeline (coordinator)
//!         │
//!         ├── producer task ──► MeasurementSink ──► mpsc (capacity 100)
//!         │                                              │
//!         ├── writer task   ◄────────────────────────────┘
//!         │       └── RecordWriter ──► report.csv
//!         │       └── ProgressSnapshot (atomic counter)
//!         │
//!         ├── ProgressReporter (polls the counter)
//!         │
//!         └── deadline watchdog ──► CancellationToken
//! ```

mod channel;
mod config;
mod coordinator;
mod error;
mod writer;

pub use channel::{measurement_channel, MeasurementSink, SinkError, DEFAULT_CHANNEL_CAPACITY};
pub use config::{PipelineConfig, DEFAULT_DEADLINE, DEFAULT_FLUSH_EVERY, MIN_DEADLINE};
pub use coordinator::{Discrepancy, PipelineResult, ReportPipeline};
pub use error::PipelineError;
pub use writer::{RecordWriter, REPORT_HEADER};
