//! FrameStream - Streaming per-frame reports for video files
//!
//! This library turns the ordered stream of per-frame measurements produced
//! by an analysis engine (ffprobe by default) into a CSV report, while a
//! separate task renders live progress and an estimated time remaining.
//!
//! # Architecture
//!
//! ```text
//! estimate ──► pipeline::ReportPipeline ──► producer ──► MeasurementSink
//!                      │                                     │ (bounded)
//!                      │                                     ▼
//!                      │                              RecordWriter ──► report.csv
//!                      │                                     │
//!                      └──► progress::ProgressReporter ◄─────┘ (atomic counter)
//! ```

pub mod config;
pub mod estimate;
pub mod logging;
pub mod measurement;
pub mod pipeline;
pub mod producer;
pub mod progress;

pub use measurement::{FrameCategory, Measurement};

/// Library version, as reported by `framestream --version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
