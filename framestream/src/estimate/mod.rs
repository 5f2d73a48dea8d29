//! Fast frame-count estimation.
//!
//! The estimate seeds the progress display before streaming starts. It is
//! advisory only: the pipeline never truncates or pads output to match it,
//! and a failed probe degrades to [`DEFAULT_EXPECTED_COUNT`] instead of
//! failing the run.
//!
//! # Example
//!
//! ```
//! use framestream::estimate::{estimate_frame_count, MediaMetadata};
//!
//! let metadata = MediaMetadata::single_stream(Some(10.0), Some(30.0));
//! assert_eq!(estimate_frame_count(&metadata).expected_count, 306);
//! ```

mod probe;

pub use probe::{
    parse_ffprobe_json, FfprobeMetadataProbe, MediaMetadata, MetadataProbe, ProbeError,
    StreamMetadata, DEFAULT_FFPROBE,
};

use tracing::debug;

/// Estimate used when no duration or frame rate is available.
pub const DEFAULT_EXPECTED_COUNT: u64 = 5000;

/// Inflation applied to `duration × frame_rate`.
pub const SAFETY_MARGIN: f64 = 1.02;

/// Where an estimate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateSource {
    /// Computed from probed duration and frame rate.
    Metadata,
    /// Fixed fallback value.
    Default,
}

/// Approximate number of measurements to expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountEstimate {
    /// Expected measurement count.
    pub expected_count: u64,
    /// How the count was obtained.
    pub source: EstimateSource,
}

impl CountEstimate {
    /// The conservative default estimate.
    pub fn fallback() -> Self {
        Self {
            expected_count: DEFAULT_EXPECTED_COUNT,
            source: EstimateSource::Default,
        }
    }

    /// An estimate with an explicit count.
    pub fn from_count(expected_count: u64) -> Self {
        Self {
            expected_count,
            source: EstimateSource::Metadata,
        }
    }

    /// Whether this is the fixed fallback rather than a computed value.
    pub fn is_fallback(&self) -> bool {
        self.source == EstimateSource::Default
    }
}

/// Estimate the frame count from probed metadata.
///
/// Each stream uses its own duration, or the container duration when it has
/// none. The largest candidate wins.
pub fn estimate_frame_count(metadata: &MediaMetadata) -> CountEstimate {
    metadata
        .streams
        .iter()
        .filter_map(|stream| {
            let duration = stream.duration.or(metadata.container_duration)?;
            let frame_rate = stream.frame_rate?;
            stream_estimate(duration, frame_rate)
        })
        .max()
        .map(CountEstimate::from_count)
        .unwrap_or_else(CountEstimate::fallback)
}

fn stream_estimate(duration: f64, frame_rate: f64) -> Option<u64> {
    let usable = |v: f64| v.is_finite() && v > 0.0;
    if !usable(duration) || !usable(frame_rate) {
        return None;
    }
    Some((duration * frame_rate * SAFETY_MARGIN).floor() as u64)
}

/// Probe the source and estimate its frame count.
///
/// Probe failures are logged at debug level and yield the default estimate.
pub async fn estimate_from_probe(probe: &dyn MetadataProbe, source: &str) -> CountEstimate {
    match probe.probe(source).await {
        Ok(metadata) => {
            let estimate = estimate_frame_count(&metadata);
            debug!(
                source,
                expected = estimate.expected_count,
                fallback = estimate.is_fallback(),
                "Frame count estimated"
            );
            estimate
        }
        Err(e) => {
            debug!(
                source,
                error = %e,
                default = DEFAULT_EXPECTED_COUNT,
                "Frame count probe failed, using default estimate"
            );
            CountEstimate::fallback()
        }
    }
}

/// Parse an ffprobe-style frame rate such as `30000/1001` or `25`.
///
/// Returns `None` for `0/0`, zero, or anything non-numeric.
pub fn parse_frame_rate(value: &str) -> Option<f64> {
    let value = value.trim();
    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}
