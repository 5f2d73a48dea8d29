//! Container metadata probing.
//!
//! The probe only has to answer two questions for the estimator: how long is
//! the media, and at what nominal rate are frames produced. [`MetadataProbe`]
//! is dyn-compatible so the pipeline can take any implementation; the
//! default one shells out to `ffprobe`.

use std::process::Stdio;

use futures::future::BoxFuture;
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use super::parse_frame_rate;

/// Errors that can occur while probing container metadata.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The probe process could not be started.
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The probe process exited unsuccessfully.
    #[error("{program} exited with status {status}: {stderr}")]
    ExitStatus {
        program: String,
        status: String,
        stderr: String,
    },

    /// The probe output could not be parsed.
    #[error("Malformed probe output: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Duration and frame rate of one video stream.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StreamMetadata {
    /// Stream-level duration in seconds.
    pub duration: Option<f64>,
    /// Nominal frames per second.
    pub frame_rate: Option<f64>,
}

/// Metadata needed to estimate the frame count of a media source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaMetadata {
    /// Container-level duration in seconds, used when a stream has none.
    pub container_duration: Option<f64>,
    /// Candidate video streams.
    pub streams: Vec<StreamMetadata>,
}

impl MediaMetadata {
    /// Metadata describing a single stream with no container duration.
    pub fn single_stream(duration: Option<f64>, frame_rate: Option<f64>) -> Self {
        Self {
            container_duration: None,
            streams: vec![StreamMetadata {
                duration,
                frame_rate,
            }],
        }
    }
}

/// Source of duration and frame-rate metadata.
pub trait MetadataProbe: Send + Sync {
    /// Probe the given source.
    fn probe<'a>(&'a self, source: &'a str) -> BoxFuture<'a, Result<MediaMetadata, ProbeError>>;
}

/// Default ffprobe program name, resolved through `PATH`.
pub const DEFAULT_FFPROBE: &str = "ffprobe";

/// Metadata probe backed by `ffprobe -show_format -show_streams`.
#[derive(Debug, Clone)]
pub struct FfprobeMetadataProbe {
    program: String,
}

impl Default for FfprobeMetadataProbe {
    fn default() -> Self {
        Self::new(DEFAULT_FFPROBE)
    }
}

impl FfprobeMetadataProbe {
    /// Create a probe using the given ffprobe executable.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl MetadataProbe for FfprobeMetadataProbe {
    fn probe<'a>(&'a self, source: &'a str) -> BoxFuture<'a, Result<MediaMetadata, ProbeError>> {
        Box::pin(async move {
            let output = Command::new(&self.program)
                .args(["-v", "error", "-show_format", "-show_streams", "-of", "json"])
                .arg(source)
                .stdin(Stdio::null())
                .output()
                .await
                .map_err(|source| ProbeError::Spawn {
                    program: self.program.clone(),
                    source,
                })?;

            if !output.status.success() {
                return Err(ProbeError::ExitStatus {
                    program: self.program.clone(),
                    status: output.status.to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }

            let metadata = parse_ffprobe_json(&output.stdout)?;
            debug!(
                source,
                streams = metadata.streams.len(),
                container_duration = ?metadata.container_duration,
                "Probed media metadata"
            );
            Ok(metadata)
        })
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    duration: Option<String>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Parse `ffprobe -of json` output into [`MediaMetadata`].
///
/// Only video streams are kept. The real base frame rate is preferred over
/// the average rate since it is never lower for variable-rate streams.
pub fn parse_ffprobe_json(bytes: &[u8]) -> Result<MediaMetadata, ProbeError> {
    let output: FfprobeOutput = serde_json::from_slice(bytes)?;

    let streams = output
        .streams
        .iter()
        .filter(|s| s.codec_type.as_deref() == Some("video"))
        .map(|s| StreamMetadata {
            duration: s.duration.as_deref().and_then(parse_seconds),
            frame_rate: s
                .r_frame_rate
                .as_deref()
                .and_then(parse_frame_rate)
                .or_else(|| s.avg_frame_rate.as_deref().and_then(parse_frame_rate)),
        })
        .collect();

    Ok(MediaMetadata {
        container_duration: output
            .format
            .and_then(|f| f.duration)
            .as_deref()
            .and_then(parse_seconds),
        streams,
    })
}

fn parse_seconds(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"codec_type": "video", "r_frame_rate": "30/1", "avg_frame_rate": "30/1", "duration": "10.000000"},
            {"codec_type": "audio", "r_frame_rate": "0/0", "duration": "10.020000"}
        ],
        "format": {"duration": "10.020000"}
    }"#;

    #[test]
    fn test_parse_keeps_video_streams_only() {
        let metadata = parse_ffprobe_json(SAMPLE.as_bytes()).unwrap();
        assert_eq!(metadata.streams.len(), 1);
        assert_eq!(metadata.streams[0].duration, Some(10.0));
        assert_eq!(metadata.streams[0].frame_rate, Some(30.0));
        assert_eq!(metadata.container_duration, Some(10.02));
    }

    #[test]
    fn test_parse_falls_back_to_average_rate() {
        let json = r#"{"streams": [{"codec_type": "video", "r_frame_rate": "0/0", "avg_frame_rate": "25/1"}]}"#;
        let metadata = parse_ffprobe_json(json.as_bytes()).unwrap();
        assert_eq!(metadata.streams[0].frame_rate, Some(25.0));
        assert_eq!(metadata.streams[0].duration, None);
        assert_eq!(metadata.container_duration, None);
    }

    #[test]
    fn test_parse_ignores_unusable_durations() {
        let json = r#"{"streams": [{"codec_type": "video", "duration": "N/A"}], "format": {"duration": "0"}}"#;
        let metadata = parse_ffprobe_json(json.as_bytes()).unwrap();
        assert_eq!(metadata.streams[0].duration, None);
        assert_eq!(metadata.container_duration, None);
    }

    #[test]
    fn test_parse_malformed_json() {
        let err = parse_ffprobe_json(b"not json").unwrap_err();
        assert!(matches!(err, ProbeError::Malformed(_)));
        assert!(err.to_string().starts_with("Malformed probe output"));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let probe = FfprobeMetadataProbe::new("framestream-no-such-ffprobe");
        let err = probe.probe("input.mp4").await.unwrap_err();
        assert!(matches!(err, ProbeError::Spawn { .. }));
    }
}
