//! Settings resolution shared across commands.
//!
//! Every value follows the same precedence: CLI flag, then `config.ini`,
//! then the library default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use framestream::config::ConfigFile;
use framestream::pipeline::{PipelineConfig, MIN_DEADLINE};

/// Suffix appended to the input's file stem for the default report name.
pub const REPORT_SUFFIX: &str = "_frames.csv";

/// Pipeline overrides taken from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOverrides {
    pub timeout_secs: Option<u64>,
    pub channel_capacity: Option<usize>,
    pub flush_every: Option<u64>,
}

/// Resolve the pipeline configuration from CLI flags and config.
pub fn resolve_pipeline_config(overrides: PipelineOverrides, config: &ConfigFile) -> PipelineConfig {
    let mut pipeline = config.pipeline.to_pipeline_config();

    if let Some(secs) = overrides.timeout_secs {
        pipeline = pipeline.with_deadline(Duration::from_secs(secs));
    }
    if let Some(capacity) = overrides.channel_capacity {
        pipeline = pipeline.with_channel_capacity(capacity);
    }
    if let Some(rows) = overrides.flush_every {
        pipeline = pipeline.with_flush_every(rows);
    }
    pipeline
}

/// Default report file name for `input`, e.g. `clip.mp4` -> `clip_frames.csv`.
pub fn default_report_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "report".to_string());
    format!("{}{}", stem, REPORT_SUFFIX)
}

/// Resolve where the report is written.
pub fn resolve_output_path(
    cli_dir: Option<PathBuf>,
    cli_file: Option<String>,
    input: &Path,
    config: &ConfigFile,
) -> PathBuf {
    let dir = cli_dir.unwrap_or_else(|| config.output.directory.clone());
    let file = cli_file.unwrap_or_else(|| default_report_name(input));
    dir.join(file)
}
