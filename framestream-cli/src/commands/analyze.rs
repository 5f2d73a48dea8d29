//! Analyze command - stream a video's per-frame sizes into a CSV report.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use console::style;
use framestream::estimate::{
    estimate_from_probe, CountEstimate, FfprobeMetadataProbe, DEFAULT_FFPROBE,
};
use framestream::pipeline::{PipelineResult, ReportPipeline};
use framestream::producer::FfprobeFrameProducer;
use framestream::progress::{format_seconds, NoProgress, ProgressObserver};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::common::{resolve_output_path, resolve_pipeline_config, PipelineOverrides};
use crate::error::CliError;
use crate::progress::BarProgress;
use crate::runner::CliRunner;

/// Arguments for the analyze command.
#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Video file to analyze
    pub input: PathBuf,

    /// Directory for the report (default: [output] directory in config.ini)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Report file name (default: <input stem>_frames.csv)
    #[arg(long)]
    pub output_file: Option<String>,

    /// Abort the run after this many seconds (at least 1)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Measurements buffered between analysis and writing
    #[arg(long)]
    pub channel_capacity: Option<usize>,

    /// Flush the report every N rows
    #[arg(long)]
    pub flush_every: Option<u64>,

    /// Path to the ffprobe executable
    #[arg(long, default_value = DEFAULT_FFPROBE)]
    pub ffprobe: String,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Debug logging and estimate details
    #[arg(short, long)]
    pub verbose: bool,
}

/// Run the analyze command.
pub fn run(args: AnalyzeArgs) -> Result<(), CliError> {
    if !args.input.is_file() {
        return Err(CliError::Input(format!(
            "Input file not found: {}",
            args.input.display()
        )));
    }

    let runner = CliRunner::new(args.verbose)?;
    runner.log_startup("analyze");
    let config = runner.config();

    let pipeline_config = resolve_pipeline_config(
        PipelineOverrides {
            timeout_secs: args.timeout,
            channel_capacity: args.channel_capacity,
            flush_every: args.flush_every,
        },
        config,
    );
    let output = resolve_output_path(
        args.output_dir.clone(),
        args.output_file.clone(),
        &args.input,
        config,
    );
    let source = args.input.to_string_lossy().to_string();

    println!("FrameStream v{}", framestream::VERSION);
    println!("Input:  {}", source);
    println!("Report: {}", output.display());
    println!();

    let cancellation = CancellationToken::new();
    let signal = cancellation.clone();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Received interrupt, stopping...");
        signal.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let observer: Arc<dyn ProgressObserver> =
        if args.no_progress || !console::Term::stderr().is_term() {
            Arc::new(NoProgress)
        } else {
            Arc::new(BarProgress::new())
        };

    let probe = FfprobeMetadataProbe::new(args.ffprobe.clone());
    let producer = Arc::new(FfprobeFrameProducer::new(args.ffprobe.clone()));
    let pipeline = ReportPipeline::new(producer)
        .with_config(pipeline_config)
        .with_observer(observer);

    let result = runner.block_on(async {
        let estimate = estimate_from_probe(&probe, &source).await;
        note_estimate(&estimate, &source);
        pipeline
            .run_with_cancellation(&source, &output, estimate, cancellation)
            .await
    });

    print_summary(&result, args.verbose);
    result.into_result()?;
    Ok(())
}

/// Estimation problems are only of interest with `-v` or `RUST_LOG`.
fn note_estimate(estimate: &CountEstimate, source: &str) {
    if estimate.is_fallback() {
        debug!(
            source,
            expected = estimate.expected_count,
            "No usable metadata, progress uses a default estimate"
        );
    }
}

fn print_summary(result: &PipelineResult, verbose: bool) {
    let status = if result.is_success() {
        style("Done").green().bold()
    } else {
        style("Stopped").yellow().bold()
    };

    println!("{}", status);
    println!("  Frames written: {}", result.actual_count);
    println!(
        "  Estimated:      {}{}",
        result.estimate.expected_count,
        if result.estimate.is_fallback() { " (default)" } else { "" }
    );
    println!("  Elapsed:        {}", format_seconds(result.elapsed.as_secs_f64()));
    println!("  Report:         {}", result.output_path.display());

    if verbose {
        if let Some(discrepancy) = result.discrepancy() {
            println!("  Note: {}", discrepancy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io;
    use std::sync::{Arc as StdArc, Mutex};
    use tracing::Level;

    /// Collects formatted log output.
    #[derive(Clone, Default)]
    struct Captured(StdArc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn logged_at(level: Level, estimate: CountEstimate) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || note_estimate(&estimate, "clip.mp4"));
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_default_estimate_is_silent_at_default_level() {
        assert_eq!(logged_at(Level::WARN, CountEstimate::fallback()), "");
    }

    #[test]
    fn test_default_estimate_is_logged_when_verbose() {
        let output = logged_at(Level::DEBUG, CountEstimate::fallback());
        assert!(output.contains("default estimate"), "got: {}", output);
        assert_eq!(logged_at(Level::DEBUG, CountEstimate::from_count(306)), "");
    }

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        args: AnalyzeArgs,
    }

    #[test]
    fn test_defaults() {
        let cli = TestCli::parse_from(["framestream", "clip.mp4"]);
        assert_eq!(cli.args.input, PathBuf::from("clip.mp4"));
        assert_eq!(cli.args.ffprobe, "ffprobe");
        assert!(cli.args.output_dir.is_none());
        assert!(cli.args.timeout.is_none());
        assert!(!cli.args.verbose);
    }

    #[test]
    fn test_all_flags() {
        let cli = TestCli::parse_from([
            "framestream",
            "clip.mp4",
            "-o",
            "/tmp/out",
            "--output-file",
            "x.csv",
            "--timeout",
            "90",
            "--channel-capacity",
            "8",
            "--flush-every",
            "50",
            "--ffprobe",
            "/opt/ffmpeg/bin/ffprobe",
            "--no-progress",
            "-v",
        ]);
        assert_eq!(cli.args.output_dir, Some(PathBuf::from("/tmp/out")));
        assert_eq!(cli.args.output_file.as_deref(), Some("x.csv"));
        assert_eq!(cli.args.timeout, Some(90));
        assert_eq!(cli.args.channel_capacity, Some(8));
        assert_eq!(cli.args.flush_every, Some(50));
        assert_eq!(cli.args.ffprobe, "/opt/ffmpeg/bin/ffprobe");
        assert!(cli.args.no_progress);
        assert!(cli.args.verbose);
    }

    #[test]
    fn test_missing_input_is_rejected_before_setup() {
        let dir = tempfile::tempdir().unwrap();
        let args = TestCli::parse_from([
            "framestream",
            dir.path().join("absent.mp4").to_str().unwrap(),
        ])
        .args;
        let err = run(args).unwrap_err();
        assert!(matches!(err, CliError::Input(_)));
    }
}
