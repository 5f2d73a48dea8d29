//! FrameStream CLI - Command-line interface
//!
//! Streams per-frame measurements of a video into a CSV report.

mod commands;
mod error;
mod progress;
mod runner;

use clap::{Parser, Subcommand};
use console::style;

use commands::analyze::AnalyzeArgs;
use commands::config::ConfigCommands;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "framestream")]
#[command(version = framestream::VERSION)]
#[command(about = "Per-frame size and type reports for video files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a per-frame CSV report for a video file
    Analyze(AnalyzeArgs),

    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Analyze(args) => commands::analyze::run(args),
        Commands::Config { command } => commands::config::run(command),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        let code = e.exit_code();
        eprintln!("{} {}", style("error:").red().bold(), e);
        std::process::exit(code);
    }
}
