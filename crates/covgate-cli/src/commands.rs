//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use covgate::ReportFormat;
use std::path::PathBuf;

/// Covgate: coverage aggregation and threshold gating
#[derive(Parser, Debug)]
#[command(name = "covgate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarize a coverage payload and gate on thresholds
    ///
    /// Exits with status 1 when a threshold is not met. A payload without
    /// files is reported as a warning and does not fail the gate.
    Check(CheckArgs),

    /// Split the code-transform step of a pipeline into test and source chains
    Partition(PartitionArgs),

    /// Extract the coverage payload embedded in an instrumented bundle
    Extract(ExtractArgs),
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Coverage payload (JSON keyed by file path)
    #[arg(long, required_unless_present = "bundle", conflicts_with = "bundle")]
    pub coverage: Option<PathBuf>,

    /// Instrumented bundle carrying `__coverage__` assignments
    #[arg(long)]
    pub bundle: Option<PathBuf>,

    /// Configuration file (YAML)
    #[arg(short, long, env = "COVGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Minimum line coverage (percent)
    #[arg(long)]
    pub lines: Option<f64>,

    /// Minimum statement coverage (percent)
    #[arg(long)]
    pub statements: Option<f64>,

    /// Minimum function coverage (percent)
    #[arg(long)]
    pub functions: Option<f64>,

    /// Minimum branch coverage (percent)
    #[arg(long)]
    pub branches: Option<f64>,

    /// Structured report to write (repeatable; replaces configured reporters)
    #[arg(long = "reporter", value_name = "FORMAT")]
    pub reporters: Vec<ReportFormat>,

    /// Base directory for reports (written to `<dir>/coverage/`)
    #[arg(long)]
    pub tmp_dir: Option<PathBuf>,
}

/// Arguments for the partition command
#[derive(Parser, Debug)]
pub struct PartitionArgs {
    /// Pipeline description (JSON)
    #[arg(long)]
    pub pipeline: PathBuf,

    /// Configuration file (YAML)
    #[arg(short, long, env = "COVGATE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Arguments for the extract command
#[derive(Parser, Debug)]
pub struct ExtractArgs {
    /// Instrumented bundle
    #[arg(long)]
    pub bundle: PathBuf,

    /// Write the payload here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
