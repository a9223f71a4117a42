//! CLI argument definitions for the GTFS feed validator.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "gtfs",
    version,
    about = "GTFS feed validator - Check transit feeds against a schema",
    long_about = "Validate a GTFS feed directory against a schema description.\n\n\
                  Reports file, header, field and semantic problems as notices\n\
                  with ERROR, WARNING and INFO severities."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate a feed directory and print a notice summary.
    Validate(ValidateArgs),

    /// Load and verify a schema document, then describe it.
    Schema(SchemaArgs),
}

#[derive(Parser)]
pub struct ValidateArgs {
    /// Directory holding the feed's .txt files.
    #[arg(value_name = "FEED_DIR")]
    pub feed_dir: PathBuf,

    /// Schema document (.json or .toml). Falls back to GTFS_SCHEMA_PATH, then
    /// the bundled schema.
    #[arg(long = "schema", value_name = "PATH")]
    pub schema: Option<PathBuf>,

    /// Reference date for feed expiry checks (default: today).
    #[arg(long = "date", value_name = "YYYY-MM-DD", value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Maximum distance in meters between a stop and its trip's shape.
    #[arg(long = "stop-shape-threshold", value_name = "METERS")]
    pub stop_shape_threshold: Option<f64>,

    /// Write a JSON report to this path.
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Number of sample contexts kept per notice code in the JSON report.
    #[arg(long = "max-samples", value_name = "N", default_value_t = 5)]
    pub max_samples: usize,

    /// Parse files and run rules on a single thread.
    #[arg(long = "sequential")]
    pub sequential: bool,
}

#[derive(Parser)]
pub struct SchemaArgs {
    /// Schema document (.json or .toml). Falls back to GTFS_SCHEMA_PATH, then
    /// the bundled schema.
    #[arg(long = "schema", value_name = "PATH")]
    pub schema: Option<PathBuf>,

    /// Print the schema report as JSON instead of a table.
    #[arg(long = "json")]
    pub json: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|error| format!("expected YYYY-MM-DD: {error}"))
}
