//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use deid_core::MetricKind;

#[derive(Parser)]
#[command(
    name = "deid",
    version,
    about = "Find the optimal anonymizing generalization of a dataset",
    long_about = "Search the lattice of full-domain generalizations of an encoded dataset\n\
                  for the anonymous transformation with the lowest information loss.\n\
                  Supports k-anonymity and d-presence with record suppression."
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
    /// Search a problem file for its optimal transformation.
    Search(SearchArgs),

    /// List the available information-loss metrics.
    Metrics,
}

#[derive(Parser)]
pub struct SearchArgs {
    /// JSON problem file: dictionary, data, hierarchies and config.
    #[arg(value_name = "PROBLEM")]
    pub problem: PathBuf,

    /// Information-loss metric to minimize.
    #[arg(long = "metric", value_enum, default_value = "entropy")]
    pub metric: MetricArg,

    /// Budget of nodes shown around the optimum.
    #[arg(long = "max-visible", value_name = "N", default_value_t = 100)]
    pub max_visible: usize,

    /// Stop after this many checks (overrides the problem's config).
    #[arg(long = "max-checks", value_name = "N")]
    pub max_checks: Option<usize>,

    /// Disable grouping from retained snapshots.
    #[arg(long = "no-snapshots")]
    pub no_snapshots: bool,

    /// Report format written to stdout.
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: OutputFormatArg,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MetricArg {
    Entropy,
    Discernability,
    Height,
    Precision,
    Aecs,
}

impl From<MetricArg> for MetricKind {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Entropy => MetricKind::Entropy,
            MetricArg::Discernability => MetricKind::Discernability,
            MetricArg::Height => MetricKind::Height,
            MetricArg::Precision => MetricKind::Precision,
            MetricArg::Aecs => MetricKind::AverageClassSize,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormatArg {
    Table,
    Json,
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
