//! CLI argument definitions for `icu-horizon`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use horizon_model::OutcomeKind;

#[derive(Parser)]
#[command(
    name = "icu-horizon",
    version,
    about = "Fixed-horizon ICU snapshots with censored outcomes",
    long_about = "Turn ICU event streams into per-horizon snapshot tables with \
                  right-censored outcome labels, split them, and prepare \
                  leakage-safe model inputs with a cached fit/apply pipeline."
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

    /// Log output format (pretty for humans, json for machine parsing).
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build one snapshot table per horizon from the raw input tables.
    Extract(ExtractArgs),

    /// Split a horizon table into seeded train/test partitions.
    Split(SplitArgs),

    /// Fit the preparation pipeline and cache the prepared partitions.
    Prepare(PrepareArgs),
}

/// Settings shared by every subcommand; flags override the config file.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// TOML configuration file (defaults are used when absent).
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Seed for the splitter and the hot-deck imputer.
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Cohort prefix used in output and cache names.
    #[arg(long = "prefix", value_name = "NAME")]
    pub prefix: Option<String>,
}

#[derive(Parser)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Wide event rows: encounter_id, time_offset, variables.
    #[arg(long = "wide", value_name = "CSV")]
    pub wide: PathBuf,

    /// Encounters: encounter_id, patient_id, admission_offset, discharge_offset.
    #[arg(long = "encounters", value_name = "CSV")]
    pub encounters: PathBuf,

    /// Events: encounter_id, event_offset, event_type_tag.
    #[arg(long = "events", value_name = "CSV")]
    pub events: PathBuf,

    /// Directory for the per-horizon CSV files.
    #[arg(long = "output-dir", value_name = "DIR", default_value = "horizons")]
    pub output_dir: PathBuf,

    /// Horizons in days, comma separated (e.g. 0,1,2).
    #[arg(long = "horizons", value_delimiter = ',')]
    pub horizons: Vec<u32>,
}

#[derive(Parser)]
pub struct SplitArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Horizon table to split.
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    /// Output directory (default: next to the input).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Fraction of rows in the training partition.
    #[arg(long = "train-fraction")]
    pub train_fraction: Option<f64>,

    /// Drop rows younger than this age before splitting.
    #[arg(long = "min-age")]
    pub min_age: Option<f64>,

    /// Shuffle without splitting, for an external validation cohort.
    #[arg(long = "external")]
    pub external: bool,
}

#[derive(Parser)]
pub struct PrepareArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Training partition of one horizon table.
    #[arg(long = "train", value_name = "CSV")]
    pub train: PathBuf,

    /// Held-out partition as NAME=CSV; repeat for several.
    #[arg(long = "held-out", value_name = "NAME=CSV", value_parser = parse_held_out)]
    pub held_out: Vec<(String, PathBuf)>,

    /// Horizon (in days) the tables were built for.
    #[arg(long = "horizon")]
    pub horizon: u32,

    /// Outcome to model (death, vasopressor, ventilator).
    #[arg(long = "outcome")]
    pub outcome: Option<OutcomeKind>,

    /// Imputation strategy for missing feature values.
    #[arg(long = "imputer", value_enum)]
    pub imputer: Option<ImputerArg>,

    /// Cache directory for prepared bundles.
    #[arg(long = "cache-dir", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Recompute even when a valid cached bundle exists.
    #[arg(long = "force")]
    pub force: bool,
}

fn parse_held_out(value: &str) -> Result<(String, PathBuf), String> {
    match value.split_once('=') {
        Some((name, path)) if !name.trim().is_empty() && !path.trim().is_empty() => {
            Ok((name.trim().to_string(), PathBuf::from(path.trim())))
        }
        _ => Err(format!("expected NAME=CSV, got '{value}'")),
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ImputerArg {
    Median,
    Mean,
    HotDeck,
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
