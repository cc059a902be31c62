//! CLI argument parsing for lapsync

use crate::binning::AssignMode;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for counts and proportions
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// CSV with a header row (default)
    Csv,
    /// JSON format for machine parsing
    Json,
}

/// How emotion proportions are grouped
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupBy {
    /// Baseline plus one group per incident flag
    Event,
    /// One row per (race, lap)
    Lap,
}

#[derive(Parser, Debug)]
#[command(name = "lapsync")]
#[command(version)]
#[command(about = "Align F1 race laps with timestamped community reactions", long_about = None)]
pub struct Cli {
    /// TOML file naming the input columns (defaults apply when absent)
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a lap table from per-driver timing rows
    Laps {
        #[arg(long, value_name = "FILE")]
        telemetry: PathBuf,

        /// Keep only this driver's laps instead of averaging all drivers
        #[arg(long, value_name = "ID")]
        driver: Option<String>,

        /// Shift every lap boundary by this many seconds (broadcast delay)
        #[arg(long = "shift-secs", value_name = "N", allow_hyphen_values = true)]
        shift_secs: Option<f64>,

        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Assign every event to a lap
    Assign {
        #[arg(long, value_name = "FILE")]
        laps: PathBuf,

        #[arg(long, value_name = "FILE")]
        events: PathBuf,

        #[arg(long, value_enum)]
        mode: Option<AssignMode>,

        /// Width of the before/after race buckets in seconds
        #[arg(long = "margin-secs", value_name = "N")]
        margin_secs: Option<i64>,

        /// Fail on events outside the margin instead of using sentinels
        #[arg(long = "reject-outside-margin")]
        reject_outside_margin: bool,

        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Count events per lap bucket
    Counts {
        #[arg(long, value_name = "FILE")]
        laps: PathBuf,

        #[arg(long, value_name = "FILE")]
        events: PathBuf,

        #[arg(long = "format", value_enum, default_value = "csv")]
        format: OutputFormat,

        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Attach lap start/end to logged incidents
    Windows {
        #[arg(long, value_name = "FILE")]
        laps: PathBuf,

        #[arg(long, value_name = "FILE")]
        incidents: PathBuf,

        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Score posts against a slang lexicon in fixed time windows
    Toxicity {
        #[arg(long, value_name = "FILE")]
        posts: PathBuf,

        #[arg(long, value_name = "FILE")]
        lexicon: PathBuf,

        #[arg(long = "window-secs", value_name = "N")]
        window_secs: Option<i64>,

        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Comment volume, gap and length per (race, lap)
    Activity {
        #[arg(long, value_name = "FILE")]
        comments: PathBuf,

        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Add incident flags and an event marker to comments
    JoinEvents {
        #[arg(long, value_name = "FILE")]
        comments: PathBuf,

        #[arg(long, value_name = "FILE")]
        incidents: PathBuf,

        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Emotion label proportions per event group or per lap
    Emotion {
        #[arg(long, value_name = "FILE")]
        input: PathBuf,

        #[arg(long = "group-by", value_enum, default_value = "event")]
        group_by: GroupBy,

        #[arg(long = "format", value_enum, default_value = "csv")]
        format: OutputFormat,

        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: Option<PathBuf>,
    },
}
