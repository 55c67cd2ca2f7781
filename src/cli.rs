//! Command-line interface components.

pub mod commands;

use crate::config::AppConfig;
use crate::error::Result;
use crate::models::BoundaryPolicy;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "popdata")]
#[command(about = "Clean statistical text exports into CSV and summarise them")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file (TOML format)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only show errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Strip header and footer from text exports and save them as CSV
    Extract(ExtractArgs),
    /// Append row-wise mean, maximum, and minimum columns to a cleaned CSV
    Stats(StatsArgs),
    /// Show each row's share of the trailing-window average
    Distribution(SeriesArgs),
    /// Show one row's values across the trailing window
    Trend(TrendArgs),
    /// Print the operation catalog, or the full prompt for a query
    Tools(ToolsArgs),
    /// Execute the operations named in a model response
    Dispatch(DispatchArgs),
}

/// Boundary policy as accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Drop lines starting with a column label (database, indicator, time)
    Label,
    /// Start at the first line starting with a region name, keep it, copy lines verbatim
    Region,
}

impl From<PolicyArg> for BoundaryPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Label => BoundaryPolicy::LabelPrefix,
            PolicyArg::Region => BoundaryPolicy::RegionPrefix,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct ExtractArgs {
    /// Source text exports; directories contribute their *.txt files
    #[arg(value_name = "SOURCE", required = true)]
    pub sources: Vec<PathBuf>,

    /// Output CSV (single source only; defaults to <stem>_cleaned.csv)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Boundary detection policy
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,

    /// Header label prefix (repeatable; replaces the configured set)
    #[arg(long = "header-prefix", value_name = "PREFIX")]
    pub header_prefixes: Vec<String>,

    /// Region label prefix (repeatable; replaces the configured set)
    #[arg(long = "region", value_name = "PREFIX")]
    pub regions: Vec<String>,

    /// Leading text of footnote lines
    #[arg(long, value_name = "MARKER")]
    pub footer_marker: Option<String>,

    /// Write empty body lines instead of dropping them
    #[arg(long)]
    pub keep_blank_lines: bool,

    /// Do not write a UTF-8 BOM
    #[arg(long)]
    pub no_bom: bool,
}

#[derive(clap::Args, Debug)]
pub struct StatsArgs {
    /// Cleaned CSV produced by `extract`
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    /// Output CSV (defaults to <stem>_stats.csv)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Do not write a UTF-8 BOM
    #[arg(long)]
    pub no_bom: bool,
}

#[derive(clap::Args, Debug)]
pub struct SeriesArgs {
    /// Cleaned CSV produced by `extract`
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    /// Number of trailing value columns
    #[arg(short, long, value_name = "N")]
    pub window: Option<usize>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug)]
pub struct TrendArgs {
    #[command(flatten)]
    pub series: SeriesArgs,

    /// Row label to follow, e.g. 浙江省
    #[arg(value_name = "LABEL")]
    pub label: String,
}

#[derive(clap::Args, Debug)]
pub struct ToolsArgs {
    /// Render the full prompt for this query instead of the bare catalog
    #[arg(long, value_name = "TEXT")]
    pub query: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct DispatchArgs {
    /// Ask the generate endpoint which operations answer this query
    #[arg(long, value_name = "TEXT", conflicts_with = "response")]
    pub query: Option<String>,

    /// File holding a saved model response (reads stdin if neither this nor --query is given)
    #[arg(short, long, value_name = "FILE")]
    pub response: Option<PathBuf>,

    /// Generate endpoint URL
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Model name sent with the query
    #[arg(long, value_name = "NAME")]
    pub model: Option<String>,

    /// Directory operation file names are resolved against
    #[arg(long, value_name = "DIR")]
    pub assets_dir: Option<PathBuf>,
}

impl Args {
    /// Log level implied by -v / -q
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Load configuration from file or defaults
    pub fn load_config(&self) -> Result<AppConfig> {
        AppConfig::load(self.config.as_deref())
    }
}

impl ExtractArgs {
    /// Overlay command-line overrides onto the configured extractor settings
    pub fn apply(&self, config: &mut AppConfig) {
        let mut extractor = config.extractor.clone();
        if let Some(policy) = self.policy {
            extractor = extractor.with_policy(policy.into());
        }
        if !self.header_prefixes.is_empty() {
            extractor = extractor.with_header_labels(self.header_prefixes.iter().cloned());
        }
        if !self.regions.is_empty() {
            extractor = extractor.with_region_labels(self.regions.iter().cloned());
        }
        if let Some(marker) = &self.footer_marker {
            extractor = extractor.with_footer_marker(marker.clone());
        }
        if self.keep_blank_lines {
            extractor = extractor.with_skip_blank_lines(false);
        }
        if self.no_bom {
            extractor = extractor.with_bom(false);
        }
        config.extractor = extractor;
    }
}
