use crate::ingest::selection::DEFAULT_CORRELATION_THRESHOLD;
use crate::ingest::table::DEFAULT_INTERVAL_SECONDS;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "anomaly-dates",
    version,
    about = "Rank calendar dates by weighted per-feature anomaly detections"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect, score and rank dates; prints one date per line.
    Rank(RankArgs),
    /// Write a feature list with highly correlated features removed.
    SelectFeatures(SelectFeaturesArgs),
    /// Split a wide CSV export into per-feature text files.
    Materialize(MaterializeArgs),
}

#[derive(Args, Debug)]
pub struct RankArgs {
    /// Directory holding datetime.txt and the per-feature files.
    #[arg(long)]
    pub data_dir: PathBuf,
    /// Feature list (defaults to <data-dir>/features.txt, else every data file).
    #[arg(long)]
    pub features: Option<PathBuf>,
    /// Reference anomaly timestamps (defaults to <data-dir>/abnormities.txt).
    #[arg(long)]
    pub references: Option<PathBuf>,
    /// Band multiplier phi.
    #[arg(long, conflicts_with = "alpha")]
    pub phi: Option<f64>,
    /// Two-sided significance level; sets phi to the matching normal quantile.
    #[arg(long)]
    pub alpha: Option<f64>,
    #[arg(long)]
    pub top_n: Option<usize>,
    /// Scale (seconds) of the exp(-dt/scale) delay weight.
    #[arg(long)]
    pub decay_seconds: Option<f64>,
    /// JSON config file (overrides ANOMALY_CONFIG_PATH).
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Write the full run report as JSON.
    #[arg(long)]
    pub report_json: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SelectFeaturesArgs {
    #[arg(long)]
    pub data_dir: PathBuf,
    /// Output list (defaults to <data-dir>/features.txt).
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Drop a feature when |pearson r| against a kept one exceeds this.
    #[arg(long, default_value_t = DEFAULT_CORRELATION_THRESHOLD)]
    pub threshold: f64,
}

#[derive(Args, Debug)]
pub struct MaterializeArgs {
    /// CSV with a timestamp column followed by one column per feature.
    #[arg(long)]
    pub csv: PathBuf,
    #[arg(long)]
    pub output_dir: PathBuf,
    /// Sampling grid used to fill gaps between rows.
    #[arg(long, default_value_t = DEFAULT_INTERVAL_SECONDS)]
    pub interval_seconds: i64,
}
