use anomaly_dates::analysis;
use anomaly_dates::analysis::stats::z_value_for_alpha;
use anomaly_dates::cli::{Cli, Commands, MaterializeArgs, RankArgs, SelectFeaturesArgs};
use anomaly_dates::config::AnalysisConfig;
use anomaly_dates::ingest::{selection, table, text};
use anyhow::{Context, Result};
use clap::Parser;
use std::fs;

fn rank_config(args: &RankArgs) -> Result<AnalysisConfig> {
    let mut config = AnalysisConfig::load(args.config.as_deref())?;
    if let Some(phi) = args.phi {
        config.phi = phi;
    }
    if let Some(alpha) = args.alpha {
        config.phi = z_value_for_alpha(alpha)
            .with_context(|| format!("--alpha must be within (0, 1), got {alpha}"))?;
    }
    if let Some(top_n) = args.top_n {
        config.top_n = top_n;
    }
    if let Some(decay) = args.decay_seconds {
        config.decay_half_life_seconds = decay;
    }
    Ok(config)
}

fn rank(args: RankArgs) -> Result<()> {
    let config = rank_config(&args)?;
    let input = text::load_input(
        &args.data_dir,
        args.features.as_deref(),
        args.references.as_deref(),
    )?;
    let report = analysis::run(&input, &config)
        .with_context(|| format!("anomaly ranking failed for {}", args.data_dir.display()))?;

    for date in report.ranked_dates() {
        println!("{date}");
    }

    if let Some(path) = args.report_json.as_ref() {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "run report written");
    }
    Ok(())
}

fn select_features(args: SelectFeaturesArgs) -> Result<()> {
    let summary = selection::run_selection(&args.data_dir, args.output.as_deref(), args.threshold)?;
    for (feature, partner) in &summary.dropped {
        tracing::info!(feature = %feature, partner = %partner, "dropped correlated feature");
    }
    println!("{}", summary.output.display());
    Ok(())
}

fn materialize(args: MaterializeArgs) -> Result<()> {
    let summary = table::materialize(&args.csv, &args.output_dir, args.interval_seconds)?;
    if summary.filled_slots > 0 {
        tracing::warn!(
            filled_slots = summary.filled_slots,
            "grid gaps were written as missing samples"
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Rank(args) => rank(args),
        Commands::SelectFeatures(args) => select_features(args),
        Commands::Materialize(args) => materialize(args),
    }
}
