use super::text::{list_feature_files, load_feature_files, FEATURE_LIST_FILE};
use crate::analysis::stats::pearson;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CORRELATION_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionSummary {
    pub kept: Vec<String>,
    pub dropped: Vec<(String, String)>,
    pub output: PathBuf,
}

/// Greedy de-duplication in name order: a candidate is dropped when
/// `|r| > threshold` against any feature already kept.
///
/// Returns the kept names plus `(dropped, kept_partner)` pairs.
pub fn select_features(
    candidates: &BTreeMap<String, Vec<f64>>,
    threshold: f64,
) -> Result<(Vec<String>, Vec<(String, String)>)> {
    if !(0.0..=1.0).contains(&threshold) {
        anyhow::bail!("correlation threshold must be within [0, 1], got {threshold}");
    }

    let mut kept: Vec<(&String, &Vec<f64>)> = Vec::new();
    let mut dropped: Vec<(String, String)> = Vec::new();
    for (name, series) in candidates {
        let partner = kept.iter().find_map(|(kept_name, kept_series)| {
            pearson(kept_series, series)
                .filter(|r| r.abs() > threshold)
                .map(|r| (*kept_name, r))
        });
        match partner {
            Some((partner, r)) => {
                tracing::debug!(feature = %name, partner = %partner, r, "dropping correlated feature");
                dropped.push((name.clone(), partner.clone()));
            }
            None => kept.push((name, series)),
        }
    }

    Ok((
        kept.into_iter().map(|(name, _)| name.clone()).collect(),
        dropped,
    ))
}

pub fn write_feature_list(path: &Path, names: &[String]) -> Result<()> {
    let mut contents = names.join("\n");
    if !contents.is_empty() {
        contents.push('\n');
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

/// Selects among every feature file in `data_dir` and writes the kept file
/// names to `output` (default `<data_dir>/features.txt`).
pub fn run_selection(
    data_dir: &Path,
    output: Option<&Path>,
    threshold: f64,
) -> Result<SelectionSummary> {
    let files = list_feature_files(data_dir)?;
    let candidates = load_feature_files(data_dir, &files)?;
    let (kept, dropped) = select_features(&candidates, threshold)?;

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| data_dir.join(FEATURE_LIST_FILE));
    write_feature_list(&output, &kept)?;

    tracing::info!(
        data_dir = %data_dir.display(),
        candidates = candidates.len(),
        kept = kept.len(),
        dropped = dropped.len(),
        threshold,
        "feature list written"
    );

    Ok(SelectionSummary {
        kept,
        dropped,
        output,
    })
}
