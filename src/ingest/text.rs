use crate::analysis::PipelineInput;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DATETIME_FILE: &str = "datetime.txt";
pub const FEATURE_LIST_FILE: &str = "features.txt";
pub const REFERENCE_FILE: &str = "abnormities.txt";
pub const MISSING_SAMPLE: &str = "None";

pub(crate) const RESERVED_FILES: [&str; 3] = [DATETIME_FILE, FEATURE_LIST_FILE, REFERENCE_FILE];

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSeries {
    pub values: Vec<f64>,
    pub filled: usize,
}

/// One sample per line. Lines that are not finite numbers (e.g. `None`) repeat
/// the previous sample, or `0.0` before the first one. Trailing blank lines are
/// not samples.
pub fn parse_series(contents: &str) -> ParsedSeries {
    let mut lines: Vec<&str> = contents.lines().collect();
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }

    let mut values: Vec<f64> = Vec::with_capacity(lines.len());
    let mut filled = 0;
    for line in lines {
        match line.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => values.push(value),
            _ => {
                values.push(values.last().copied().unwrap_or(0.0));
                filled += 1;
            }
        }
    }
    ParsedSeries { values, filled }
}

pub fn read_series(path: &Path) -> Result<Vec<f64>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let parsed = parse_series(&contents);
    if parsed.filled > 0 {
        tracing::debug!(
            path = %path.display(),
            filled = parsed.filled,
            samples = parsed.values.len(),
            "filled missing samples"
        );
    }
    Ok(parsed.values)
}

/// Trimmed, non-blank lines.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

pub fn feature_name(file_name: &str) -> String {
    file_name
        .strip_suffix(".txt")
        .unwrap_or(file_name)
        .to_string()
}

/// Every regular file in `data_dir` except the reserved layout files, sorted by name.
pub fn list_feature_files(data_dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(data_dir)
        .with_context(|| format!("failed to list {}", data_dir.display()))?;
    let mut names: Vec<String> = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to list {}", data_dir.display()))?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.starts_with('.') || RESERVED_FILES.contains(&name.as_str()) {
            continue;
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}

/// Feature file names from the list file when present, else every data file.
pub fn resolve_feature_files(data_dir: &Path, feature_list: Option<&Path>) -> Result<Vec<String>> {
    let default_list = data_dir.join(FEATURE_LIST_FILE);
    let list_path = match feature_list {
        Some(path) => Some(path.to_path_buf()),
        None => Some(default_list).filter(|path| path.exists()),
    };
    match list_path {
        Some(path) => read_lines(&path),
        None => list_feature_files(data_dir),
    }
}

/// Loads series keyed by file name.
pub fn load_feature_files(
    data_dir: &Path,
    file_names: &[String],
) -> Result<BTreeMap<String, Vec<f64>>> {
    let mut series = BTreeMap::new();
    for file_name in file_names {
        let values = read_series(&data_dir.join(file_name))?;
        series.insert(file_name.clone(), values);
    }
    Ok(series)
}

pub fn load_input(
    data_dir: &Path,
    feature_list: Option<&Path>,
    references: Option<&Path>,
) -> Result<PipelineInput> {
    let file_names = resolve_feature_files(data_dir, feature_list)?;
    let mut features: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut sources: BTreeMap<String, String> = BTreeMap::new();
    for (file_name, values) in load_feature_files(data_dir, &file_names)? {
        let name = feature_name(&file_name);
        if let Some(previous) = sources.insert(name.clone(), file_name.clone()) {
            anyhow::bail!("feature files {previous} and {file_name} both map to feature `{name}`");
        }
        features.insert(name, values);
    }

    let timestamps = read_lines(&data_dir.join(DATETIME_FILE))?;
    let reference_path: PathBuf = references
        .map(Path::to_path_buf)
        .unwrap_or_else(|| data_dir.join(REFERENCE_FILE));
    let references = read_lines(&reference_path)?;

    tracing::info!(
        data_dir = %data_dir.display(),
        features = file_names.len(),
        steps = timestamps.len(),
        references = references.len(),
        "loaded telemetry"
    );

    Ok(PipelineInput {
        features,
        timestamps,
        references,
    })
}
