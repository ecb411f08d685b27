use super::text::{DATETIME_FILE, MISSING_SAMPLE, RESERVED_FILES};
use crate::time::{format_timestamp, parse_timestamp};
use anyhow::{Context, Result};
use chrono::Duration;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

pub const DEFAULT_INTERVAL_SECONDS: i64 = 120;

#[derive(Debug, Clone, PartialEq)]
pub struct MaterializeSummary {
    pub features: Vec<String>,
    pub rows: usize,
    pub filled_slots: usize,
}

fn sanitize_file_stem(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            other => other,
        })
        .collect()
}

/// Splits a wide CSV (`datetime,<feature>,...`) into `datetime.txt` plus one
/// `<feature>.txt` per column.
///
/// Missing grid slots between rows are written with their grid timestamps and
/// `None` samples; empty cells are written as `None`.
pub fn materialize(
    csv_path: &Path,
    output_dir: &Path,
    interval_seconds: i64,
) -> Result<MaterializeSummary> {
    if interval_seconds <= 0 {
        anyhow::bail!("interval_seconds must be positive, got {interval_seconds}");
    }
    let interval = Duration::try_seconds(interval_seconds)
        .with_context(|| format!("interval_seconds {interval_seconds} is out of range"))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("failed to read header of {}", csv_path.display()))?
        .clone();
    if headers.len() < 2 {
        anyhow::bail!(
            "{} needs a timestamp column and at least one feature column",
            csv_path.display()
        );
    }

    let features: Vec<String> = headers
        .iter()
        .skip(1)
        .map(sanitize_file_stem)
        .collect();
    if let Some(empty) = features.iter().position(|name| name.is_empty()) {
        anyhow::bail!("feature column {} has an empty header", empty + 2);
    }
    let mut seen = BTreeSet::new();
    for name in &features {
        let file_name = format!("{name}.txt");
        if RESERVED_FILES.contains(&file_name.as_str()) {
            anyhow::bail!("feature column `{name}` would overwrite the layout file {file_name}");
        }
        if !seen.insert(name.as_str()) {
            anyhow::bail!("feature column `{name}` appears more than once");
        }
    }

    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    let open = |name: &str| -> Result<BufWriter<File>> {
        let path = output_dir.join(name);
        let file =
            File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
        Ok(BufWriter::new(file))
    };
    let mut datetime_out = open(DATETIME_FILE)?;
    let mut feature_out: Vec<BufWriter<File>> = features
        .iter()
        .map(|name| open(&format!("{name}.txt")))
        .collect::<Result<_>>()?;

    let mut rows = 0;
    let mut filled_slots = 0;
    let mut previous = None;
    for (line_idx, record) in reader.records().enumerate() {
        let record = record
            .with_context(|| format!("failed to read row {} of {}", line_idx + 2, csv_path.display()))?;
        let raw_ts = record.get(0).unwrap_or_default();
        let ts = parse_timestamp(raw_ts)
            .with_context(|| format!("row {} of {}", line_idx + 2, csv_path.display()))?;

        if let Some(prev) = previous {
            if ts < prev {
                anyhow::bail!(
                    "row {} of {} goes back in time ({} < {})",
                    line_idx + 2,
                    csv_path.display(),
                    format_timestamp(&ts),
                    format_timestamp(&prev)
                );
            }
            let mut slot = prev.checked_add_signed(interval);
            while let Some(gap) = slot.filter(|gap| *gap < ts) {
                writeln!(datetime_out, "{}", format_timestamp(&gap))?;
                for out in feature_out.iter_mut() {
                    writeln!(out, "{MISSING_SAMPLE}")?;
                }
                filled_slots += 1;
                slot = gap.checked_add_signed(interval);
            }
        }

        writeln!(datetime_out, "{}", format_timestamp(&ts))?;
        for (col, out) in feature_out.iter_mut().enumerate() {
            let cell = record.get(col + 1).unwrap_or_default();
            if cell.is_empty() {
                writeln!(out, "{MISSING_SAMPLE}")?;
            } else {
                writeln!(out, "{cell}")?;
            }
        }
        rows += 1;
        previous = Some(ts);
    }

    datetime_out.flush()?;
    for out in feature_out.iter_mut() {
        out.flush()?;
    }

    tracing::info!(
        csv = %csv_path.display(),
        output_dir = %output_dir.display(),
        features = features.len(),
        rows,
        filled_slots,
        "materialized feature series"
    );

    Ok(MaterializeSummary {
        features,
        rows,
        filled_slots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::text::{parse_series, read_lines};

    #[test]
    fn splits_columns_and_fills_grid_gaps() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let csv_path = dir.path().join("export.csv");
        fs::write(
            &csv_path,
            "datetime,voltage,current\n\
             2017-01-01 00:00:00,1.0,5\n\
             2017-01-01 00:02:00,,6\n\
             2017-01-01 00:08:00,3.0,7\n",
        )?;
        let out = dir.path().join("txt");

        let summary = materialize(&csv_path, &out, DEFAULT_INTERVAL_SECONDS)?;
        assert_eq!(summary.features, vec!["voltage", "current"]);
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.filled_slots, 2);

        let datetimes = read_lines(&out.join(DATETIME_FILE))?;
        assert_eq!(
            datetimes,
            vec![
                "2017-01-01 00:00:00",
                "2017-01-01 00:02:00",
                "2017-01-01 00:04:00",
                "2017-01-01 00:06:00",
                "2017-01-01 00:08:00",
            ]
        );

        let voltage = parse_series(&fs::read_to_string(out.join("voltage.txt"))?);
        assert_eq!(voltage.values, vec![1.0, 1.0, 1.0, 1.0, 3.0]);
        let current = parse_series(&fs::read_to_string(out.join("current.txt"))?);
        assert_eq!(current.values, vec![5.0, 6.0, 6.0, 6.0, 7.0]);
        Ok(())
    }

    #[test]
    fn rows_going_back_in_time_are_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let csv_path = dir.path().join("export.csv");
        fs::write(
            &csv_path,
            "datetime,a\n2017-01-01 00:04:00,1\n2017-01-01 00:02:00,2\n",
        )?;
        let err = materialize(&csv_path, &dir.path().join("out"), 120).unwrap_err();
        assert!(err.to_string().contains("goes back in time"));
        Ok(())
    }

    #[test]
    fn header_needs_a_feature_column() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let csv_path = dir.path().join("export.csv");
        fs::write(&csv_path, "datetime\n2017-01-01 00:00:00\n")?;
        assert!(materialize(&csv_path, &dir.path().join("out"), 120).is_err());
        Ok(())
    }

    #[test]
    fn columns_named_after_layout_files_are_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        for header in ["ts,datetime", "ts,abnormities", "ts,voltage,features"] {
            let csv_path = dir.path().join("export.csv");
            fs::write(&csv_path, format!("{header}\n2017-01-01 00:00:00,1,2\n"))?;
            let out = dir.path().join("out");
            let err = materialize(&csv_path, &out, 120).unwrap_err();
            assert!(
                err.to_string().contains("would overwrite the layout file"),
                "{header}: {err}"
            );
            assert!(!out.join(DATETIME_FILE).exists());
        }
        Ok(())
    }

    #[test]
    fn duplicate_columns_are_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let csv_path = dir.path().join("export.csv");
        // Both headers sanitize to `phase_a`.
        fs::write(
            &csv_path,
            "ts,phase_a,phase/a\n2017-01-01 00:00:00,1,2\n",
        )?;
        let err = materialize(&csv_path, &dir.path().join("out"), 120).unwrap_err();
        assert!(err.to_string().contains("appears more than once"));
        Ok(())
    }

    #[test]
    fn oversized_interval_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let csv_path = dir.path().join("export.csv");
        fs::write(
            &csv_path,
            "ts,a\n2017-01-01 00:00:00,1\n2017-01-01 00:02:00,2\n",
        )?;
        let err = materialize(&csv_path, &dir.path().join("out"), i64::MAX).unwrap_err();
        assert!(err.to_string().contains("out of range"));
        Ok(())
    }

    #[test]
    fn interval_wider_than_the_gap_fills_nothing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let csv_path = dir.path().join("export.csv");
        fs::write(
            &csv_path,
            "ts,a\n2017-01-01 00:00:00,1\n2017-01-01 00:02:00,2\n",
        )?;
        let summary = materialize(&csv_path, &dir.path().join("out"), 86_400)?;
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.filled_slots, 0);
        Ok(())
    }

    #[test]
    fn feature_names_are_safe_file_stems() {
        assert_eq!(sanitize_file_stem(" phase a/b "), "phase a_b");
    }
}
