use super::aggregation::{feature_weight, weighted_count};
use super::alignment::{detection_timestamps, ensure_sorted};
use super::detection::{detect_features, FeatureFailure, ResidualBand};
use super::ranking::{rank_dates, RankedDate};
use super::scoring::{score_feature, FeatureScore};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::time::{ensure_non_decreasing, epoch_seconds, parse_timestamps};
use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;

/// Everything a run consumes, already loaded.
#[derive(Debug, Clone, Default)]
pub struct PipelineInput {
    pub features: BTreeMap<String, Vec<f64>>,
    pub timestamps: Vec<String>,
    pub references: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSummary {
    pub feature: String,
    pub band: ResidualBand,
    pub anomaly_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<FeatureScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFeature {
    pub feature: String,
    pub code: &'static str,
    pub message: String,
}

impl From<FeatureFailure> for SkippedFeature {
    fn from(failure: FeatureFailure) -> Self {
        Self {
            code: failure.error.code(),
            message: failure.error.to_string(),
            feature: failure.feature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub config: AnalysisConfig,
    pub step_count: usize,
    pub reference_count: usize,
    pub features: Vec<FeatureSummary>,
    pub skipped: Vec<SkippedFeature>,
    pub ranked: Vec<RankedDate>,
    #[serde(skip)]
    pub step_scores: Vec<f64>,
}

impl RunReport {
    pub fn ranked_dates(&self) -> Vec<String> {
        self.ranked.iter().map(RankedDate::date_string).collect()
    }
}

fn validate_lengths(
    features: &BTreeMap<String, Vec<f64>>,
    step_count: usize,
) -> AnalysisResult<()> {
    for (feature, series) in features {
        if series.len() != step_count {
            return Err(AnalysisError::MismatchedLength {
                feature: feature.clone(),
                expected: step_count,
                actual: series.len(),
            });
        }
    }
    Ok(())
}

fn parse_reference(references: &[String]) -> AnalysisResult<Vec<i64>> {
    let parsed = parse_timestamps(references)?;
    let epochs: Vec<i64> = parsed.iter().map(epoch_seconds).collect();
    ensure_sorted(&epochs)?;
    Ok(epochs)
}

/// Detects, scores, aggregates and ranks.
///
/// Global precondition failures abort with an error; per-feature failures are
/// logged, listed under `skipped` and leave the rest of the run intact.
pub fn run(input: &PipelineInput, config: &AnalysisConfig) -> AnalysisResult<RunReport> {
    config.validate()?;
    let decay = config.decay()?;
    let started = Instant::now();

    let timestamps: Vec<NaiveDateTime> = parse_timestamps(&input.timestamps)?;
    ensure_non_decreasing(&timestamps)?;
    let reference = parse_reference(&input.references)?;
    let step_count = timestamps.len();
    validate_lengths(&input.features, step_count)?;

    tracing::info!(
        phase = "start",
        feature_count = input.features.len(),
        step_count,
        reference_count = reference.len(),
        phi = config.phi,
        "anomaly ranking started"
    );

    let detection = detect_features(&input.features, config.phi)?;
    let mut skipped: Vec<SkippedFeature> = Vec::new();
    for failure in detection.failures {
        tracing::warn!(
            feature = %failure.feature,
            error = %failure.error,
            "dropping feature from aggregation"
        );
        skipped.push(failure.into());
    }
    tracing::info!(
        phase = "detect",
        detected = detection.detections.len(),
        skipped = skipped.len(),
        duration_ms = started.elapsed().as_millis() as u64,
        "residual bands computed"
    );

    let ordered: Vec<(&String, &Vec<usize>)> = detection
        .detections
        .iter()
        .map(|(name, detected)| (name, &detected.indices))
        .collect();
    let scored: Vec<(&String, AnalysisResult<FeatureScore>)> = ordered
        .par_iter()
        .map(|(name, indices)| {
            let result = detection_timestamps(indices, &timestamps)
                .and_then(|detected| score_feature(&detected, &reference, &decay));
            (*name, result)
        })
        .collect();

    let mut scores: BTreeMap<String, FeatureScore> = BTreeMap::new();
    for (name, result) in scored {
        match result {
            Ok(score) => {
                scores.insert(name.clone(), score);
            }
            Err(error) if error.is_feature_local() => {
                tracing::warn!(
                    feature = %name,
                    error = %error,
                    "dropping feature from aggregation"
                );
                skipped.push(SkippedFeature::from(FeatureFailure {
                    feature: name.clone(),
                    error,
                }));
            }
            Err(error) => return Err(error),
        }
    }
    tracing::info!(
        phase = "score",
        scored = scores.len(),
        duration_ms = started.elapsed().as_millis() as u64,
        "adjusted F1 computed"
    );

    let anomalies: BTreeMap<String, Vec<usize>> = detection
        .detections
        .iter()
        .filter(|(name, _)| scores.contains_key(*name))
        .map(|(name, detected)| (name.clone(), detected.indices.clone()))
        .collect();
    let step_scores = weighted_count(&anomalies, &scores, step_count)?;
    let ranked = rank_dates(&step_scores, &timestamps, config.top_n);

    let features: Vec<FeatureSummary> = detection
        .detections
        .into_iter()
        .map(|(feature, detected)| {
            let score = scores.get(&feature).copied();
            let anomaly_count = detected.indices.len();
            FeatureSummary {
                weight: score.map(|s| feature_weight(s.adj_f1, anomaly_count)),
                score,
                anomaly_count,
                band: detected.band,
                feature,
            }
        })
        .collect();

    tracing::info!(
        phase = "rank",
        ranked_dates = ranked.len(),
        duration_ms = started.elapsed().as_millis() as u64,
        "anomaly ranking completed"
    );

    Ok(RunReport {
        config: *config,
        step_count,
        reference_count: reference.len(),
        features,
        skipped,
        ranked,
        step_scores,
    })
}
