use super::stats::population_moments;
use crate::error::{AnalysisError, AnalysisResult};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

pub const DEFAULT_PHI: f64 = 1.96;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResidualBand {
    pub mean: f64,
    pub std_dev: f64,
    pub lower: f64,
    pub upper: f64,
}

impl ResidualBand {
    pub fn contains(&self, residual: f64) -> bool {
        residual >= self.lower && residual <= self.upper
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureDetection {
    pub band: ResidualBand,
    /// Strictly increasing residual indices in `[0, L-2]`.
    pub indices: Vec<usize>,
    pub residual_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFailure {
    pub feature: String,
    pub error: AnalysisError,
}

#[derive(Debug, Clone, Default)]
pub struct DetectionOutcome {
    pub detections: BTreeMap<String, FeatureDetection>,
    pub failures: Vec<FeatureFailure>,
}

pub fn validate_phi(phi: f64) -> AnalysisResult<()> {
    if !phi.is_finite() || phi <= 0.0 {
        return Err(AnalysisError::InvalidParameter {
            name: "phi",
            reason: format!("must be a positive finite number, got {phi}"),
        });
    }
    Ok(())
}

pub fn residuals(series: &[f64]) -> Vec<f64> {
    series.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

/// Band over the whole residual series, anomalies included.
pub fn residual_band(residuals: &[f64], phi: f64) -> Option<ResidualBand> {
    let (mean, std_dev) = population_moments(residuals)?;
    Some(ResidualBand {
        mean,
        std_dev,
        lower: mean - phi * std_dev,
        upper: mean + phi * std_dev,
    })
}

pub fn detect_feature(series: &[f64], phi: f64) -> AnalysisResult<FeatureDetection> {
    validate_phi(phi)?;
    if series.len() < 2 {
        return Err(AnalysisError::InsufficientData {
            samples: series.len(),
        });
    }
    if let Some(index) = series.iter().position(|v| !v.is_finite()) {
        return Err(AnalysisError::NonFiniteSample { index });
    }

    let res = residuals(series);
    let band = residual_band(&res, phi).ok_or(AnalysisError::InsufficientData {
        samples: series.len(),
    })?;
    let indices = res
        .iter()
        .enumerate()
        .filter(|(_, value)| !band.contains(**value))
        .map(|(idx, _)| idx)
        .collect();

    Ok(FeatureDetection {
        band,
        indices,
        residual_count: res.len(),
    })
}

/// Runs the detector over every feature independently.
///
/// Per-feature failures are collected rather than raised; an invalid `phi`
/// fails the whole call.
pub fn detect_features(
    features: &BTreeMap<String, Vec<f64>>,
    phi: f64,
) -> AnalysisResult<DetectionOutcome> {
    validate_phi(phi)?;

    let ordered: Vec<(&String, &Vec<f64>)> = features.iter().collect();
    let results: Vec<(&String, AnalysisResult<FeatureDetection>)> = ordered
        .par_iter()
        .map(|(name, series)| (*name, detect_feature(series, phi)))
        .collect();

    let mut outcome = DetectionOutcome::default();
    for (name, result) in results {
        match result {
            Ok(detection) => {
                tracing::debug!(
                    feature = %name,
                    anomalies = detection.indices.len(),
                    mean = detection.band.mean,
                    std_dev = detection.band.std_dev,
                    "feature residual band computed"
                );
                outcome.detections.insert(name.clone(), detection);
            }
            Err(error) => outcome.failures.push(FeatureFailure {
                feature: name.clone(),
                error,
            }),
        }
    }
    Ok(outcome)
}
