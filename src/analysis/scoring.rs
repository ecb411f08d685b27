use super::alignment::{delay_to_detection, delay_to_reference};
use crate::error::{AnalysisError, AnalysisResult};
use serde::Serialize;

pub const DEFAULT_DECAY_SECONDS: f64 = 86_400.0;

/// `w(dt) = exp(-dt / scale_seconds)`, with `w(+inf) = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayWeight {
    pub scale_seconds: f64,
}

impl Default for DecayWeight {
    fn default() -> Self {
        Self {
            scale_seconds: DEFAULT_DECAY_SECONDS,
        }
    }
}

impl DecayWeight {
    pub fn new(scale_seconds: f64) -> AnalysisResult<Self> {
        if !scale_seconds.is_finite() || scale_seconds <= 0.0 {
            return Err(AnalysisError::InvalidParameter {
                name: "decay_half_life_seconds",
                reason: format!("must be a positive finite number, got {scale_seconds}"),
            });
        }
        Ok(Self { scale_seconds })
    }

    pub fn weight(&self, delay_seconds: f64) -> f64 {
        if delay_seconds.is_infinite() {
            return 0.0;
        }
        (-delay_seconds / self.scale_seconds).exp()
    }

    fn mean_weight(&self, delays: &[f64]) -> f64 {
        let sum: f64 = delays.iter().map(|d| self.weight(*d)).sum();
        sum / (delays.len() as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureScore {
    pub adj_precision: f64,
    pub adj_recall: f64,
    pub adj_f1: f64,
}

/// Mean decay weight of each reference event's lag behind the latest prior detection.
pub fn adj_precision(
    detected: &[i64],
    reference: &[i64],
    decay: &DecayWeight,
) -> AnalysisResult<f64> {
    if detected.is_empty() || reference.is_empty() {
        return Err(AnalysisError::NoAnomalies);
    }
    Ok(decay.mean_weight(&delay_to_detection(detected, reference)))
}

/// Mean decay weight of each detection's lead ahead of the next reference event.
pub fn adj_recall(
    detected: &[i64],
    reference: &[i64],
    decay: &DecayWeight,
) -> AnalysisResult<f64> {
    if detected.is_empty() || reference.is_empty() {
        return Err(AnalysisError::NoAnomalies);
    }
    Ok(decay.mean_weight(&delay_to_reference(detected, reference)))
}

pub fn score_feature(
    detected: &[i64],
    reference: &[i64],
    decay: &DecayWeight,
) -> AnalysisResult<FeatureScore> {
    let adj_precision = adj_precision(detected, reference, decay)?;
    let adj_recall = adj_recall(detected, reference, decay)?;
    if adj_precision <= 0.0 || adj_recall <= 0.0 {
        return Err(AnalysisError::NoMatchedAnomalies {
            precision: adj_precision,
            recall: adj_recall,
        });
    }
    let adj_f1 = 2.0 / (1.0 / adj_precision + 1.0 / adj_recall);
    Ok(FeatureScore {
        adj_precision,
        adj_recall,
        adj_f1,
    })
}
