use super::scoring::FeatureScore;
use crate::error::{AnalysisError, AnalysisResult};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Per-firing weight: `adj_f1 / ln(1 + count)`, so chatty features count less per firing.
pub fn feature_weight(adj_f1: f64, anomaly_count: usize) -> f64 {
    adj_f1 / (1.0 + anomaly_count as f64).ln()
}

/// Number of score slots for `step_count` samples (one per residual).
pub fn score_len(step_count: usize) -> usize {
    step_count.saturating_sub(1)
}

/// Builds the per-step importance vector of length `step_count - 1`.
///
/// Weights are computed per feature in parallel; the additive reduction runs in
/// feature-name order so repeated runs produce identical sums.
pub fn weighted_count(
    anomalies: &BTreeMap<String, Vec<usize>>,
    scores: &BTreeMap<String, FeatureScore>,
    step_count: usize,
) -> AnalysisResult<Vec<f64>> {
    let len = score_len(step_count);

    let active: Vec<(&String, &Vec<usize>)> = anomalies
        .iter()
        .filter(|(_, indices)| !indices.is_empty())
        .collect();

    let contributions: Vec<(f64, &Vec<usize>)> = active
        .par_iter()
        .map(|(feature, indices)| {
            let score = scores
                .get(*feature)
                .ok_or_else(|| AnalysisError::MissingFeatureScore {
                    feature: (*feature).clone(),
                })?;
            if let Some(&index) = indices.iter().find(|&&index| index >= len) {
                return Err(AnalysisError::IndexOutOfRange { index, len });
            }
            Ok((feature_weight(score.adj_f1, indices.len()), *indices))
        })
        .collect::<AnalysisResult<Vec<_>>>()?;

    let mut count = vec![0.0; len];
    for (weight, indices) in contributions {
        for &index in indices {
            count[index] += weight;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(adj_f1: f64) -> FeatureScore {
        FeatureScore {
            adj_precision: adj_f1,
            adj_recall: adj_f1,
            adj_f1,
        }
    }

    #[test]
    fn weight_shrinks_with_anomaly_count() {
        assert!((feature_weight(1.0, 1) - 1.0 / 2.0_f64.ln()).abs() < 1e-12);
        assert!(feature_weight(1.0, 10) < feature_weight(1.0, 2));
    }

    #[test]
    fn total_mass_is_weight_times_count() {
        let mut anomalies = BTreeMap::new();
        anomalies.insert("a".to_string(), vec![0, 3, 4]);
        anomalies.insert("b".to_string(), vec![3]);
        let mut scores = BTreeMap::new();
        scores.insert("a".to_string(), score(0.6));
        scores.insert("b".to_string(), score(0.9));

        let count = weighted_count(&anomalies, &scores, 6).expect("count");
        assert_eq!(count.len(), 5);

        let expected = feature_weight(0.6, 3) * 3.0 + feature_weight(0.9, 1);
        let total: f64 = count.iter().sum();
        assert!((total - expected).abs() < 1e-12);
        assert!((count[3] - (feature_weight(0.6, 3) + feature_weight(0.9, 1))).abs() < 1e-12);
        assert_eq!(count[1], 0.0);
        assert_eq!(count[2], 0.0);
    }

    #[test]
    fn empty_features_are_never_looked_up() {
        let mut anomalies = BTreeMap::new();
        anomalies.insert("quiet".to_string(), Vec::new());
        let count = weighted_count(&anomalies, &BTreeMap::new(), 4).expect("count");
        assert_eq!(count, vec![0.0; 3]);
    }

    #[test]
    fn unscored_feature_with_detections_is_an_error() {
        let mut anomalies = BTreeMap::new();
        anomalies.insert("loud".to_string(), vec![1]);
        assert_eq!(
            weighted_count(&anomalies, &BTreeMap::new(), 4),
            Err(AnalysisError::MissingFeatureScore {
                feature: "loud".to_string()
            })
        );
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut anomalies = BTreeMap::new();
        anomalies.insert("a".to_string(), vec![0, 3]);
        let mut scores = BTreeMap::new();
        scores.insert("a".to_string(), score(1.0));
        assert_eq!(
            weighted_count(&anomalies, &scores, 4),
            Err(AnalysisError::IndexOutOfRange { index: 3, len: 3 })
        );
    }

    #[test]
    fn zero_steps_yield_an_empty_vector() {
        let count = weighted_count(&BTreeMap::new(), &BTreeMap::new(), 0).expect("count");
        assert!(count.is_empty());
    }
}
