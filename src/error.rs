use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("insufficient data: {samples} samples, at least 2 are required to form residuals")]
    InsufficientData { samples: usize },

    #[error("non-finite sample at index {index}")]
    NonFiniteSample { index: usize },

    #[error("no anomalies: adjusted F1 is undefined for an empty detection or reference set")]
    NoAnomalies,

    #[error("no matched anomalies: adjusted precision {precision} / recall {recall}")]
    NoMatchedAnomalies { precision: f64, recall: f64 },

    #[error("feature `{feature}` has detections but no adjusted F1 score")]
    MissingFeatureScore { feature: String },

    #[error("reference anomalies are not sorted ascending at index {index}")]
    UnsortedReference { index: usize },

    #[error("reference anomaly set is empty")]
    EmptyReference,

    #[error("timestamp sequence decreases at index {index}")]
    UnsortedTimestamps { index: usize },

    #[error("feature `{feature}` has {actual} samples but the timestamp sequence has {expected}")]
    MismatchedLength {
        feature: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid timestamp `{value}`: expected YYYY-MM-DD HH:MM:SS")]
    InvalidTimestamp { value: String },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("anomaly index {index} is outside the score vector (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

impl AnalysisError {
    /// Per-feature failures drop the feature; everything else aborts the run.
    pub fn is_feature_local(&self) -> bool {
        matches!(
            self,
            AnalysisError::InsufficientData { .. }
                | AnalysisError::NonFiniteSample { .. }
                | AnalysisError::NoAnomalies
                | AnalysisError::NoMatchedAnomalies { .. }
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::InsufficientData { .. } => "insufficient_data",
            AnalysisError::NonFiniteSample { .. } => "non_finite_sample",
            AnalysisError::NoAnomalies => "no_anomalies",
            AnalysisError::NoMatchedAnomalies { .. } => "no_matched_anomalies",
            AnalysisError::MissingFeatureScore { .. } => "missing_feature_score",
            AnalysisError::UnsortedReference { .. } => "unsorted_reference",
            AnalysisError::EmptyReference => "empty_reference",
            AnalysisError::UnsortedTimestamps { .. } => "unsorted_timestamps",
            AnalysisError::MismatchedLength { .. } => "mismatched_length",
            AnalysisError::InvalidTimestamp { .. } => "invalid_timestamp",
            AnalysisError::InvalidParameter { .. } => "invalid_parameter",
            AnalysisError::IndexOutOfRange { .. } => "index_out_of_range",
        }
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
