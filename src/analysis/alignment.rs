use crate::error::{AnalysisError, AnalysisResult};
use crate::time::{epoch_seconds, first_descent};
use chrono::NaiveDateTime;

/// Maps residual indices onto the timestamp at the start of each residual pair.
pub fn detection_timestamps(
    indices: &[usize],
    timestamps: &[NaiveDateTime],
) -> AnalysisResult<Vec<i64>> {
    let residual_len = timestamps.len().saturating_sub(1);
    indices
        .iter()
        .map(|&index| {
            if index >= residual_len {
                return Err(AnalysisError::IndexOutOfRange {
                    index,
                    len: residual_len,
                });
            }
            Ok(epoch_seconds(&timestamps[index]))
        })
        .collect()
}

pub fn ensure_sorted(reference: &[i64]) -> AnalysisResult<()> {
    if reference.is_empty() {
        return Err(AnalysisError::EmptyReference);
    }
    match first_descent(reference) {
        Some(index) => Err(AnalysisError::UnsortedReference { index }),
        None => Ok(()),
    }
}

/// For each detection, seconds until the first reference event at or after it.
///
/// `+inf` when the detection falls after the last reference event.
pub fn delay_to_reference(detected: &[i64], reference: &[i64]) -> Vec<f64> {
    detected
        .iter()
        .map(|&ts| {
            let idx = reference.partition_point(|r| *r < ts);
            match reference.get(idx) {
                Some(r) => (r - ts) as f64,
                None => f64::INFINITY,
            }
        })
        .collect()
}

/// For each reference event, seconds since the last detection at or before it.
///
/// `+inf` when the reference event precedes the first detection.
pub fn delay_to_detection(detected: &[i64], reference: &[i64]) -> Vec<f64> {
    reference
        .iter()
        .map(|&ts| {
            let idx = detected.partition_point(|g| *g <= ts);
            if idx == 0 {
                f64::INFINITY
            } else {
                (ts - detected[idx - 1]) as f64
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_timestamps;

    #[test]
    fn delay_to_reference_uses_the_next_event_at_or_after() {
        let detected = vec![0, 100, 250, 400];
        let reference = vec![100, 300];
        assert_eq!(
            delay_to_reference(&detected, &reference),
            vec![100.0, 0.0, 50.0, f64::INFINITY]
        );
    }

    #[test]
    fn delay_to_detection_uses_the_last_detection_at_or_before() {
        let detected = vec![50, 100, 250];
        let reference = vec![10, 100, 300];
        assert_eq!(
            delay_to_detection(&detected, &reference),
            vec![f64::INFINITY, 0.0, 50.0]
        );
    }

    #[test]
    fn detections_after_last_reference_are_infinite() {
        let reference = vec![1_000];
        let detected = vec![1_001, 5_000, 9_999];
        assert!(delay_to_reference(&detected, &reference)
            .iter()
            .all(|d| d.is_infinite()));
    }

    #[test]
    fn references_before_first_detection_are_infinite() {
        let detected = vec![10_000];
        let reference = vec![1, 500, 9_999];
        assert!(delay_to_detection(&detected, &reference)
            .iter()
            .all(|d| d.is_infinite()));
    }

    #[test]
    fn repeated_timestamps_resolve_to_zero_delay() {
        let detected = vec![60, 60, 120];
        let reference = vec![60, 60];
        assert_eq!(
            delay_to_reference(&detected, &reference),
            vec![0.0, 0.0, f64::INFINITY]
        );
        assert_eq!(delay_to_detection(&detected, &reference), vec![0.0, 0.0]);
    }

    #[test]
    fn residual_index_maps_to_start_of_pair() {
        let timestamps = parse_timestamps(&[
            "2017-01-01 00:00:00",
            "2017-01-01 00:02:00",
            "2017-01-01 00:04:00",
        ])
        .expect("ts");
        let mapped = detection_timestamps(&[0, 1], &timestamps).expect("mapped");
        assert_eq!(mapped[1] - mapped[0], 120);
        assert_eq!(mapped[0], epoch_seconds(&timestamps[0]));

        assert_eq!(
            detection_timestamps(&[2], &timestamps),
            Err(AnalysisError::IndexOutOfRange { index: 2, len: 2 })
        );
    }

    #[test]
    fn unsorted_or_empty_reference_is_rejected() {
        assert_eq!(ensure_sorted(&[]), Err(AnalysisError::EmptyReference));
        assert_eq!(
            ensure_sorted(&[10, 20, 15]),
            Err(AnalysisError::UnsortedReference { index: 2 })
        );
        assert!(ensure_sorted(&[10, 10, 20]).is_ok());
    }
}
