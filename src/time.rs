use crate::error::{AnalysisError, AnalysisResult};
use chrono::{NaiveDate, NaiveDateTime};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a `YYYY-MM-DD HH:MM:SS` wall-clock timestamp.
///
/// Timestamps carry no zone; they are interpreted as UTC so that epoch deltas
/// never pick up DST shifts.
pub fn parse_timestamp(raw: &str) -> AnalysisResult<NaiveDateTime> {
    let trimmed = raw.trim();
    NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT).map_err(|_| {
        AnalysisError::InvalidTimestamp {
            value: trimmed.to_string(),
        }
    })
}

pub fn parse_timestamps<S: AsRef<str>>(raw: &[S]) -> AnalysisResult<Vec<NaiveDateTime>> {
    raw.iter().map(|value| parse_timestamp(value.as_ref())).collect()
}

pub fn epoch_seconds(ts: &NaiveDateTime) -> i64 {
    ts.and_utc().timestamp()
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Returns the index of the first element that is smaller than its predecessor.
pub(crate) fn first_descent<T: PartialOrd>(values: &[T]) -> Option<usize> {
    values
        .windows(2)
        .position(|pair| pair[1] < pair[0])
        .map(|idx| idx + 1)
}

pub fn ensure_non_decreasing(timestamps: &[NaiveDateTime]) -> AnalysisResult<()> {
    match first_descent(timestamps) {
        Some(index) => Err(AnalysisError::UnsortedTimestamps { index }),
        None => Ok(()),
    }
}
