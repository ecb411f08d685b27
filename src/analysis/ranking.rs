use crate::time::format_date;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

pub const DEFAULT_TOP_N: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedDate {
    #[serde(serialize_with = "serialize_date")]
    pub date: NaiveDate,
    pub hits: usize,
}

impl RankedDate {
    pub fn date_string(&self) -> String {
        format_date(&self.date)
    }
}

fn serialize_date<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_date(date))
}

/// Indices of the `n` highest scores; equal scores keep ascending index order.
pub fn top_steps(scores: &[f64], n: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|a, b| scores[*b].total_cmp(&scores[*a]));
    order.truncate(n.min(scores.len()));
    order
}

/// Ranks calendar dates by how many of their steps land in the top `n`.
///
/// `timestamps[i]` is the step for score slot `i`; extra trailing timestamps
/// (the `L`th sample has no residual) are ignored.
pub fn rank_dates(scores: &[f64], timestamps: &[NaiveDateTime], n: usize) -> Vec<RankedDate> {
    let usable = scores.len().min(timestamps.len());
    let mut hits: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for index in top_steps(&scores[..usable], n) {
        *hits.entry(timestamps[index].date()).or_default() += 1;
    }

    let mut ranked: Vec<RankedDate> = hits
        .into_iter()
        .map(|(date, hits)| RankedDate { date, hits })
        .collect();
    ranked.sort_by(|a, b| b.hits.cmp(&a.hits).then_with(|| a.date.cmp(&b.date)));
    ranked
}
