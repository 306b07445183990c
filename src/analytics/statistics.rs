//! Descriptive statistics over claim columns

use crate::models::{CategoricalColumn, ClaimRecord};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Distribution statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub variance: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl Distribution {
    /// Calculate distribution over the finite values of `data`
    pub fn from_data(data: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = data.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / count as f64;

        Some(Self {
            mean,
            median: percentile(&sorted, 50.0),
            std_dev: variance.sqrt(),
            variance,
            min: sorted[0],
            max: sorted[count - 1],
            count,
        })
    }
}

/// Occurrences of one categorical label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub label: String,
    pub count: usize,
}

/// Label frequencies, most frequent first (ties by label)
pub fn value_counts<'a, I>(values: I) -> Vec<ValueCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut frequency: HashMap<&str, usize> = HashMap::new();
    for value in values {
        *frequency.entry(value).or_insert(0) += 1;
    }

    let mut counts: Vec<ValueCount> = frequency
        .into_iter()
        .map(|(label, count)| ValueCount {
            label: label.to_string(),
            count,
        })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    counts
}

/// Estimated vs ultimate totals for one categorical group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub group: String,
    pub claim_count: usize,
    pub total_estimated: f64,
    pub avg_estimated: f64,
    /// Sum over claims that carry an ultimate amount
    pub total_ultimate: f64,
    pub avg_ultimate: Option<f64>,
}

/// One summary per distinct label of `column`, ordered by label
pub fn group_summaries(records: &[ClaimRecord], column: CategoricalColumn) -> Vec<GroupSummary> {
    #[derive(Default)]
    struct Acc {
        count: usize,
        estimated: f64,
        ultimate: f64,
        ultimate_count: usize,
    }

    let mut groups: BTreeMap<&str, Acc> = BTreeMap::new();
    for record in records {
        let acc = groups.entry(column.value(record)).or_default();
        acc.count += 1;
        acc.estimated += record.estimated_claim_amount;
        if let Some(ultimate) = record.ultimate_claim_amount {
            acc.ultimate += ultimate;
            acc.ultimate_count += 1;
        }
    }

    groups
        .into_iter()
        .map(|(group, acc)| GroupSummary {
            group: group.to_string(),
            claim_count: acc.count,
            total_estimated: acc.estimated,
            avg_estimated: acc.estimated / acc.count as f64,
            total_ultimate: acc.ultimate,
            avg_ultimate: (acc.ultimate_count > 0).then(|| acc.ultimate / acc.ultimate_count as f64),
        })
        .collect()
}

/// Event count for one calendar month
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
    /// `YYYY-MM`
    pub month: String,
    pub count: usize,
}

/// Count dates per calendar month, ascending
pub fn monthly_counts<I>(dates: I) -> Vec<MonthlyCount>
where
    I: IntoIterator<Item = NaiveDate>,
{
    let mut months: BTreeMap<String, usize> = BTreeMap::new();
    for date in dates {
        *months.entry(date.format("%Y-%m").to_string()).or_insert(0) += 1;
    }
    months
        .into_iter()
        .map(|(month, count)| MonthlyCount { month, count })
        .collect()
}

/// Linear-interpolated percentile of already sorted data
pub fn percentile(sorted_data: &[f64], percentile: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }

    let index = (percentile / 100.0) * (sorted_data.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        sorted_data[lower]
    } else {
        let weight = index - lower as f64;
        sorted_data[lower] * (1.0 - weight) + sorted_data[upper] * weight
    }
}
