//! IQR-based winsorization of numeric claim columns

use crate::models::{ClaimRecord, NumericColumn};
use ndarray::Array1;
use ndarray_stats::{interpolate::Linear, Quantile1dExt};
use noisy_float::types::{n64, N64};
use serde::Serialize;

/// Default Tukey fence multiplier
pub const IQR_MULTIPLIER: f64 = 1.5;

/// Clipping range derived from a column's quartiles
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    /// Quartiles with linear interpolation at `q * (n - 1)`; non-finite values are skipped
    ///
    /// Returns `None` when no finite value is present.
    pub fn from_values(values: &[f64], multiplier: f64) -> Option<Self> {
        let mut data: Array1<N64> = values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .map(n64)
            .collect();
        if data.is_empty() {
            return None;
        }

        let q1 = data.quantile_mut(n64(0.25), &Linear).ok()?.raw();
        let q3 = data.quantile_mut(n64(0.75), &Linear).ok()?.raw();
        let iqr = q3 - q1;

        Some(Self {
            q1,
            q3,
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
        })
    }

    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    pub fn clip(&self, value: f64) -> f64 {
        value.max(self.lower).min(self.upper)
    }
}

/// Winsorize `column` in place with the default 1.5 × IQR fences
pub fn contain(records: &mut [ClaimRecord], column: NumericColumn) -> Option<IqrBounds> {
    contain_with(records, column, IQR_MULTIPLIER)
}

/// Winsorize `column` in place, recomputing quartiles from its current values
///
/// Only the named column changes. Empty cells stay empty.
///
/// A second pass is a no-op only when the values interpolated into Q1 and Q3
/// already lie inside the fences. On small samples a clipped tail value can
/// feed the quartile itself, so repeated calls keep pulling it inward: for
/// `[0, 0, 0, 100]` one pass yields 62.5 and the next 39.0625.
pub fn contain_with(
    records: &mut [ClaimRecord],
    column: NumericColumn,
    multiplier: f64,
) -> Option<IqrBounds> {
    let values: Vec<f64> = records.iter().filter_map(|r| column.get(r)).collect();
    let bounds = IqrBounds::from_values(&values, multiplier)?;

    let mut clipped = 0usize;
    for record in records.iter_mut() {
        if let Some(value) = column.get(record) {
            let bounded = bounds.clip(value);
            if bounded != value {
                column.set(record, bounded);
                clipped += 1;
            }
        }
    }

    tracing::debug!(
        column = column.name(),
        lower = bounds.lower,
        upper = bounds.upper,
        clipped,
        "Contained outliers"
    );

    Some(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records_with_estimates(values: &[f64]) -> Vec<ClaimRecord> {
        values
            .iter()
            .map(|&v| ClaimRecord::new("Collision", "Heavy", "Rain", "SUV", v, 2018.0))
            .collect()
    }

    fn estimates(records: &[ClaimRecord]) -> Vec<f64> {
        records.iter().map(|r| r.estimated_claim_amount).collect()
    }

    #[test]
    fn test_quartiles_use_linear_interpolation() {
        let bounds = IqrBounds::from_values(&[1.0, 2.0, 3.0, 4.0], 1.5).unwrap();
        assert!((bounds.q1 - 1.75).abs() < 1e-12);
        assert!((bounds.q3 - 3.25).abs() < 1e-12);
        assert!((bounds.iqr() - 1.5).abs() < 1e-12);
        assert!((bounds.lower + 0.5).abs() < 1e-12);
        assert!((bounds.upper - 5.5).abs() < 1e-12);
    }

    #[test]
    fn test_bounds_skip_non_finite() {
        let bounds = IqrBounds::from_values(&[f64::NAN, 1.0, 2.0, 3.0, 4.0], 1.5).unwrap();
        assert!((bounds.q1 - 1.75).abs() < 1e-12);
        assert!(IqrBounds::from_values(&[], 1.5).is_none());
    }

    #[test]
    fn test_contain_clips_to_pre_containment_fences() {
        let mut values: Vec<f64> = (1..=20).map(f64::from).collect();
        values.push(1000.0);
        values.push(-500.0);
        let before = IqrBounds::from_values(&values, 1.5).unwrap();
        let mut records = records_with_estimates(&values);

        contain(&mut records, NumericColumn::EstimatedClaimAmount).unwrap();

        let after = estimates(&records);
        let min = after.iter().copied().fold(f64::INFINITY, f64::min);
        let max = after.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert!(min >= before.lower);
        assert!(max <= before.upper);
        assert_eq!(max, before.upper);
        assert_eq!(min, before.lower);
    }

    #[test]
    fn test_contain_is_idempotent() {
        let mut values: Vec<f64> = (1..=20).map(|v| f64::from(v) * 10.0).collect();
        values.push(5000.0);
        let mut records = records_with_estimates(&values);

        contain(&mut records, NumericColumn::EstimatedClaimAmount).unwrap();
        let once = estimates(&records);
        contain(&mut records, NumericColumn::EstimatedClaimAmount).unwrap();
        let twice = estimates(&records);

        assert_eq!(once, twice);
        assert_eq!(once[20], 310.0);
    }

    #[test]
    fn test_contain_repeats_shrink_small_samples() {
        let mut records = records_with_estimates(&[0.0, 0.0, 0.0, 100.0]);

        let first = contain(&mut records, NumericColumn::EstimatedClaimAmount).unwrap();
        assert_eq!(first.q3, 25.0);
        assert_eq!(estimates(&records), vec![0.0, 0.0, 0.0, 62.5]);

        contain(&mut records, NumericColumn::EstimatedClaimAmount).unwrap();
        assert_eq!(estimates(&records), vec![0.0, 0.0, 0.0, 39.0625]);
    }

    #[test]
    fn test_uniform_column_collapses_to_single_value() {
        let mut records = records_with_estimates(&[250.0; 8]);

        let bounds = contain(&mut records, NumericColumn::EstimatedClaimAmount).unwrap();

        assert_eq!(bounds.iqr(), 0.0);
        assert!(estimates(&records).iter().all(|&v| v == 250.0));
    }

    #[test]
    fn test_contain_only_touches_named_column() {
        let mut values: Vec<f64> = (1..=12).map(f64::from).collect();
        values.push(900.0);
        let mut records = records_with_estimates(&values);
        for (i, record) in records.iter_mut().enumerate() {
            record.ultimate_claim_amount = Some(10_000.0 * i as f64);
        }
        let untouched: Vec<Option<f64>> = records.iter().map(|r| r.ultimate_claim_amount).collect();

        contain(&mut records, NumericColumn::EstimatedClaimAmount).unwrap();

        let after: Vec<Option<f64>> = records.iter().map(|r| r.ultimate_claim_amount).collect();
        assert_eq!(after, untouched);
        assert!(records.iter().all(|r| r.vehicle_year == 2018.0));
    }

    #[test]
    fn test_empty_cells_are_left_empty() {
        let mut records = records_with_estimates(&[1.0, 2.0, 3.0, 4.0]);
        records[0].fnol_delay = Some(2.0);
        records[1].fnol_delay = Some(4.0);

        let bounds = contain(&mut records, NumericColumn::FnolDelay).unwrap();

        assert_eq!(records[2].fnol_delay, None);
        assert_eq!(records[3].fnol_delay, None);
        assert!((bounds.q1 - 2.5).abs() < 1e-12);
    }
}
