use crate::error::{AppError, Result};
use crate::models::{ClaimRecord, IncidentDates, NumericColumn};
use serde::{Deserialize, Serialize};

/// Age and duration features derived from paired dates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedFeatures {
    /// Whole years between date of birth and the accident
    pub driver_age: i64,

    /// Whole years between licence issue and the accident
    pub license_age: i64,

    /// Days between the accident and first notice of loss
    pub fnol_delay: i64,

    /// Days between first notice of loss and settlement
    pub settlement_days: i64,
}

impl DerivedFeatures {
    /// Compute the four derived columns from one record's dates
    ///
    /// Negative deltas are passed through: a birth date after the accident
    /// yields a negative age rather than an error.
    pub fn from_dates(dates: &IncidentDates) -> Self {
        Self {
            driver_age: floor_years((dates.accident - dates.date_of_birth).num_days()),
            license_age: floor_years((dates.accident - dates.license_issued).num_days()),
            fnol_delay: (dates.fnol - dates.accident).num_days(),
            settlement_days: (dates.settlement - dates.fnol).num_days(),
        }
    }

    fn apply(&self, record: &mut ClaimRecord) {
        NumericColumn::DriverAge.set(record, self.driver_age as f64);
        NumericColumn::LicenseAge.set(record, self.license_age as f64);
        NumericColumn::FnolDelay.set(record, self.fnol_delay as f64);
        NumericColumn::SettlementDays.set(record, self.settlement_days as f64);
    }
}

/// `floor(days / 365)`, rounding toward negative infinity
pub fn floor_years(days: i64) -> i64 {
    days.div_euclid(365)
}

/// Add `Driver_age`, `License_age`, `Fnol_delay` and `Settlement_days` to every record
///
/// Raw date fields are left untouched. Fails before mutating anything if any
/// record lacks one of the paired dates.
pub fn derive_features(records: &mut [ClaimRecord]) -> Result<()> {
    let mut missing: Vec<&'static str> = Vec::new();
    for record in records.iter() {
        if record.dates().is_none() {
            for field in record.missing_retraining_fields() {
                if field != NumericColumn::UltimateClaimAmount.name() && !missing.contains(&field) {
                    missing.push(field);
                }
            }
        }
    }
    if !missing.is_empty() {
        return Err(AppError::schema_mismatch(missing));
    }

    for record in records.iter_mut() {
        if let Some(dates) = record.dates() {
            DerivedFeatures::from_dates(&dates).apply(record);
        }
    }

    tracing::debug!(rows = records.len(), "Derived age and delay features");
    Ok(())
}
