use super::statistics::{
    group_summaries, monthly_counts, value_counts, Distribution, GroupSummary, MonthlyCount,
    ValueCount,
};
use crate::ml::features::floor_years;
use crate::models::{CategoricalColumn, ClaimRecord, CATEGORICAL_FEATURES};
use serde::Serialize;

/// Headline figures for a claims portfolio
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyIndicators {
    pub lowest_ultimate: Option<f64>,
    pub highest_ultimate: Option<f64>,
    pub youngest_driver: Option<f64>,
    pub oldest_driver: Option<f64>,
    pub total_estimated: f64,
    pub total_ultimate: f64,
    /// `(total_ultimate - total_estimated) / total_estimated * 100`; `None` when nothing is estimated
    pub variance_pct: Option<f64>,
}

/// Most frequent label of one categorical column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MostCommon {
    pub column: &'static str,
    pub label: String,
    pub count: usize,
}

/// Portfolio overview computed from a loaded claims table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimsOverview {
    pub claim_count: usize,
    pub kpis: KeyIndicators,
    pub claim_types: Vec<GroupSummary>,
    pub highest_claim_type: Option<String>,
    pub lowest_claim_type: Option<String>,
    /// Sorted by total ultimate amount, largest first
    pub weather_impact: Vec<GroupSummary>,
    pub traffic_counts: Vec<ValueCount>,
    pub weather_counts: Vec<ValueCount>,
    pub most_common: Vec<MostCommon>,
    pub monthly_accidents: Vec<MonthlyCount>,
    pub monthly_settlements: Vec<MonthlyCount>,
    pub estimated_amounts: Option<Distribution>,
    pub ultimate_amounts: Option<Distribution>,
    pub driver_ages: Option<Distribution>,
}

impl ClaimsOverview {
    pub fn from_records(records: &[ClaimRecord]) -> Self {
        let ultimates: Vec<f64> = records.iter().filter_map(|r| r.ultimate_claim_amount).collect();
        let estimates: Vec<f64> = records.iter().map(|r| r.estimated_claim_amount).collect();
        let ages: Vec<f64> = records.iter().filter_map(driver_age).collect();

        let ultimate_amounts = Distribution::from_data(&ultimates);
        let driver_ages = Distribution::from_data(&ages);

        let total_estimated: f64 = estimates.iter().sum();
        let total_ultimate: f64 = ultimates.iter().sum();
        let kpis = KeyIndicators {
            lowest_ultimate: ultimate_amounts.as_ref().map(|d| d.min),
            highest_ultimate: ultimate_amounts.as_ref().map(|d| d.max),
            youngest_driver: driver_ages.as_ref().map(|d| d.min),
            oldest_driver: driver_ages.as_ref().map(|d| d.max),
            total_estimated,
            total_ultimate,
            variance_pct: (total_estimated != 0.0)
                .then(|| (total_ultimate - total_estimated) / total_estimated * 100.0),
        };

        let claim_types = group_summaries(records, CategoricalColumn::ClaimType);
        let highest_claim_type = claim_types
            .iter()
            .max_by(|a, b| a.total_ultimate.total_cmp(&b.total_ultimate))
            .map(|g| g.group.clone());
        let lowest_claim_type = claim_types
            .iter()
            .min_by(|a, b| a.total_ultimate.total_cmp(&b.total_ultimate))
            .map(|g| g.group.clone());

        let mut weather_impact = group_summaries(records, CategoricalColumn::WeatherCondition);
        weather_impact.sort_by(|a, b| b.total_ultimate.total_cmp(&a.total_ultimate));

        let most_common = CATEGORICAL_FEATURES
            .iter()
            .filter_map(|&column| {
                value_counts(records.iter().map(|r| column.value(r)))
                    .into_iter()
                    .next()
                    .map(|top| MostCommon {
                        column: column.name(),
                        label: top.label,
                        count: top.count,
                    })
            })
            .collect();

        Self {
            claim_count: records.len(),
            kpis,
            claim_types,
            highest_claim_type,
            lowest_claim_type,
            weather_impact,
            traffic_counts: value_counts(records.iter().map(|r| r.traffic_condition.as_str())),
            weather_counts: value_counts(records.iter().map(|r| r.weather_condition.as_str())),
            most_common,
            monthly_accidents: monthly_counts(records.iter().filter_map(|r| r.accident_date)),
            monthly_settlements: monthly_counts(records.iter().filter_map(|r| r.settlement_date)),
            estimated_amounts: Distribution::from_data(&estimates),
            ultimate_amounts,
            driver_ages,
        }
    }
}

/// Supplied age, else whole years from date of birth to the accident
fn driver_age(record: &ClaimRecord) -> Option<f64> {
    record.driver_age.or_else(|| {
        let days = (record.accident_date? - record.date_of_birth?).num_days();
        Some(floor_years(days) as f64)
    })
}
