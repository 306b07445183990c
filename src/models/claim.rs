use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, IntoEnumIterator, IntoStaticStr};
use validator::Validate;

/// One row of incident/policy data
///
/// Field names on the wire are the exact column headers of the claims CSV.
/// Date fields, the label and the derived delay columns are only present on
/// retraining batches; `Driver_age`/`License_age` are supplied directly at
/// inference time and derived from dates during retraining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    #[serde(rename = "Claim_Type")]
    pub claim_type: String,

    #[serde(rename = "Traffic_Condition")]
    pub traffic_condition: String,

    #[serde(rename = "Weather_Condition")]
    pub weather_condition: String,

    #[serde(rename = "Vehicle_Type")]
    pub vehicle_type: String,

    #[serde(rename = "Estimated_Claim_Amount")]
    pub estimated_claim_amount: f64,

    #[serde(rename = "Vehicle_Year")]
    pub vehicle_year: f64,

    #[serde(rename = "Driver_age", default)]
    pub driver_age: Option<f64>,

    #[serde(rename = "License_age", default)]
    pub license_age: Option<f64>,

    #[serde(rename = "Accident_Date", default, with = "date_format")]
    pub accident_date: Option<NaiveDate>,

    #[serde(rename = "Date_of_Birth", default, with = "date_format")]
    pub date_of_birth: Option<NaiveDate>,

    #[serde(rename = "Full_License_issue_Date", default, with = "date_format")]
    pub full_license_issue_date: Option<NaiveDate>,

    #[serde(rename = "FNOL_Date", default, with = "date_format")]
    pub fnol_date: Option<NaiveDate>,

    #[serde(rename = "Settlement_Date", default, with = "date_format")]
    pub settlement_date: Option<NaiveDate>,

    #[serde(rename = "Ultimate_Claim_Amount", default)]
    pub ultimate_claim_amount: Option<f64>,

    #[serde(rename = "Fnol_delay", default)]
    pub fnol_delay: Option<f64>,

    #[serde(rename = "Settlement_days", default)]
    pub settlement_days: Option<f64>,
}

/// Paired date fields used by feature derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncidentDates {
    pub accident: NaiveDate,
    pub date_of_birth: NaiveDate,
    pub license_issued: NaiveDate,
    pub fnol: NaiveDate,
    pub settlement: NaiveDate,
}

impl ClaimRecord {
    pub fn new(
        claim_type: impl Into<String>,
        traffic_condition: impl Into<String>,
        weather_condition: impl Into<String>,
        vehicle_type: impl Into<String>,
        estimated_claim_amount: f64,
        vehicle_year: f64,
    ) -> Self {
        Self {
            claim_type: claim_type.into(),
            traffic_condition: traffic_condition.into(),
            weather_condition: weather_condition.into(),
            vehicle_type: vehicle_type.into(),
            estimated_claim_amount,
            vehicle_year,
            driver_age: None,
            license_age: None,
            accident_date: None,
            date_of_birth: None,
            full_license_issue_date: None,
            fnol_date: None,
            settlement_date: None,
            ultimate_claim_amount: None,
            fnol_delay: None,
            settlement_days: None,
        }
    }

    pub fn with_ages(mut self, driver_age: f64, license_age: f64) -> Self {
        self.driver_age = Some(driver_age);
        self.license_age = Some(license_age);
        self
    }

    pub fn with_dates(mut self, dates: IncidentDates) -> Self {
        self.accident_date = Some(dates.accident);
        self.date_of_birth = Some(dates.date_of_birth);
        self.full_license_issue_date = Some(dates.license_issued);
        self.fnol_date = Some(dates.fnol);
        self.settlement_date = Some(dates.settlement);
        self
    }

    pub fn with_ultimate_amount(mut self, amount: f64) -> Self {
        self.ultimate_claim_amount = Some(amount);
        self
    }

    /// All five paired dates, if every one is present
    pub fn dates(&self) -> Option<IncidentDates> {
        Some(IncidentDates {
            accident: self.accident_date?,
            date_of_birth: self.date_of_birth?,
            license_issued: self.full_license_issue_date?,
            fnol: self.fnol_date?,
            settlement: self.settlement_date?,
        })
    }

    /// Raw retraining columns that are empty on this record
    pub fn missing_retraining_fields(&self) -> Vec<&'static str> {
        let mut missing: Vec<&'static str> = DateColumn::iter()
            .filter(|column| column.get(self).is_none())
            .map(DateColumn::name)
            .collect();
        if self.ultimate_claim_amount.is_none() {
            missing.push(NumericColumn::UltimateClaimAmount.name());
        }
        missing
    }
}

/// Categorical fields, expanded into indicator columns by the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, IntoStaticStr, EnumIter)]
pub enum CategoricalColumn {
    #[strum(serialize = "Claim_Type")]
    ClaimType,
    #[strum(serialize = "Traffic_Condition")]
    TrafficCondition,
    #[strum(serialize = "Weather_Condition")]
    WeatherCondition,
    #[strum(serialize = "Vehicle_Type")]
    VehicleType,
}

impl CategoricalColumn {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn value(self, record: &ClaimRecord) -> &str {
        match self {
            CategoricalColumn::ClaimType => &record.claim_type,
            CategoricalColumn::TrafficCondition => &record.traffic_condition,
            CategoricalColumn::WeatherCondition => &record.weather_condition,
            CategoricalColumn::VehicleType => &record.vehicle_type,
        }
    }

    /// Indicator column name for one label, e.g. `Weather_Condition_Rain`
    pub fn indicator(self, value: &str) -> String {
        format!("{}_{}", self.name(), value)
    }
}

/// Numeric fields addressable by column name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, IntoStaticStr, EnumIter)]
pub enum NumericColumn {
    #[strum(serialize = "Estimated_Claim_Amount")]
    EstimatedClaimAmount,
    #[strum(serialize = "Vehicle_Year")]
    VehicleYear,
    #[strum(serialize = "Driver_age")]
    DriverAge,
    #[strum(serialize = "License_age")]
    LicenseAge,
    #[strum(serialize = "Ultimate_Claim_Amount")]
    UltimateClaimAmount,
    #[strum(serialize = "Fnol_delay")]
    FnolDelay,
    #[strum(serialize = "Settlement_days")]
    SettlementDays,
}

impl NumericColumn {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn get(self, record: &ClaimRecord) -> Option<f64> {
        match self {
            NumericColumn::EstimatedClaimAmount => Some(record.estimated_claim_amount),
            NumericColumn::VehicleYear => Some(record.vehicle_year),
            NumericColumn::DriverAge => record.driver_age,
            NumericColumn::LicenseAge => record.license_age,
            NumericColumn::UltimateClaimAmount => record.ultimate_claim_amount,
            NumericColumn::FnolDelay => record.fnol_delay,
            NumericColumn::SettlementDays => record.settlement_days,
        }
    }

    pub fn set(self, record: &mut ClaimRecord, value: f64) {
        match self {
            NumericColumn::EstimatedClaimAmount => record.estimated_claim_amount = value,
            NumericColumn::VehicleYear => record.vehicle_year = value,
            NumericColumn::DriverAge => record.driver_age = Some(value),
            NumericColumn::LicenseAge => record.license_age = Some(value),
            NumericColumn::UltimateClaimAmount => record.ultimate_claim_amount = Some(value),
            NumericColumn::FnolDelay => record.fnol_delay = Some(value),
            NumericColumn::SettlementDays => record.settlement_days = Some(value),
        }
    }
}

/// Raw date fields consumed by feature derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, EnumIter)]
pub enum DateColumn {
    #[strum(serialize = "Accident_Date")]
    AccidentDate,
    #[strum(serialize = "Date_of_Birth")]
    DateOfBirth,
    #[strum(serialize = "Full_License_issue_Date")]
    FullLicenseIssueDate,
    #[strum(serialize = "FNOL_Date")]
    FnolDate,
    #[strum(serialize = "Settlement_Date")]
    SettlementDate,
}

impl DateColumn {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn get(self, record: &ClaimRecord) -> Option<NaiveDate> {
        match self {
            DateColumn::AccidentDate => record.accident_date,
            DateColumn::DateOfBirth => record.date_of_birth,
            DateColumn::FullLicenseIssueDate => record.full_license_issue_date,
            DateColumn::FnolDate => record.fnol_date,
            DateColumn::SettlementDate => record.settlement_date,
        }
    }
}

/// Categorical model inputs, in feature order
pub const CATEGORICAL_FEATURES: [CategoricalColumn; 4] = [
    CategoricalColumn::ClaimType,
    CategoricalColumn::TrafficCondition,
    CategoricalColumn::WeatherCondition,
    CategoricalColumn::VehicleType,
];

/// Numeric model inputs, in feature order
pub const NUMERIC_FEATURES: [NumericColumn; 4] = [
    NumericColumn::EstimatedClaimAmount,
    NumericColumn::VehicleYear,
    NumericColumn::DriverAge,
    NumericColumn::LicenseAge,
];

/// Regression label
pub const TARGET: NumericColumn = NumericColumn::UltimateClaimAmount;

/// Columns winsorized before training
pub const OUTLIER_COLUMNS: [NumericColumn; 4] = [
    NumericColumn::EstimatedClaimAmount,
    NumericColumn::UltimateClaimAmount,
    NumericColumn::FnolDelay,
    NumericColumn::SettlementDays,
];

/// Header names a retraining CSV must carry
pub fn retraining_columns() -> Vec<&'static str> {
    let mut columns: Vec<&'static str> = CATEGORICAL_FEATURES.iter().map(|c| c.name()).collect();
    columns.push(NumericColumn::EstimatedClaimAmount.name());
    columns.push(NumericColumn::VehicleYear.name());
    columns.extend(DateColumn::iter().map(DateColumn::name));
    columns.push(TARGET.name());
    columns
}

/// Single-claim prediction input as entered by a claims handler
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PredictionRequest {
    #[validate(length(min = 1))]
    pub claim_type: String,

    #[validate(range(min = 0.0))]
    pub estimated_claim_amount: f64,

    #[validate(length(min = 1))]
    pub traffic_condition: String,

    #[validate(length(min = 1))]
    pub weather_condition: String,

    #[validate(length(min = 1))]
    pub vehicle_type: String,

    #[validate(range(min = 1900.0, max = 2100.0))]
    pub vehicle_year: f64,

    #[validate(range(min = 18.0, max = 100.0))]
    pub driver_age: f64,

    #[validate(range(min = 0.0, max = 100.0))]
    pub license_age: f64,
}

impl PredictionRequest {
    /// Validate ranges and convert into a claim record
    pub fn into_record(self) -> crate::error::Result<ClaimRecord> {
        self.validate()?;
        Ok(ClaimRecord::new(
            self.claim_type,
            self.traffic_condition,
            self.weather_condition,
            self.vehicle_type,
            self.estimated_claim_amount,
            self.vehicle_year,
        )
        .with_ages(self.driver_age, self.license_age))
    }
}

/// Lenient date parsing for claims exports
mod date_format {
    use chrono::{NaiveDate, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => serializer.serialize_str(&date.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => parse(value)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("unrecognised date '{value}'"))),
        }
    }

    pub(crate) fn parse(value: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(value, FORMAT)
            .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%Y"))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|dt| dt.date())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_column_names_match_headers() {
        assert_eq!(CategoricalColumn::VehicleType.to_string(), "Vehicle_Type");
        assert_eq!(CategoricalColumn::VehicleType.name(), "Vehicle_Type");
        assert_eq!(NumericColumn::SettlementDays.as_ref(), "Settlement_days");
        assert_eq!(DateColumn::FnolDate.to_string(), "FNOL_Date");
        assert_eq!(
            CategoricalColumn::WeatherCondition.indicator("Rain"),
            "Weather_Condition_Rain"
        );
    }

    #[test]
    fn test_categorical_value_wires_each_field() {
        let record = ClaimRecord::new("Collision", "Heavy", "Rain", "SUV", 1000.0, 2018.0);
        assert_eq!(CategoricalColumn::WeatherCondition.value(&record), "Rain");
        assert_eq!(CategoricalColumn::VehicleType.value(&record), "SUV");
    }

    #[test]
    fn test_numeric_get_set() {
        let mut record = ClaimRecord::new("Theft", "Light", "Clear", "Sedan", 500.0, 2015.0);
        assert_eq!(NumericColumn::FnolDelay.get(&record), None);

        NumericColumn::FnolDelay.set(&mut record, 3.0);
        NumericColumn::EstimatedClaimAmount.set(&mut record, 750.0);

        assert_eq!(record.fnol_delay, Some(3.0));
        assert_eq!(NumericColumn::EstimatedClaimAmount.get(&record), Some(750.0));
    }

    #[test]
    fn test_missing_retraining_fields() {
        let record = ClaimRecord::new("Theft", "Light", "Clear", "Sedan", 500.0, 2015.0);
        let missing = record.missing_retraining_fields();
        assert_eq!(missing.len(), 6);
        assert!(missing.contains(&"Accident_Date"));
        assert!(missing.contains(&"Ultimate_Claim_Amount"));

        let complete = record
            .with_dates(IncidentDates {
                accident: date(2023, 5, 1),
                date_of_birth: date(1980, 1, 1),
                license_issued: date(2000, 1, 1),
                fnol: date(2023, 5, 3),
                settlement: date(2023, 6, 1),
            })
            .with_ultimate_amount(900.0);
        assert!(complete.missing_retraining_fields().is_empty());
        assert!(complete.dates().is_some());
    }

    #[test]
    fn test_retraining_columns() {
        let columns = retraining_columns();
        assert_eq!(columns.len(), 12);
        assert_eq!(columns[0], "Claim_Type");
        assert_eq!(*columns.last().unwrap(), "Ultimate_Claim_Amount");
    }

    #[test]
    fn test_date_parse_formats() {
        assert_eq!(date_format::parse("2023-05-01"), Some(date(2023, 5, 1)));
        assert_eq!(date_format::parse("01/05/2023"), Some(date(2023, 5, 1)));
        assert_eq!(date_format::parse("2023-05-01 10:30:00"), Some(date(2023, 5, 1)));
        assert_eq!(date_format::parse("May 1st"), None);
    }

    #[test]
    fn test_prediction_request_validation() {
        let request = PredictionRequest {
            claim_type: "Collision".to_string(),
            estimated_claim_amount: 1000.0,
            traffic_condition: "Heavy".to_string(),
            weather_condition: "Rain".to_string(),
            vehicle_type: "SUV".to_string(),
            vehicle_year: 2020.0,
            driver_age: 35.0,
            license_age: 10.0,
        };
        let record = request.clone().into_record().unwrap();
        assert_eq!(record.vehicle_type, "SUV");
        assert_eq!(record.driver_age, Some(35.0));

        let too_young = PredictionRequest {
            driver_age: 16.0,
            ..request
        };
        assert!(matches!(
            too_young.into_record(),
            Err(crate::error::AppError::Validation(_))
        ));
    }
}
