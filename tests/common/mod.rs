//! Shared fixtures for integration tests
#![allow(dead_code)]

use chrono::NaiveDate;
use fnol_triage::models::{ClaimRecord, IncidentDates};
use std::path::Path;

pub const CLAIM_TYPES: [&str; 3] = ["Collision", "Theft", "Fire"];
pub const WEATHER: [&str; 3] = ["Rain", "Clear", "Snow"];
pub const TRAFFIC: [&str; 2] = ["Heavy", "Light"];
pub const VEHICLES: [&str; 2] = ["SUV", "Sedan"];

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Deterministic labeled claim; the estimate grows with `i`
pub fn labeled_claim(i: usize, ultimate: impl Fn(f64) -> f64) -> ClaimRecord {
    let estimated = 500.0 + 25.0 * i as f64;
    ClaimRecord::new(
        CLAIM_TYPES[i % 3],
        TRAFFIC[i % 2],
        WEATHER[(i / 2) % 3],
        VEHICLES[(i / 3) % 2],
        estimated,
        2005.0 + (i % 15) as f64,
    )
    .with_dates(IncidentDates {
        accident: date(2023, 1 + (i % 12) as u32, 10),
        date_of_birth: date(1960 + (i % 35) as i32, 5, 1),
        license_issued: date(1990 + (i % 15) as i32, 8, 1),
        fnol: date(2023, 1 + (i % 12) as u32, 12 + (i % 5) as u32),
        settlement: date(2024, 1 + (i % 12) as u32, 15),
    })
    .with_ultimate_amount(ultimate(estimated))
}

pub fn labeled_batch(n: usize, ultimate: impl Fn(f64) -> f64 + Copy) -> Vec<ClaimRecord> {
    (0..n).map(|i| labeled_claim(i, ultimate)).collect()
}

/// Write records as a claims CSV with the standard headers
pub fn write_csv(path: &Path, records: &[ClaimRecord]) {
    let mut writer = csv::Writer::from_path(path).unwrap();
    for record in records {
        writer.serialize(record).unwrap();
    }
    writer.flush().unwrap();
}
