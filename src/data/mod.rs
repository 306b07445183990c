//! CSV ingestion of claim batches

use crate::error::{AppError, Result};
use crate::models::{retraining_columns, ClaimRecord, CATEGORICAL_FEATURES, NUMERIC_FEATURES};
use std::io::Read;
use std::path::Path;

/// Header names every claims file must carry
pub fn base_columns() -> Vec<&'static str> {
    CATEGORICAL_FEATURES
        .iter()
        .map(|c| c.name())
        .chain(NUMERIC_FEATURES[..2].iter().map(|c| c.name()))
        .collect()
}

/// Load every claim in a CSV file
///
/// Extra columns are ignored. Empty optional cells become `None`.
pub fn load_claims<P: AsRef<Path>>(path: P) -> Result<Vec<ClaimRecord>> {
    read_claims(open(path.as_ref())?, &base_columns())
}

/// Load a labeled batch for retraining, requiring every raw retraining column
pub fn load_training_batch<P: AsRef<Path>>(path: P) -> Result<Vec<ClaimRecord>> {
    read_claims(open(path.as_ref())?, &retraining_columns())
}

/// Parse claims from any reader after checking `required` headers are present
pub fn read_claims<R: Read>(reader: R, required: &[&str]) -> Result<Vec<ClaimRecord>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = reader.headers()?.clone();
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::schema_mismatch(missing));
    }

    let mut records = Vec::new();
    for (line, row) in reader.deserialize::<ClaimRecord>().enumerate() {
        let record = row.map_err(|e| {
            AppError::Validation(format!("Row {} could not be parsed: {}", line + 1, e))
        })?;
        records.push(record);
    }

    tracing::info!(rows = records.len(), "Loaded claims");
    Ok(records)
}

fn open(path: &Path) -> Result<std::fs::File> {
    std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            AppError::Validation(format!("Claims file not found: {}", path.display()))
        }
        _ => AppError::Io(e),
    })
}
