use crate::error::{AppError, Result};
use crate::models::{CategoricalColumn, ClaimRecord, CATEGORICAL_FEATURES, NUMERIC_FEATURES};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// One-hot encoder whose vocabulary is fitted on a batch
///
/// Every distinct label observed during `fit` becomes an indicator column named
/// `<Column>_<label>`; no baseline level is dropped. The vocabulary is batch
/// dependent, so encoded output must be aligned to a [`FeatureSchema`] before it
/// reaches a model.
#[derive(Debug, Clone, Default)]
pub struct CategoricalEncoder {
    /// Sorted labels per categorical column, in feature order
    vocabulary: Vec<(CategoricalColumn, Vec<String>)>,

    /// Is fitted (vocabulary built)
    is_fitted: bool,
}

impl CategoricalEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the vocabulary from the labels present in `records`
    pub fn fit(&mut self, records: &[ClaimRecord]) -> &mut Self {
        self.vocabulary = CATEGORICAL_FEATURES
            .iter()
            .map(|&column| {
                let labels: BTreeSet<&str> = records.iter().map(|r| column.value(r)).collect();
                (column, labels.into_iter().map(str::to_string).collect())
            })
            .collect();
        self.is_fitted = true;
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Numeric feature names followed by every indicator column
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = NUMERIC_FEATURES.iter().map(|c| c.name().to_string()).collect();
        for (column, labels) in &self.vocabulary {
            names.extend(labels.iter().map(|label| column.indicator(label)));
        }
        names
    }

    /// Encode `records` with the fitted vocabulary
    pub fn transform(&self, records: &[ClaimRecord]) -> Result<EncodedFeatures> {
        if !self.is_fitted {
            return Err(AppError::Training(
                "CategoricalEncoder must be fitted before transform".to_string(),
            ));
        }

        let columns = self.feature_names();
        let mut values = Array2::zeros((records.len(), columns.len()));

        for (i, record) in records.iter().enumerate() {
            let mut offset = 0;

            for column in NUMERIC_FEATURES {
                values[[i, offset]] = column
                    .get(record)
                    .ok_or_else(|| AppError::schema_mismatch([column.name()]))?;
                offset += 1;
            }

            for (column, labels) in &self.vocabulary {
                let label = column.value(record);
                if let Ok(idx) = labels.binary_search_by(|l| l.as_str().cmp(label)) {
                    values[[i, offset + idx]] = 1.0;
                }
                offset += labels.len();
            }
        }

        Ok(EncodedFeatures { columns, values })
    }

    /// Fit the vocabulary and encode in one step
    pub fn fit_transform(&mut self, records: &[ClaimRecord]) -> Result<EncodedFeatures> {
        self.fit(records);
        self.transform(records)
    }
}

/// Encoded batch: named columns over a dense row-major matrix
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatures {
    columns: Vec<String>,
    values: Array2<f64>,
}

impl EncodedFeatures {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    /// Column-name to value mapping for one row
    pub fn row(&self, index: usize) -> EncodedFeatureVector {
        EncodedFeatureVector {
            entries: self
                .columns
                .iter()
                .cloned()
                .zip(self.values.row(index).iter().copied())
                .collect(),
        }
    }
}

/// Ordered column-name to value mapping for a single row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedFeatureVector {
    entries: Vec<(String, f64)>,
}

impl EncodedFeatureVector {
    pub fn get(&self, column: &str) -> Option<f64> {
        self.entries.iter().find(|(name, _)| name == column).map(|(_, v)| *v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> Array1<f64> {
        self.entries.iter().map(|(_, v)| *v).collect()
    }
}

/// Non-fatal encoding alignment outcome
///
/// A categorical label the reference schema has never seen is zero-filled
/// rather than rejected; this report keeps that observable.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlignmentReport {
    /// Encoded columns absent from the schema and therefore discarded
    pub dropped_columns: Vec<String>,

    /// Schema columns absent from the encoded batch and therefore zero-filled
    pub zero_filled_columns: Vec<String>,

    /// Categorical cells whose label is unknown to the schema
    pub unseen_values: usize,
}

impl AlignmentReport {
    pub fn is_clean(&self) -> bool {
        self.unseen_values == 0
    }

    fn log(&self) {
        if !self.is_clean() {
            tracing::warn!(
                unseen_values = self.unseen_values,
                dropped_columns = ?self.dropped_columns,
                "Categorical labels unseen by reference schema were zero-filled"
            );
        }
    }
}

/// Frozen, ordered feature columns a trained model expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Reindex an encoded batch to exactly this schema's columns and order
    ///
    /// Columns outside the schema are dropped; schema columns missing from
    /// the batch are filled with 0.
    pub fn align(&self, encoded: &EncodedFeatures) -> (Array2<f64>, AlignmentReport) {
        let source: HashMap<&str, usize> = encoded
            .columns
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.as_str(), idx))
            .collect();
        let wanted: HashSet<&str> = self.columns.iter().map(String::as_str).collect();

        let mut aligned = Array2::zeros((encoded.n_rows(), self.columns.len()));
        let mut report = AlignmentReport::default();

        for (target_idx, name) in self.columns.iter().enumerate() {
            match source.get(name.as_str()) {
                Some(&source_idx) => aligned
                    .column_mut(target_idx)
                    .assign(&encoded.values.column(source_idx)),
                None => report.zero_filled_columns.push(name.clone()),
            }
        }

        for (source_idx, name) in encoded.columns.iter().enumerate() {
            if wanted.contains(name.as_str()) {
                continue;
            }
            if is_indicator(name) {
                report.unseen_values += encoded
                    .values
                    .column(source_idx)
                    .iter()
                    .filter(|&&v| v != 0.0)
                    .count();
            }
            report.dropped_columns.push(name.clone());
        }

        report.log();
        (aligned, report)
    }

    /// Encode one record directly against this schema's fixed vocabulary
    pub fn encode_record(&self, record: &ClaimRecord) -> Result<(Array2<f64>, AlignmentReport)> {
        let numeric: HashMap<&str, Option<f64>> = NUMERIC_FEATURES
            .iter()
            .map(|c| (c.name(), c.get(record)))
            .collect();
        let indicators: Vec<String> = CATEGORICAL_FEATURES
            .iter()
            .map(|c| c.indicator(c.value(record)))
            .collect();

        let mut row = Array2::zeros((1, self.columns.len()));
        let mut missing = Vec::new();
        for (idx, name) in self.columns.iter().enumerate() {
            row[[0, idx]] = match numeric.get(name.as_str()) {
                Some(Some(value)) => *value,
                Some(None) => {
                    missing.push(name.clone());
                    0.0
                }
                None if indicators.contains(name) => 1.0,
                None => 0.0,
            };
        }
        if !missing.is_empty() {
            return Err(AppError::schema_mismatch(missing));
        }

        let mut report = AlignmentReport::default();
        for indicator in indicators {
            if !self.columns.contains(&indicator) {
                report.unseen_values += 1;
                report.dropped_columns.push(indicator);
            }
        }
        report.log();

        Ok((row, report))
    }
}

/// Whether `name` is a `<Column>_<label>` indicator of a categorical feature
fn is_indicator(name: &str) -> bool {
    CATEGORICAL_FEATURES.iter().any(|column| {
        name.strip_prefix(column.name())
            .is_some_and(|rest| rest.starts_with('_'))
    })
}
