use crate::error::{AppError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};
use std::collections::BTreeMap;
use std::fmt;

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;
type Tree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Regressor family
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// Random forest
    RandomForest,

    /// Single regression tree
    DecisionTree,

    /// Mean-of-target reference model
    Baseline,
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelType::RandomForest => write!(f, "Random Forest"),
            ModelType::DecisionTree => write!(f, "Decision Tree"),
            ModelType::Baseline => write!(f, "Baseline"),
        }
    }
}

/// Random forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: Option<u16>,
    pub min_samples_leaf: usize,
    pub min_samples_split: usize,
    /// Features considered per split; `None` lets the backend choose
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_leaf: 1,
            min_samples_split: 2,
            max_features: None,
            seed: 42,
        }
    }
}

impl ForestParams {
    fn to_smartcore(&self) -> RandomForestRegressorParameters {
        let mut params = RandomForestRegressorParameters::default()
            .with_n_trees(self.n_trees as _)
            .with_min_samples_leaf(self.min_samples_leaf as _)
            .with_min_samples_split(self.min_samples_split as _)
            .with_seed(self.seed);
        if let Some(depth) = self.max_depth {
            params = params.with_max_depth(depth);
        }
        if let Some(m) = self.max_features {
            params = params.with_m(m);
        }
        params
    }
}

/// Decision tree hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: Option<u16>,
    pub min_samples_leaf: usize,
    pub min_samples_split: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: Some(10),
            min_samples_leaf: 1,
            min_samples_split: 2,
        }
    }
}

impl TreeParams {
    fn to_smartcore(&self) -> DecisionTreeRegressorParameters {
        let mut params = DecisionTreeRegressorParameters::default()
            .with_min_samples_leaf(self.min_samples_leaf as _)
            .with_min_samples_split(self.min_samples_split as _);
        if let Some(depth) = self.max_depth {
            params = params.with_max_depth(depth);
        }
        params
    }
}

/// Training-time parameter set of a model, one variant per family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HyperParameters {
    RandomForest(ForestParams),
    DecisionTree(TreeParams),
    Baseline,
}

impl HyperParameters {
    pub fn model_type(&self) -> ModelType {
        match self {
            HyperParameters::RandomForest(_) => ModelType::RandomForest,
            HyperParameters::DecisionTree(_) => ModelType::DecisionTree,
            HyperParameters::Baseline => ModelType::Baseline,
        }
    }

    /// Flat name/value view for display and logging
    pub fn describe(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        let fmt_depth = |d: Option<u16>| d.map_or_else(|| "none".to_string(), |d| d.to_string());
        match self {
            HyperParameters::RandomForest(p) => {
                out.insert("n_trees".to_string(), p.n_trees.to_string());
                out.insert("max_depth".to_string(), fmt_depth(p.max_depth));
                out.insert("min_samples_leaf".to_string(), p.min_samples_leaf.to_string());
                out.insert("min_samples_split".to_string(), p.min_samples_split.to_string());
                out.insert(
                    "max_features".to_string(),
                    p.max_features.map_or_else(|| "auto".to_string(), |m| m.to_string()),
                );
                out.insert("seed".to_string(), p.seed.to_string());
            }
            HyperParameters::DecisionTree(p) => {
                out.insert("max_depth".to_string(), fmt_depth(p.max_depth));
                out.insert("min_samples_leaf".to_string(), p.min_samples_leaf.to_string());
                out.insert("min_samples_split".to_string(), p.min_samples_split.to_string());
            }
            HyperParameters::Baseline => {}
        }
        out
    }
}

/// Fitted regressor state
#[derive(Serialize, Deserialize)]
pub enum Estimator {
    RandomForest(Forest),
    DecisionTree(Tree),
    Baseline { mean: f64 },
}

impl fmt::Debug for Estimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Estimator::RandomForest(_) => f.write_str("Estimator::RandomForest"),
            Estimator::DecisionTree(_) => f.write_str("Estimator::DecisionTree"),
            Estimator::Baseline { mean } => write!(f, "Estimator::Baseline {{ mean: {mean} }}"),
        }
    }
}

impl Estimator {
    /// Fit a fresh estimator of the family named by `params`
    pub fn fit(params: &HyperParameters, x: &Array2<f64>, y: &Array1<f64>) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(AppError::Training(format!(
                "Feature rows ({}) and targets ({}) differ",
                x.nrows(),
                y.len()
            )));
        }
        if y.is_empty() {
            return Err(AppError::Training("Cannot fit on an empty dataset".to_string()));
        }

        match params {
            HyperParameters::RandomForest(p) => {
                let forest = Forest::fit(&to_dense_matrix(x), &y.to_vec(), p.to_smartcore())
                    .map_err(|e| {
                        AppError::Training(format!("Failed to train random forest: {}", e))
                    })?;
                Ok(Estimator::RandomForest(forest))
            }
            HyperParameters::DecisionTree(p) => {
                let tree = Tree::fit(&to_dense_matrix(x), &y.to_vec(), p.to_smartcore())
                    .map_err(|e| {
                        AppError::Training(format!("Failed to train decision tree: {}", e))
                    })?;
                Ok(Estimator::DecisionTree(tree))
            }
            HyperParameters::Baseline => Ok(Estimator::Baseline {
                mean: y.mean().unwrap_or_default(),
            }),
        }
    }

    /// Predict one value per row of `x`
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let predictions = match self {
            Estimator::RandomForest(forest) => forest
                .predict(&to_dense_matrix(x))
                .map_err(|e| AppError::Training(format!("Prediction failed: {}", e)))?,
            Estimator::DecisionTree(tree) => tree
                .predict(&to_dense_matrix(x))
                .map_err(|e| AppError::Training(format!("Prediction failed: {}", e)))?,
            Estimator::Baseline { mean } => vec![*mean; x.nrows()],
        };
        Ok(Array1::from_vec(predictions))
    }
}

fn to_dense_matrix(arr: &Array2<f64>) -> DenseMatrix<f64> {
    let shape = arr.shape();
    let data: Vec<f64> = arr.iter().copied().collect();
    DenseMatrix::new(shape[0], shape[1], data, false)
}

/// Root mean squared error
pub fn rmse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(AppError::Training(format!(
            "Cannot score {} predictions against {} targets",
            y_pred.len(),
            y_true.len()
        )));
    }
    if y_true.is_empty() {
        return Err(AppError::Training("Cannot score an empty partition".to_string()));
    }
    let mse = (y_true - y_pred).mapv(|e| e * e).mean().unwrap_or_default();
    Ok(mse.sqrt())
}
