//! FNOL claims triage
//!
//! Claims analytics, ultimate claim cost prediction, and a retraining loop
//! that promotes a candidate regressor only when it beats production on
//! held-out data.

pub mod analytics;
pub mod config;
pub mod data;
pub mod error;
pub mod ml;
pub mod models;
pub mod registry;
pub mod telemetry;

pub use error::{AppError, Result};
