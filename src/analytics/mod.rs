//! Claims portfolio analytics
//!
//! Headline KPIs, grouped estimated-vs-ultimate summaries, label frequencies
//! and monthly volumes over a loaded claims table. Results are plain
//! serializable values; rendering belongs to the caller.
//!
//! # Example
//!
//! ```no_run
//! use fnol_triage::analytics::ClaimsOverview;
//! use fnol_triage::data::load_claims;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let claims = load_claims("FNOL_DATA/Claims_Policy_merged_cleaned.csv")?;
//!     let overview = ClaimsOverview::from_records(&claims);
//!     println!("{} claims, variance {:?}%", overview.claim_count, overview.kpis.variance_pct);
//!     Ok(())
//! }
//! ```

mod overview;
mod statistics;

pub use overview::{ClaimsOverview, KeyIndicators, MostCommon};
pub use statistics::{
    group_summaries, monthly_counts, percentile, value_counts, Distribution, GroupSummary,
    MonthlyCount, ValueCount,
};
