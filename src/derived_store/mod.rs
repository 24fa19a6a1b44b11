//! Pipeline-owned derived tables.
//!
//! Affinity snapshots, recommendation snapshots and trend candidates are
//! recomputed from scratch by the background jobs and replaced wholesale,
//! one facet kind (or the global trend table) per transaction. Nothing else
//! writes here.

mod models;
mod schema;
mod store;
mod trait_def;

pub use models::{AffinityRow, RecommendationRow, TrendRow};
pub use schema::DERIVED_VERSIONED_SCHEMAS;
pub use store::SqliteDerivedStore;
pub use trait_def::DerivedStore;
