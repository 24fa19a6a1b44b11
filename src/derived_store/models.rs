use crate::catalog_store::FacetKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of a user's per-axis taste profile. `rank` starts at 1 and
/// rows for a user carry non-increasing `mean_score` in rank order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffinityRow {
    pub user_id: i64,
    pub facet_kind: FacetKind,
    pub facet_value: String,
    pub rank: usize,
    pub mean_score: f64,
    pub computed_at: DateTime<Utc>,
}

/// One candidate book for a user, tied to the favored facet value that
/// produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRow {
    pub user_id: i64,
    pub facet_kind: FacetKind,
    pub facet_value: String,
    pub book_id: String,
    pub computed_at: DateTime<Utc>,
}

/// One community trend candidate: how many shelves carry this book, per tag.
/// Backfilled books carry a `shelf_count` of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendRow {
    pub tag: String,
    pub book_id: String,
    pub shelf_count: usize,
    pub computed_at: DateTime<Utc>,
}
