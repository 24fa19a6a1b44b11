//! DerivedStore trait definition.

use super::models::{AffinityRow, RecommendationRow, TrendRow};
use crate::catalog_store::FacetKind;
use anyhow::Result;

/// Storage for the pipeline's output tables.
///
/// The replace operations run as single transactions: readers observe either
/// the previous snapshot or the new one, never a partially rebuilt table.
pub trait DerivedStore: Send + Sync {
    /// Replace the whole affinity snapshot for one facet axis.
    fn replace_affinity(&self, kind: FacetKind, rows: &[AffinityRow]) -> Result<()>;

    /// Affinity rows for one facet axis, ordered by (user, rank).
    fn get_affinity(&self, kind: FacetKind) -> Result<Vec<AffinityRow>>;

    /// One user's affinity rows for one facet axis, in rank order.
    fn get_user_affinity(&self, user_id: i64, kind: FacetKind) -> Result<Vec<AffinityRow>>;

    /// Replace the whole recommendation snapshot for one facet axis.
    fn replace_recommendations(&self, kind: FacetKind, rows: &[RecommendationRow]) -> Result<()>;

    /// One user's candidate books for one facet axis.
    fn get_user_recommendations(
        &self,
        user_id: i64,
        kind: FacetKind,
    ) -> Result<Vec<RecommendationRow>>;

    /// Replace the whole trend table.
    fn replace_trends(&self, rows: &[TrendRow]) -> Result<()>;

    /// Trend candidates for one tag, shelf count descending then book id.
    fn get_trending_books(&self, tag: &str) -> Result<Vec<TrendRow>>;

    /// Every trend row, for introspection and tests.
    fn get_all_trends(&self) -> Result<Vec<TrendRow>>;
}
