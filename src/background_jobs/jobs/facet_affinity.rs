//! Facet affinity computation job.
//!
//! Turns raw ratings into a per-user taste profile along one facet axis:
//! every rating fans out to the facet values the rated book carries, the
//! per-value means are ranked and the top K become the user's affinity
//! snapshot for that axis. One generic job, registered once per axis.

use crate::background_jobs::{
    context::JobContext,
    job::{BackgroundJob, HookEvent, JobError, JobSchedule, ShutdownBehavior},
    JobAuditLogger,
};
use crate::catalog_store::FacetKind;
use crate::config::PipelineSettings;
use crate::derived_store::AffinityRow;
use crate::user_store::Rating;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Background job that computes per-user facet affinities.
///
/// Runs on startup and then periodically. The snapshot for its facet axis
/// is recomputed from scratch and replaced in a single transaction.
pub struct FacetAffinityJob {
    kind: FacetKind,
    top_k: usize,
    interval: Duration,
}

impl FacetAffinityJob {
    pub fn new(kind: FacetKind, settings: &PipelineSettings) -> Self {
        Self {
            kind,
            top_k: settings.affinity_top_k,
            interval: Duration::from_secs(settings.affinity_interval_minutes * 60),
        }
    }

    /// Fan ratings out to facet values and keep each user's top K means.
    ///
    /// Ties on the mean break lexically on the facet value, so reruns over
    /// unchanged input produce identical snapshots.
    fn compute_affinities(
        ratings: &[Rating],
        facet_values_by_book: &HashMap<String, Vec<String>>,
        top_k: usize,
        computed_at: DateTime<Utc>,
        kind: FacetKind,
    ) -> Vec<AffinityRow> {
        // (user, facet value) -> (score sum, rating count)
        let mut accumulated: HashMap<i64, HashMap<&str, (f64, usize)>> = HashMap::new();
        for rating in ratings {
            let Some(values) = facet_values_by_book.get(&rating.book_id) else {
                continue;
            };
            let user_entry = accumulated.entry(rating.user_id).or_default();
            for value in values {
                let slot = user_entry.entry(value.as_str()).or_insert((0.0, 0));
                slot.0 += rating.score;
                slot.1 += 1;
            }
        }

        let mut user_ids: Vec<i64> = accumulated.keys().copied().collect();
        user_ids.sort_unstable();

        let mut rows = Vec::new();
        for user_id in user_ids {
            let mut means: Vec<(&str, f64)> = accumulated[&user_id]
                .iter()
                .map(|(value, (sum, count))| (*value, sum / *count as f64))
                .collect();
            means.sort_by(|a, b| {
                b.1.partial_cmp(&a.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.0.cmp(b.0))
            });

            for (rank_index, (value, mean_score)) in means.into_iter().take(top_k).enumerate() {
                rows.push(AffinityRow {
                    user_id,
                    facet_kind: kind,
                    facet_value: value.to_string(),
                    rank: rank_index + 1,
                    mean_score,
                    computed_at,
                });
            }
        }
        rows
    }
}

impl BackgroundJob for FacetAffinityJob {
    fn id(&self) -> &'static str {
        match self.kind {
            FacetKind::Tag => "tag_affinity",
            FacetKind::Category => "category_affinity",
            FacetKind::Author => "author_affinity",
        }
    }

    fn name(&self) -> &'static str {
        match self.kind {
            FacetKind::Tag => "Tag Affinity",
            FacetKind::Category => "Category Affinity",
            FacetKind::Author => "Author Affinity",
        }
    }

    fn description(&self) -> &'static str {
        match self.kind {
            FacetKind::Tag => "Compute each reader's favorite tags from their ratings",
            FacetKind::Category => "Compute each reader's favorite categories from their ratings",
            FacetKind::Author => "Compute each reader's favorite authors from their ratings",
        }
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::Combined {
            interval: Some(self.interval),
            hooks: vec![HookEvent::OnStartup],
        }
    }

    fn shutdown_behavior(&self) -> ShutdownBehavior {
        // A cancelled run leaves the previous snapshot intact
        ShutdownBehavior::Cancellable
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let audit = JobAuditLogger::new(Arc::clone(&ctx.server_store), self.id());

        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let ratings = match ctx.user_store.get_all_ratings() {
            Ok(ratings) => ratings,
            Err(e) => {
                let error_msg = format!("Failed to load ratings: {}", e);
                audit.log_failed(&error_msg, None);
                return Err(JobError::ExecutionFailed(error_msg));
            }
        };
        let facet_values_by_book = match ctx.catalog_store.get_facet_values_by_book(self.kind) {
            Ok(map) => map,
            Err(e) => {
                let error_msg = format!("Failed to load {} values: {}", self.kind, e);
                audit.log_failed(&error_msg, None);
                return Err(JobError::ExecutionFailed(error_msg));
            }
        };

        audit.log_started(Some(serde_json::json!({
            "facet_kind": self.kind.as_str(),
            "ratings_count": ratings.len(),
            "faceted_books_count": facet_values_by_book.len(),
            "top_k": self.top_k,
        })));
        debug!(
            "Computing {} affinities from {} ratings over {} faceted books",
            self.kind,
            ratings.len(),
            facet_values_by_book.len()
        );

        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let rows = Self::compute_affinities(
            &ratings,
            &facet_values_by_book,
            self.top_k,
            Utc::now(),
            self.kind,
        );

        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        if let Err(e) = ctx.derived_store.replace_affinity(self.kind, &rows) {
            let error_msg = format!("Failed to replace {} affinity snapshot: {}", self.kind, e);
            audit.log_failed(&error_msg, None);
            return Err(JobError::ExecutionFailed(error_msg));
        }

        info!(
            "{} affinity snapshot replaced with {} rows",
            self.kind,
            rows.len()
        );
        audit.log_completed(Some(serde_json::json!({
            "rows_written": rows.len(),
        })));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(user_id: i64, book_id: &str, score: f64) -> Rating {
        Rating {
            user_id,
            book_id: book_id.to_string(),
            score,
            rated_at: Utc::now(),
        }
    }

    fn facet_map(entries: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(book, values)| {
                (
                    book.to_string(),
                    values.iter().map(|v| v.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_job_metadata_per_kind() {
        let settings = PipelineSettings::default();
        let tag_job = FacetAffinityJob::new(FacetKind::Tag, &settings);
        let author_job = FacetAffinityJob::new(FacetKind::Author, &settings);

        assert_eq!(tag_job.id(), "tag_affinity");
        assert_eq!(author_job.id(), "author_affinity");
        assert_eq!(tag_job.shutdown_behavior(), ShutdownBehavior::Cancellable);
        match tag_job.schedule() {
            JobSchedule::Combined { interval, hooks } => {
                assert!(interval.is_some());
                assert!(hooks.contains(&HookEvent::OnStartup));
            }
            _ => panic!("Expected Combined schedule"),
        }
    }

    #[test]
    fn test_means_ranked_descending() {
        let ratings = [
            rating(1, "b1", 5.0),
            rating(1, "b2", 5.0),
            rating(1, "b3", 2.0),
        ];
        let facets = facet_map(&[
            ("b1", &["noir"]),
            ("b2", &["noir"]),
            ("b3", &["cozy"]),
        ]);

        let rows =
            FacetAffinityJob::compute_affinities(&ratings, &facets, 5, Utc::now(), FacetKind::Tag);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].facet_value, "noir");
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].mean_score, 5.0);
        assert_eq!(rows[1].facet_value, "cozy");
        assert_eq!(rows[1].rank, 2);
        assert!(rows[0].mean_score >= rows[1].mean_score);
    }

    #[test]
    fn test_rating_fans_out_to_all_facet_values() {
        let ratings = [rating(1, "b1", 4.0)];
        let facets = facet_map(&[("b1", &["noir", "mystery", "classic"])]);

        let rows =
            FacetAffinityJob::compute_affinities(&ratings, &facets, 5, Utc::now(), FacetKind::Tag);

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.mean_score == 4.0));
    }

    #[test]
    fn test_ties_break_lexically() {
        let ratings = [rating(1, "b1", 3.0), rating(1, "b2", 3.0)];
        let facets = facet_map(&[("b1", &["zebra"]), ("b2", &["aardvark"])]);

        let rows =
            FacetAffinityJob::compute_affinities(&ratings, &facets, 5, Utc::now(), FacetKind::Tag);

        assert_eq!(rows[0].facet_value, "aardvark");
        assert_eq!(rows[1].facet_value, "zebra");
    }

    #[test]
    fn test_top_k_truncates_never_pads() {
        let ratings: Vec<Rating> = (0..8).map(|i| rating(1, &format!("b{i}"), 3.0)).collect();
        let entries: Vec<(String, Vec<String>)> = (0..8)
            .map(|i| (format!("b{i}"), vec![format!("tag{i}")]))
            .collect();
        let facets: HashMap<String, Vec<String>> = entries.into_iter().collect();

        let rows =
            FacetAffinityJob::compute_affinities(&ratings, &facets, 5, Utc::now(), FacetKind::Tag);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows.last().unwrap().rank, 5);

        // A user with fewer values than K gets fewer rows
        let small = [rating(2, "b0", 4.0)];
        let rows =
            FacetAffinityJob::compute_affinities(&small, &facets, 5, Utc::now(), FacetKind::Tag);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_books_without_facet_values_contribute_nothing() {
        let ratings = [rating(1, "b1", 5.0), rating(1, "unfaceted", 1.0)];
        let facets = facet_map(&[("b1", &["noir"])]);

        let rows =
            FacetAffinityJob::compute_affinities(&ratings, &facets, 5, Utc::now(), FacetKind::Tag);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].mean_score, 5.0);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let ratings = [
            rating(1, "b1", 4.0),
            rating(1, "b2", 2.5),
            rating(2, "b1", 3.0),
        ];
        let facets = facet_map(&[("b1", &["noir", "classic"]), ("b2", &["noir"])]);
        let computed_at = Utc::now();

        let first = FacetAffinityJob::compute_affinities(
            &ratings,
            &facets,
            5,
            computed_at,
            FacetKind::Tag,
        );
        let second = FacetAffinityJob::compute_affinities(
            &ratings,
            &facets,
            5,
            computed_at,
            FacetKind::Tag,
        );
        assert_eq!(first, second);
    }
}
