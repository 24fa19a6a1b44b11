//! Facet recommendation job.
//!
//! Reads the latest affinity snapshot for its facet axis and turns each
//! favored facet value into a quota-bounded candidate book list. Candidate
//! sets are per facet value and shared by every user favoring it: books
//! carrying the value are ranked by global mean rating, and when fewer
//! rated books exist than the quota the remainder is backfilled with
//! randomly drawn unrated books carrying the same value.

use crate::background_jobs::{
    context::JobContext,
    job::{BackgroundJob, HookEvent, JobError, JobSchedule, ShutdownBehavior},
    JobAuditLogger,
};
use crate::catalog_store::FacetKind;
use crate::config::PipelineSettings;
use crate::derived_store::RecommendationRow;
use crate::user_store::Rating;
use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Background job that computes per-user book candidates for one facet
/// axis. Registered for tags and categories.
pub struct FacetRecommendationJob {
    kind: FacetKind,
    quota: usize,
    interval: Duration,
}

impl FacetRecommendationJob {
    pub fn new(kind: FacetKind, settings: &PipelineSettings) -> Self {
        Self {
            kind,
            quota: settings.candidate_quota,
            interval: Duration::from_secs(settings.recommendation_interval_minutes * 60),
        }
    }

    /// Global mean score per book, over every rating in the store.
    fn global_means(ratings: &[Rating]) -> HashMap<String, f64> {
        let mut accumulated: HashMap<&str, (f64, usize)> = HashMap::new();
        for rating in ratings {
            let slot = accumulated.entry(rating.book_id.as_str()).or_insert((0.0, 0));
            slot.0 += rating.score;
            slot.1 += 1;
        }
        accumulated
            .into_iter()
            .map(|(book_id, (sum, count))| (book_id.to_string(), sum / count as f64))
            .collect()
    }

    /// Pick up to `quota` candidates from the books carrying one facet value.
    ///
    /// Rated books come first, global mean descending with ties on book id;
    /// unrated books backfill in random order. Never pads beyond the pool.
    fn select_candidates<R: Rng>(
        pool: &[String],
        global_means: &HashMap<String, f64>,
        quota: usize,
        rng: &mut R,
    ) -> Vec<String> {
        let mut rated: Vec<&String> = pool
            .iter()
            .filter(|id| global_means.contains_key(*id))
            .collect();
        rated.sort_by(|a, b| {
            global_means[*b]
                .partial_cmp(&global_means[*a])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.cmp(b))
        });

        let mut selected: Vec<String> = rated.into_iter().take(quota).cloned().collect();
        if selected.len() < quota {
            let mut unrated: Vec<&String> = pool
                .iter()
                .filter(|id| !global_means.contains_key(*id))
                .collect();
            unrated.shuffle(rng);
            selected.extend(
                unrated
                    .into_iter()
                    .take(quota - selected.len())
                    .cloned(),
            );
        }
        selected
    }
}

impl BackgroundJob for FacetRecommendationJob {
    fn id(&self) -> &'static str {
        match self.kind {
            FacetKind::Tag => "tag_recommendations",
            FacetKind::Category => "category_recommendations",
            FacetKind::Author => "author_recommendations",
        }
    }

    fn name(&self) -> &'static str {
        match self.kind {
            FacetKind::Tag => "Tag Recommendations",
            FacetKind::Category => "Category Recommendations",
            FacetKind::Author => "Author Recommendations",
        }
    }

    fn description(&self) -> &'static str {
        match self.kind {
            FacetKind::Tag => "Build candidate book lists from each reader's favorite tags",
            FacetKind::Category => {
                "Build candidate book lists from each reader's favorite categories"
            }
            FacetKind::Author => "Build candidate book lists from each reader's favorite authors",
        }
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::Combined {
            interval: Some(self.interval),
            hooks: vec![HookEvent::OnStartup],
        }
    }

    fn shutdown_behavior(&self) -> ShutdownBehavior {
        ShutdownBehavior::Cancellable
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let audit = JobAuditLogger::new(Arc::clone(&ctx.server_store), self.id());

        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        // The affinity snapshot may be one cycle stale; jobs are scheduled
        // independently.
        let affinity = match ctx.derived_store.get_affinity(self.kind) {
            Ok(rows) => rows,
            Err(e) => {
                let error_msg = format!("Failed to load {} affinity snapshot: {}", self.kind, e);
                audit.log_failed(&error_msg, None);
                return Err(JobError::ExecutionFailed(error_msg));
            }
        };
        let ratings = match ctx.user_store.get_all_ratings() {
            Ok(ratings) => ratings,
            Err(e) => {
                let error_msg = format!("Failed to load ratings: {}", e);
                audit.log_failed(&error_msg, None);
                return Err(JobError::ExecutionFailed(error_msg));
            }
        };

        audit.log_started(Some(serde_json::json!({
            "facet_kind": self.kind.as_str(),
            "affinity_rows": affinity.len(),
            "ratings_count": ratings.len(),
            "quota": self.quota,
        })));

        let global_means = Self::global_means(&ratings);
        let favored_values: BTreeSet<&str> =
            affinity.iter().map(|row| row.facet_value.as_str()).collect();
        debug!(
            "Selecting {} candidates for {} distinct favored values",
            self.kind,
            favored_values.len()
        );

        let mut rng = rand::rng();
        let mut candidates_by_value: HashMap<&str, Vec<String>> = HashMap::new();
        for value in favored_values {
            if ctx.is_cancelled() {
                return Err(JobError::Cancelled);
            }
            let pool = match ctx.catalog_store.get_books_with_facet_value(self.kind, value) {
                Ok(pool) => pool,
                Err(e) => {
                    let error_msg =
                        format!("Failed to load books for {} '{}': {}", self.kind, value, e);
                    audit.log_failed(&error_msg, None);
                    return Err(JobError::ExecutionFailed(error_msg));
                }
            };
            let selected = Self::select_candidates(&pool, &global_means, self.quota, &mut rng);
            candidates_by_value.insert(value, selected);
        }

        let computed_at = Utc::now();
        let mut rows = Vec::new();
        for affinity_row in &affinity {
            if let Some(candidates) = candidates_by_value.get(affinity_row.facet_value.as_str()) {
                for book_id in candidates {
                    rows.push(RecommendationRow {
                        user_id: affinity_row.user_id,
                        facet_kind: self.kind,
                        facet_value: affinity_row.facet_value.clone(),
                        book_id: book_id.clone(),
                        computed_at,
                    });
                }
            }
        }

        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        if let Err(e) = ctx.derived_store.replace_recommendations(self.kind, &rows) {
            let error_msg = format!(
                "Failed to replace {} recommendation snapshot: {}",
                self.kind, e
            );
            audit.log_failed(&error_msg, None);
            return Err(JobError::ExecutionFailed(error_msg));
        }

        info!(
            "{} recommendation snapshot replaced with {} rows",
            self.kind,
            rows.len()
        );
        audit.log_completed(Some(serde_json::json!({
            "rows_written": rows.len(),
        })));

        Ok(())
    }
}
