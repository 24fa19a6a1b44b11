//! Shelf trends job.
//!
//! Counts how often each book appears on reader shelves, grouped by tag,
//! and keeps the top books per tag as trend candidates. Tags nobody has
//! shelved produce no rows at all; tags with some shelf activity are
//! backfilled with randomly drawn unshelved books carrying the same tag.

use crate::background_jobs::{
    context::JobContext,
    job::{BackgroundJob, HookEvent, JobError, JobSchedule, ShutdownBehavior},
    JobAuditLogger,
};
use crate::catalog_store::FacetKind;
use crate::config::PipelineSettings;
use crate::derived_store::TrendRow;
use crate::user_store::ShelfEntry;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Background job that derives per-tag trending book candidates from
/// shelf activity.
pub struct ShelfTrendsJob {
    quota: usize,
    interval: Duration,
}

impl ShelfTrendsJob {
    pub fn new(settings: &PipelineSettings) -> Self {
        Self {
            quota: settings.candidate_quota,
            interval: Duration::from_secs(settings.trends_interval_minutes * 60),
        }
    }

    /// Count shelf occurrences per (tag, book) and keep each tag's top
    /// `quota` books, backfilling with random zero-count books of the
    /// same tag. Tags with no shelf activity are skipped entirely.
    fn compute_trends<R: Rng>(
        shelf_entries: &[ShelfEntry],
        tags_by_book: &HashMap<String, Vec<String>>,
        quota: usize,
        computed_at: DateTime<Utc>,
        rng: &mut R,
    ) -> Vec<TrendRow> {
        // tag -> book -> shelf count
        let mut counts: BTreeMap<&str, HashMap<&str, usize>> = BTreeMap::new();
        for entry in shelf_entries {
            let Some(tags) = tags_by_book.get(&entry.book_id) else {
                continue;
            };
            for tag in tags {
                *counts
                    .entry(tag.as_str())
                    .or_default()
                    .entry(entry.book_id.as_str())
                    .or_insert(0) += 1;
            }
        }

        let mut rows = Vec::new();
        for (tag, book_counts) in counts {
            let mut ranked: Vec<(&str, usize)> =
                book_counts.iter().map(|(book, count)| (*book, *count)).collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            ranked.truncate(quota);

            if ranked.len() < quota {
                let mut unshelved: Vec<&str> = tags_by_book
                    .iter()
                    .filter(|(book, tags)| {
                        tags.iter().any(|t| t == tag) && !book_counts.contains_key(book.as_str())
                    })
                    .map(|(book, _)| book.as_str())
                    .collect();
                unshelved.shuffle(rng);
                ranked.extend(
                    unshelved
                        .into_iter()
                        .take(quota - ranked.len())
                        .map(|book| (book, 0)),
                );
            }

            for (book_id, shelf_count) in ranked {
                rows.push(TrendRow {
                    tag: tag.to_string(),
                    book_id: book_id.to_string(),
                    shelf_count,
                    computed_at,
                });
            }
        }
        rows
    }
}

impl BackgroundJob for ShelfTrendsJob {
    fn id(&self) -> &'static str {
        "shelf_trends"
    }

    fn name(&self) -> &'static str {
        "Shelf Trends"
    }

    fn description(&self) -> &'static str {
        "Rank each tag's most shelved books as trend candidates"
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

        let shelf_entries = match ctx.user_store.get_all_shelf_entries() {
            Ok(entries) => entries,
            Err(e) => {
                let error_msg = format!("Failed to load shelf entries: {}", e);
                audit.log_failed(&error_msg, None);
                return Err(JobError::ExecutionFailed(error_msg));
            }
        };
        let tags_by_book = match ctx.catalog_store.get_facet_values_by_book(FacetKind::Tag) {
            Ok(map) => map,
            Err(e) => {
                let error_msg = format!("Failed to load tags: {}", e);
                audit.log_failed(&error_msg, None);
                return Err(JobError::ExecutionFailed(error_msg));
            }
        };

        audit.log_started(Some(serde_json::json!({
            "shelf_entries_count": shelf_entries.len(),
            "tagged_books_count": tags_by_book.len(),
            "quota": self.quota,
        })));
        debug!(
            "Computing shelf trends from {} entries over {} tagged books",
            shelf_entries.len(),
            tags_by_book.len()
        );

        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let mut rng = rand::rng();
        let rows = Self::compute_trends(
            &shelf_entries,
            &tags_by_book,
            self.quota,
            Utc::now(),
            &mut rng,
        );

        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        if let Err(e) = ctx.derived_store.replace_trends(&rows) {
            let error_msg = format!("Failed to replace trend snapshot: {}", e);
            audit.log_failed(&error_msg, None);
            return Err(JobError::ExecutionFailed(error_msg));
        }

        info!("Trend snapshot replaced with {} rows", rows.len());
        audit.log_completed(Some(serde_json::json!({
            "rows_written": rows.len(),
        })));

        Ok(())
    }
}
