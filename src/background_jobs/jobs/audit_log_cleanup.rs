//! Audit log cleanup background job.
//!
//! This job periodically deletes old audit log entries based on
//! the configured retention period.

use crate::background_jobs::{
    context::JobContext,
    job::{BackgroundJob, JobError, JobSchedule, ShutdownBehavior},
};
use crate::config::BackgroundJobsSettings;
use std::time::Duration;
use tracing::info;

/// Background job that cleans up old audit log entries.
///
/// Deletes audit log entries older than the configured retention period.
pub struct AuditLogCleanupJob {
    retention_days: u64,
    interval: Duration,
}

impl AuditLogCleanupJob {
    pub fn new(settings: &BackgroundJobsSettings) -> Self {
        Self {
            retention_days: settings.audit_retention_days,
            interval: Duration::from_secs(settings.audit_cleanup_interval_hours * 60 * 60),
        }
    }
}

impl BackgroundJob for AuditLogCleanupJob {
    fn id(&self) -> &'static str {
        "audit_log_cleanup"
    }

    fn name(&self) -> &'static str {
        "Audit Log Cleanup"
    }

    fn description(&self) -> &'static str {
        "Delete old audit log entries based on retention policy"
    }

    fn schedule(&self) -> JobSchedule {
        // No startup run needed
        JobSchedule::Interval(self.interval)
    }

    fn shutdown_behavior(&self) -> ShutdownBehavior {
        // Cleanup can happen next run
        ShutdownBehavior::Cancellable
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| JobError::ExecutionFailed(e.to_string()))?
            .as_secs() as i64;
        let cutoff = now - (self.retention_days as i64 * 24 * 60 * 60);

        info!(
            "Cleaning up audit log entries older than {} days (cutoff: {})",
            self.retention_days, cutoff
        );

        let deleted = ctx
            .server_store
            .cleanup_old_job_audit_entries(cutoff)
            .map_err(|e| JobError::ExecutionFailed(e.to_string()))?;

        if deleted > 0 {
            info!("Deleted {} old audit log entries", deleted);
        } else {
            info!("No audit log entries to clean up");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_metadata() {
        let settings = BackgroundJobsSettings::default();
        let job = AuditLogCleanupJob::new(&settings);

        assert_eq!(job.id(), "audit_log_cleanup");
        assert_eq!(job.shutdown_behavior(), ShutdownBehavior::Cancellable);
        match job.schedule() {
            JobSchedule::Interval(duration) => {
                assert_eq!(duration, Duration::from_secs(24 * 60 * 60));
            }
            _ => panic!("Expected Interval schedule"),
        }
    }

    #[test]
    fn test_retention_calculation() {
        let retention_days: u64 = 90;
        let now: i64 = 1700000000;
        let cutoff = now - (retention_days as i64 * 24 * 60 * 60);

        // 90 days in seconds = 90 * 24 * 60 * 60 = 7,776,000
        assert_eq!(cutoff, now - 7_776_000);
    }
}
