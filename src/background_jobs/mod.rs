//! Background job scheduling and execution system.
//!
//! This module provides infrastructure for running the periodic and
//! startup-triggered batch jobs that derive affinities, recommendation
//! candidates and shelf trends from reader activity.

mod audit_logger;
mod context;
mod handle;
mod job;
pub mod jobs;
mod scheduler;

pub use audit_logger::JobAuditLogger;
pub use context::JobContext;
pub use handle::{JobInfo, JobRunInfo, JobScheduleInfo, SchedulerHandle};
pub use job::{BackgroundJob, HookEvent, JobError, JobSchedule, ShutdownBehavior};
pub use scheduler::{create_scheduler, JobScheduler};
