use super::context::JobContext;
use std::time::Duration;
use thiserror::Error;

/// Schedule for when a job should run.
#[derive(Debug, Clone)]
pub enum JobSchedule {
    /// Run at fixed intervals
    Interval(Duration),
    /// Run only in response to hooks
    Hook(HookEvent),
    /// Combination of scheduled and hook-triggered
    Combined {
        interval: Option<Duration>,
        hooks: Vec<HookEvent>,
    },
}

/// Events that can trigger hook-based jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    OnStartup,
}

impl std::fmt::Display for HookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookEvent::OnStartup => write!(f, "OnStartup"),
        }
    }
}

/// How a job should be handled during server shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownBehavior {
    /// Job can be cancelled immediately
    #[default]
    Cancellable,
    /// Wait for job to complete before shutdown
    WaitForCompletion,
}

/// Errors that can occur during job execution.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job not found")]
    NotFound,
    #[error("Job is already running")]
    AlreadyRunning,
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
    #[error("Job was cancelled")]
    Cancelled,
}

/// Trait for background jobs.
///
/// Jobs are executed synchronously in a blocking context.
/// Long-running work should check for cancellation between phases.
pub trait BackgroundJob: Send + Sync {
    /// Unique identifier for this job.
    fn id(&self) -> &'static str;

    /// Human-readable name for this job.
    fn name(&self) -> &'static str;

    /// Description of what this job does.
    fn description(&self) -> &'static str;

    /// When this job should be scheduled to run.
    fn schedule(&self) -> JobSchedule;

    /// How this job should be handled during shutdown.
    fn shutdown_behavior(&self) -> ShutdownBehavior {
        ShutdownBehavior::Cancellable
    }

    /// Execute the job.
    ///
    /// This method is called from a blocking context using `spawn_blocking`.
    /// The implementation should periodically check `ctx.is_cancelled()` for
    /// long-running operations and return early with `JobError::Cancelled` if true.
    fn execute(&self, ctx: &JobContext) -> Result<(), JobError>;
}
