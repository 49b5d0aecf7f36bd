//! Periodic-task scheduler.
//!
//! # Data Flow
//! ```text
//! Scheduler::every(name, interval, job)   (registration, before start)
//!     → start: one task per job, ticking on its interval
//!     → tick: run the job to completion, log + count the result
//!     → stop: no new runs; wait for in-flight runs to finish
//! ```
//!
//! # Design Decisions
//! - First run happens one interval after start, not immediately
//! - Runs of the same job never overlap; missed ticks are skipped
//! - A failing job is logged and keeps its schedule

mod job;

use std::future::Future;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::task::JoinSet;

use crate::lifecycle::{Shutdown, StartError, StopError, Subsystem};

pub use job::{Job, JobResult};

/// Scheduler subsystem running registered jobs on fixed intervals.
pub struct Scheduler {
    jobs: Vec<Job>,
    shutdown: Shutdown,
    tasks: JoinSet<()>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            shutdown: Shutdown::new(),
            tasks: JoinSet::new(),
        }
    }

    /// Register a job to run every `interval`.
    pub fn every<F, Fut>(mut self, name: &str, interval: Duration, run: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JobResult> + Send + 'static,
    {
        self.jobs.push(Job::new(name, interval, run));
        self
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Subsystem for Scheduler {
    fn name(&self) -> &str {
        "scheduler"
    }

    fn start(&mut self) -> BoxFuture<'_, Result<(), StartError>> {
        async move {
            if let Some(job) = self.jobs.iter().find(|job| job.interval().is_zero()) {
                return Err(StartError::Other(format!("job {} has a zero interval", job.name())));
            }

            for job in self.jobs.drain(..) {
                let shutdown = self.shutdown.subscribe();
                self.tasks.spawn(job.run_until(shutdown));
            }

            tracing::info!(jobs = self.tasks.len(), "Scheduler started");
            Ok(())
        }
        .boxed()
    }

    fn stop(self: Box<Self>) -> BoxFuture<'static, Result<(), StopError>> {
        let Scheduler { shutdown, mut tasks, .. } = *self;
        async move {
            shutdown.trigger();

            let mut panicked = Vec::new();
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    if e.is_panic() {
                        panicked.push(e.to_string());
                    }
                }
            }

            if panicked.is_empty() {
                tracing::debug!("Scheduler stopped");
                Ok(())
            } else {
                Err(StopError::Job {
                    name: "scheduler".to_string(),
                    detail: format!("{} job task(s) panicked", panicked.len()),
                })
            }
        }
        .boxed()
    }
}
