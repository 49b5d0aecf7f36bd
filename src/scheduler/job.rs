//! A single periodic job.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::lifecycle::ShutdownListener;
use crate::observability::metrics;

/// Result of one job run.
pub type JobResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

type JobFn = Arc<dyn Fn() -> BoxFuture<'static, JobResult> + Send + Sync>;

/// A named job and its interval.
pub struct Job {
    name: String,
    interval: Duration,
    run: JobFn,
}

impl Job {
    pub fn new<F, Fut>(name: &str, interval: Duration, run: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JobResult> + Send + 'static,
    {
        Self {
            name: name.to_string(),
            interval,
            run: Arc::new(move || run().boxed()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Tick until `shutdown` fires. A run already in progress is finished first.
    pub(crate) async fn run_until(self, mut shutdown: ShutdownListener) {
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {}
            }

            let started = Instant::now();
            match (self.run)().await {
                Ok(()) => {
                    tracing::debug!(job = %self.name, elapsed_ms = started.elapsed().as_millis() as u64, "Job finished");
                    metrics::record_job_run(&self.name, true);
                }
                Err(e) => {
                    tracing::error!(job = %self.name, error = %e, "Job failed");
                    metrics::record_job_run(&self.name, false);
                }
            }
        }

        tracing::debug!(job = %self.name, "Job stopped");
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .finish()
    }
}
