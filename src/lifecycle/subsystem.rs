//! Subsystem contract and the handle the orchestrator drives it through.
//!
//! # Responsibilities
//! - Define the `start` / `stop` contract every background service implements
//! - Bound each `stop` by a deadline and report a terminal outcome
//! - Make `stop` idempotent so teardown never runs twice
//!
//! # Design Decisions
//! - Teardown runs on its own task; past the deadline the task is aborted,
//!   which drops the subsystem and releases what it still owns
//! - A teardown woken on the same timer tick as the deadline gets one more
//!   chance to finish, so completing exactly at the deadline counts as `Completed`

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;

use crate::lifecycle::outcome::ShutdownOutcome;

/// Error raised when a subsystem cannot start. Always fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid address {0}")]
    Address(String),
    #[error("{0} already started")]
    AlreadyStarted(String),
    #[error("{0}")]
    Other(String),
}

/// Error raised by a subsystem's own teardown.
#[derive(Debug, thiserror::Error)]
pub enum StopError {
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
    #[error("job {name} failed: {detail}")]
    Job { name: String, detail: String },
    #[error("{0}")]
    Other(String),
}

/// A long-running background service managed by the orchestrator.
pub trait Subsystem: Send + 'static {
    /// Name used in logs and outcomes.
    fn name(&self) -> &str;

    /// Begin running. Must return once the service is set up; the work itself
    /// runs on spawned tasks.
    fn start(&mut self) -> BoxFuture<'_, Result<(), StartError>>;

    /// Cease work and release resources. May take arbitrarily long; the
    /// handle bounds it.
    fn stop(self: Box<Self>) -> BoxFuture<'static, Result<(), StopError>>;
}

/// Where a handle is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubsystemState {
    Idle,
    Running,
    Failed,
    Stopping,
    Stopped(ShutdownOutcome),
}

/// Owning wrapper around a [`Subsystem`].
pub struct SubsystemHandle {
    name: String,
    inner: Option<Box<dyn Subsystem>>,
    state: SubsystemState,
}

impl SubsystemHandle {
    pub fn new(subsystem: impl Subsystem) -> Self {
        Self::from_boxed(Box::new(subsystem))
    }

    pub fn from_boxed(subsystem: Box<dyn Subsystem>) -> Self {
        Self {
            name: subsystem.name().to_string(),
            inner: Some(subsystem),
            state: SubsystemState::Idle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &SubsystemState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SubsystemState::Running
    }

    /// Start the subsystem. Only valid from `Idle`.
    pub async fn start(&mut self) -> Result<(), StartError> {
        let subsystem = match (&self.state, self.inner.as_mut()) {
            (SubsystemState::Idle, Some(subsystem)) => subsystem,
            _ => return Err(StartError::AlreadyStarted(self.name.clone())),
        };

        match subsystem.start().await {
            Ok(()) => {
                tracing::debug!(subsystem = %self.name, "Subsystem started");
                self.state = SubsystemState::Running;
                Ok(())
            }
            Err(e) => {
                self.state = SubsystemState::Failed;
                Err(e)
            }
        }
    }

    /// Stop the subsystem, giving it at most `deadline` from now.
    pub async fn stop(&mut self, deadline: Duration) -> ShutdownOutcome {
        self.stop_until(Instant::now() + deadline).await
    }

    /// Stop the subsystem, giving it until the `deadline` instant.
    ///
    /// Returns the cached outcome on every call after the first.
    pub async fn stop_until(&mut self, deadline: Instant) -> ShutdownOutcome {
        match &self.state {
            SubsystemState::Stopped(outcome) => return outcome.clone(),
            SubsystemState::Running => {}
            SubsystemState::Stopping => {
                // A previous stop was dropped mid-flight; its task was aborted.
                return self.finish(ShutdownOutcome::TimedOut);
            }
            SubsystemState::Idle | SubsystemState::Failed => {
                self.inner = None;
                return self.finish(ShutdownOutcome::Completed);
            }
        }

        let Some(subsystem) = self.inner.take() else {
            return self.finish(ShutdownOutcome::Completed);
        };

        self.state = SubsystemState::Stopping;
        let mut teardown = AbortOnDrop(tokio::spawn(subsystem.stop()));

        let outcome = match tokio::time::timeout_at(deadline, &mut teardown.0).await {
            Ok(result) => teardown_outcome(result),
            Err(_) => match settle(&mut teardown.0).await {
                Some(result) => teardown_outcome(result),
                None => ShutdownOutcome::TimedOut,
            },
        };
        drop(teardown);

        self.finish(outcome)
    }

    fn finish(&mut self, outcome: ShutdownOutcome) -> ShutdownOutcome {
        self.state = SubsystemState::Stopped(outcome.clone());
        outcome
    }
}

/// Yields allowed for a teardown that became ready on the deadline tick.
const SETTLE_YIELDS: usize = 4;

/// Give a teardown woken by the deadline tick a chance to run, then poll it once.
async fn settle<T>(task: &mut JoinHandle<T>) -> Option<Result<T, JoinError>> {
    for _ in 0..SETTLE_YIELDS {
        if task.is_finished() {
            break;
        }
        tokio::task::yield_now().await;
    }
    task.now_or_never()
}

fn teardown_outcome(result: Result<Result<(), StopError>, JoinError>) -> ShutdownOutcome {
    match result {
        Ok(Ok(())) => ShutdownOutcome::Completed,
        Ok(Err(e)) => ShutdownOutcome::Errored(e.to_string()),
        Err(e) if e.is_panic() => ShutdownOutcome::Errored("teardown panicked".to_string()),
        Err(e) => ShutdownOutcome::Errored(e.to_string()),
    }
}

impl std::fmt::Debug for SubsystemHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubsystemHandle")
            .field("name", &self.name)
            .field("state", &self.state)
            .finish()
    }
}

/// Aborts the wrapped task when dropped.
pub(crate) struct AbortOnDrop<T>(pub(crate) JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::testing::MockSubsystem;
    use std::sync::atomic::Ordering;

    #[tokio::test(start_paused = true)]
    async fn test_stop_completes_within_deadline() {
        let mock = MockSubsystem::new("http").stop_after(Duration::from_millis(50));
        let probe = mock.probe();
        let mut handle = SubsystemHandle::new(mock);

        handle.start().await.unwrap();
        assert!(handle.is_running());

        let outcome = handle.stop(Duration::from_secs(3)).await;
        assert_eq!(outcome, ShutdownOutcome::Completed);
        assert!(probe.released.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_on_deadline_counts_as_completed() {
        let mock = MockSubsystem::new("edge").stop_after(Duration::from_millis(100));
        let probe = mock.probe();
        let mut handle = SubsystemHandle::new(mock);
        handle.start().await.unwrap();

        let outcome = handle.stop(Duration::from_millis(100)).await;
        assert_eq!(outcome, ShutdownOutcome::Completed);
        assert_eq!(probe.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_stop_returns_cached_outcome() {
        let mock = MockSubsystem::new("cron").stop_after(Duration::from_millis(10));
        let probe = mock.probe();
        let mut handle = SubsystemHandle::new(mock);
        handle.start().await.unwrap();

        assert_eq!(handle.stop(Duration::from_secs(1)).await, ShutdownOutcome::Completed);

        let started = Instant::now();
        assert_eq!(handle.stop(Duration::from_secs(1)).await, ShutdownOutcome::Completed);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(probe.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_aborts_teardown_and_releases() {
        let mock = MockSubsystem::new("stuck").never_stops();
        let probe = mock.probe();
        let mut handle = SubsystemHandle::new(mock);
        handle.start().await.unwrap();

        let started = Instant::now();
        let outcome = handle.stop(Duration::from_millis(200)).await;
        assert_eq!(outcome, ShutdownOutcome::TimedOut);
        assert!(started.elapsed() >= Duration::from_millis(200));
        assert!(started.elapsed() < Duration::from_millis(250));

        // Let the aborted task unwind.
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(probe.released.load(Ordering::SeqCst));

        assert_eq!(handle.stop(Duration::from_millis(200)).await, ShutdownOutcome::TimedOut);
        assert_eq!(probe.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_error_and_panic_become_errored() {
        let mut failing = SubsystemHandle::new(MockSubsystem::new("db").stop_error("already closed"));
        failing.start().await.unwrap();
        match failing.stop(Duration::from_secs(1)).await {
            ShutdownOutcome::Errored(detail) => assert!(detail.contains("already closed")),
            other => panic!("unexpected outcome {:?}", other),
        }

        let mut panicking = SubsystemHandle::new(MockSubsystem::new("boom").panic_on_stop());
        panicking.start().await.unwrap();
        assert_eq!(
            panicking.stop(Duration::from_secs(1)).await,
            ShutdownOutcome::Errored("teardown panicked".to_string())
        );
    }

    #[tokio::test]
    async fn test_start_failure_and_never_started() {
        let mut handle = SubsystemHandle::new(MockSubsystem::new("http").fail_start());
        assert!(handle.start().await.is_err());
        assert_eq!(handle.state(), &SubsystemState::Failed);

        let idle = MockSubsystem::new("idle");
        let probe = idle.probe();
        let mut idle = SubsystemHandle::new(idle);
        assert_eq!(idle.stop(Duration::from_secs(1)).await, ShutdownOutcome::Completed);
        assert_eq!(probe.stops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let mut handle = SubsystemHandle::new(MockSubsystem::new("http"));
        handle.start().await.unwrap();
        assert!(matches!(handle.start().await, Err(StartError::AlreadyStarted(_))));
    }
}
