//! Bounded, concurrent shutdown of a set of subsystems.
//!
//! # Data Flow
//! ```text
//! coordinate(handles, D)
//!     → deadline = now + D (one instant for everyone)
//!     → stop_until(deadline) on every handle, concurrently
//!     → join: every handle resolves by the deadline at the latest
//!     → AggregatedOutcome (registration order)
//! ```
//!
//! # Design Decisions
//! - One shared deadline, not a budget per subsystem
//! - No retries; each subsystem is stopped exactly once
//! - A failure is recorded, never propagated, and never skips the others

use std::time::Duration;

use futures_util::future::join_all;
use tokio::time::Instant;

use crate::lifecycle::outcome::{AggregatedOutcome, ShutdownOutcome};
use crate::lifecycle::subsystem::SubsystemHandle;
use crate::observability::metrics;

/// Stop every handle concurrently within a single shared `deadline`.
pub async fn coordinate(handles: &mut [SubsystemHandle], deadline: Duration) -> AggregatedOutcome {
    let started = Instant::now();
    let deadline_at = started + deadline;

    tracing::info!(
        subsystems = handles.len(),
        deadline_ms = deadline.as_millis() as u64,
        "Stopping subsystems"
    );

    let stops = handles.iter_mut().map(|handle| async move {
        let outcome = handle.stop_until(deadline_at).await;
        (handle.name().to_string(), outcome)
    });
    let outcomes = join_all(stops).await;

    for (name, outcome) in &outcomes {
        match outcome {
            ShutdownOutcome::Completed => {
                tracing::info!(subsystem = %name, "Subsystem stopped");
            }
            ShutdownOutcome::TimedOut => {
                tracing::warn!(subsystem = %name, deadline_ms = deadline.as_millis() as u64, "Subsystem did not stop in time");
            }
            ShutdownOutcome::Errored(detail) => {
                tracing::error!(subsystem = %name, error = %detail, "Subsystem failed to stop");
            }
        }
        metrics::record_shutdown_outcome(name, outcome);
    }

    let elapsed = started.elapsed();
    metrics::record_shutdown_duration(elapsed);

    AggregatedOutcome { outcomes, elapsed }
}
