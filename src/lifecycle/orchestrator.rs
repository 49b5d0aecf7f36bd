//! Process lifecycle orchestration.
//!
//! # State Machine
//! ```text
//! Initializing ──start all──▶ Running ──signal──▶ ShuttingDown ──▶ Terminated
//!      │                                                              ▲
//!      └──────────── start failure (rollback, Fatal) ─────────────────┘
//! ```
//!
//! # Design Decisions
//! - Fail fast: any start error aborts the run before the signal wait
//! - Subsystems start in registration order; later ones never start after a failure
//! - The signal wait is the only suspension point of the running phase
//! - Degraded shutdown is reported, not escalated

use tokio::sync::watch;

use crate::config::{LifecycleConfig, SecondSignalPolicy};
use crate::lifecycle::coordinator::coordinate;
use crate::lifecycle::outcome::ExitOutcome;
use crate::lifecycle::signals::SignalSource;
use crate::lifecycle::subsystem::{Subsystem, SubsystemHandle};
use crate::observability::metrics;

/// Orchestrator phase. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    Initializing,
    Running,
    ShuttingDown,
    Terminated,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Initializing => "initializing",
            LifecycleState::Running => "running",
            LifecycleState::ShuttingDown => "shutting_down",
            LifecycleState::Terminated => "terminated",
        }
    }
}

/// Top-level driver: start everything, wait for a signal, shut down.
pub struct Orchestrator {
    config: LifecycleConfig,
    handles: Vec<SubsystemHandle>,
    state_tx: watch::Sender<LifecycleState>,
}

impl Orchestrator {
    pub fn new(config: LifecycleConfig) -> Self {
        let (state_tx, _) = watch::channel(LifecycleState::Initializing);
        Self {
            config,
            handles: Vec::new(),
            state_tx,
        }
    }

    /// Register a subsystem. Start order follows registration order.
    pub fn add(&mut self, subsystem: impl Subsystem) -> &mut Self {
        self.handles.push(SubsystemHandle::new(subsystem));
        self
    }

    /// Follow state transitions.
    pub fn state(&self) -> watch::Receiver<LifecycleState> {
        self.state_tx.subscribe()
    }

    /// Run the full lifecycle and report how it ended.
    pub async fn run<S: SignalSource>(mut self, mut signals: S) -> ExitOutcome {
        self.transition(LifecycleState::Initializing);

        for index in 0..self.handles.len() {
            let handle = &mut self.handles[index];
            tracing::info!(subsystem = %handle.name(), "Starting subsystem");

            if let Err(e) = handle.start().await {
                tracing::error!(subsystem = %handle.name(), error = %e, "Subsystem failed to start");
                self.rollback(index).await;
                self.transition(LifecycleState::Terminated);
                return ExitOutcome::Fatal(e);
            }
        }

        self.transition(LifecycleState::Running);
        tracing::info!(subsystems = self.handles.len(), "All subsystems running");

        signals.wait().await;

        self.transition(LifecycleState::ShuttingDown);
        let deadline = self.config.shutdown_deadline();

        let outcome = match self.config.second_signal {
            SecondSignalPolicy::Ignore => {
                ExitOutcome::from_aggregate(coordinate(&mut self.handles, deadline).await)
            }
            SecondSignalPolicy::Force => {
                tokio::select! {
                    aggregate = coordinate(&mut self.handles, deadline) => ExitOutcome::from_aggregate(aggregate),
                    _ = signals.wait() => {
                        tracing::warn!("Second termination signal received, abandoning shutdown");
                        ExitOutcome::Forced
                    }
                }
            }
        };

        match &outcome {
            ExitOutcome::Clean(aggregate) => {
                tracing::info!(elapsed_ms = aggregate.elapsed.as_millis() as u64, "Shutdown complete");
            }
            ExitOutcome::Degraded(aggregate) => {
                let failed: Vec<&str> = aggregate.failures().map(|(name, _)| name).collect();
                tracing::warn!(
                    elapsed_ms = aggregate.elapsed.as_millis() as u64,
                    failed = ?failed,
                    "Shutdown degraded"
                );
            }
            ExitOutcome::Fatal(_) | ExitOutcome::Forced => {}
        }

        self.transition(LifecycleState::Terminated);
        outcome
    }

    /// Stop the handles started before `failed` with the short rollback deadline.
    async fn rollback(&mut self, failed: usize) {
        let started = &mut self.handles[..failed];
        if started.is_empty() {
            return;
        }

        tracing::warn!(subsystems = started.len(), "Rolling back started subsystems");
        let aggregate = coordinate(started, self.config.rollback_deadline()).await;
        if aggregate.is_degraded() {
            tracing::warn!("Rollback did not complete cleanly");
        }
    }

    fn transition(&self, next: LifecycleState) {
        self.state_tx.send_if_modified(|state| {
            if next <= *state {
                return false;
            }
            tracing::debug!(from = state.as_str(), to = next.as_str(), "Lifecycle transition");
            *state = next;
            true
        });
        metrics::record_lifecycle_state(*self.state_tx.borrow());
    }
}
