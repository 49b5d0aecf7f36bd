//! Shutdown and exit outcomes.

use std::fmt;
use std::time::Duration;

use crate::config::LifecycleConfig;
use crate::lifecycle::subsystem::StartError;

/// Exit code reported when a start failure aborts the run.
pub const FATAL_EXIT_CODE: u8 = 1;

/// Exit code reported when a second signal abandons an in-progress shutdown.
pub const FORCED_EXIT_CODE: u8 = 130;

/// Terminal result of stopping a single subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Teardown finished within the deadline.
    Completed,
    /// The deadline expired first.
    TimedOut,
    /// Teardown failed; carries the error detail.
    Errored(String),
}

impl ShutdownOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ShutdownOutcome::Completed)
    }

    /// Label used for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownOutcome::Completed => "completed",
            ShutdownOutcome::TimedOut => "timed_out",
            ShutdownOutcome::Errored(_) => "errored",
        }
    }
}

impl fmt::Display for ShutdownOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownOutcome::Errored(detail) => write!(f, "errored: {}", detail),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Outcomes of every subsystem stopped by one coordination, in registration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedOutcome {
    pub outcomes: Vec<(String, ShutdownOutcome)>,
    pub elapsed: Duration,
}

impl AggregatedOutcome {
    /// True when any subsystem timed out or errored.
    pub fn is_degraded(&self) -> bool {
        self.outcomes.iter().any(|(_, outcome)| !outcome.is_completed())
    }

    /// Outcome recorded for the named subsystem.
    pub fn get(&self, name: &str) -> Option<&ShutdownOutcome> {
        self.outcomes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, outcome)| outcome)
    }

    /// Subsystems that did not complete.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &ShutdownOutcome)> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| !outcome.is_completed())
            .map(|(name, outcome)| (name.as_str(), outcome))
    }
}

/// Process-level result of an orchestrator run.
#[derive(Debug)]
pub enum ExitOutcome {
    /// Every subsystem stopped within the deadline.
    Clean(AggregatedOutcome),
    /// At least one subsystem timed out or errored.
    Degraded(AggregatedOutcome),
    /// A subsystem failed to start; the run never reached the waiting phase.
    Fatal(StartError),
    /// A second termination signal abandoned the shutdown.
    Forced,
}

impl ExitOutcome {
    pub fn from_aggregate(aggregate: AggregatedOutcome) -> Self {
        if aggregate.is_degraded() {
            ExitOutcome::Degraded(aggregate)
        } else {
            ExitOutcome::Clean(aggregate)
        }
    }

    pub fn is_clean(&self) -> bool {
        matches!(self, ExitOutcome::Clean(_))
    }

    pub fn aggregate(&self) -> Option<&AggregatedOutcome> {
        match self {
            ExitOutcome::Clean(a) | ExitOutcome::Degraded(a) => Some(a),
            _ => None,
        }
    }

    /// Process exit code for this outcome.
    ///
    /// Degraded shutdown maps to `degraded_exit_code`, which defaults to 0 so
    /// orchestration tooling does not treat a slow shutdown as a crash.
    pub fn exit_code(&self, config: &LifecycleConfig) -> u8 {
        match self {
            ExitOutcome::Clean(_) => 0,
            ExitOutcome::Degraded(_) => config.degraded_exit_code,
            ExitOutcome::Fatal(_) => FATAL_EXIT_CODE,
            ExitOutcome::Forced => FORCED_EXIT_CODE,
        }
    }
}
