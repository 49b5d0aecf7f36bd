//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (orchestrator.rs):
//!     Register signals → Start subsystems in order → Running
//!
//! Shutdown (coordinator.rs):
//!     Signal received → Stop all subsystems concurrently → Aggregate outcomes → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → latched shutdown request
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Shutdown has one deadline shared by every subsystem
//! - Subsystems own their resources; nothing is shared between them

pub mod coordinator;
pub mod orchestrator;
pub mod outcome;
pub mod shutdown;
pub mod signals;
pub mod subsystem;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::coordinate;
pub use orchestrator::{LifecycleState, Orchestrator};
pub use outcome::{AggregatedOutcome, ExitOutcome, ShutdownOutcome};
pub use shutdown::{Shutdown, ShutdownListener};
pub use signals::{SignalSource, SignalWatcher};
pub use subsystem::{StartError, StopError, Subsystem, SubsystemHandle, SubsystemState};
