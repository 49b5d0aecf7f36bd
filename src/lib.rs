//! Minimal HTTP service bootstrap with an ordered, bounded process lifecycle.

pub mod config;
pub mod db;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod scheduler;
pub mod security;

pub use config::AppConfig;
pub use db::Database;
pub use http::HttpServer;
pub use lifecycle::{ExitOutcome, Orchestrator, SignalWatcher};
pub use scheduler::Scheduler;
