//! Service bootstrap (v1)
//!
//! Loads configuration, opens the database, and runs the HTTP listener and the
//! periodic-task scheduler until SIGINT or SIGTERM.
//!
//! # Lifecycle Overview
//!
//! ```text
//!   boot                         orchestrator
//!   ────                         ────────────
//!   CLI args                     Initializing
//!     → config (.env, TOML)        → start database, http, scheduler (in order)
//!     → logging                    → any start error: rollback, exit 1
//!     → metrics (optional)       Running
//!     → signal handlers            → wait for SIGINT / SIGTERM
//!     → database pool            ShuttingDown
//!                                  → stop all concurrently, one 3s deadline
//!                                Terminated
//!                                  → Clean: exit 0
//!                                  → Degraded: logged, exit `degraded_exit_code` (0)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use app_bootstrap::config;
use app_bootstrap::lifecycle::outcome::FATAL_EXIT_CODE;
use app_bootstrap::observability::{logging, metrics};
use app_bootstrap::{Database, ExitOutcome, HttpServer, Orchestrator, Scheduler, SignalWatcher};

#[derive(Parser)]
#[command(name = "app-bootstrap")]
#[command(about = "Minimal HTTP service bootstrap", long_about = None)]
struct Cli {
    /// Directory containing the .env file.
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Optional TOML configuration file; environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration
    let config = match config::load(&cli.root, cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::from(FATAL_EXIT_CODE);
        }
    };

    // Initialize tracing subscriber
    logging::init(&config.observability.log_level);

    tracing::info!(
        app = %config.app.name,
        bind_address = %config.app.bind_address(),
        shutdown_deadline_ms = config.lifecycle.shutdown_deadline_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    // Register before anything starts so no signal is missed
    let signals = match SignalWatcher::register() {
        Ok(signals) => signals,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            return ExitCode::from(FATAL_EXIT_CODE);
        }
    };

    let db = match Database::connect(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!(error = %e, "Database unavailable");
            return ExitCode::from(FATAL_EXIT_CODE);
        }
    };

    let mut orchestrator = Orchestrator::new(config.lifecycle.clone());
    orchestrator
        .add(db.subsystem())
        .add(HttpServer::new(&config, db.clone()))
        .add(Scheduler::new());

    let outcome = orchestrator.run(signals).await;

    if let ExitOutcome::Fatal(e) = &outcome {
        tracing::error!(error = %e, "Startup aborted");
    }

    ExitCode::from(outcome.exit_code(&config.lifecycle))
}
