//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGINT and SIGTERM listeners at boot, before any subsystem starts
//! - Suspend the orchestrator until a termination request arrives
//! - Latch the request so other observers see it
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Only SIGINT and SIGTERM are recognised
//! - Ctrl-C is the only trigger on non-unix platforms

use std::future::Future;

use crate::lifecycle::shutdown::{Shutdown, ShutdownListener};

/// Source of termination requests awaited by the orchestrator.
///
/// Each call to `wait` resolves on the next request.
pub trait SignalSource: Send {
    fn wait(&mut self) -> impl Future<Output = ()> + Send;
}

/// Watches the operating system for SIGINT and SIGTERM.
pub struct SignalWatcher {
    #[cfg(unix)]
    sigint: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
    shutdown: Shutdown,
}

impl SignalWatcher {
    /// Install the signal listeners.
    ///
    /// Signals delivered between registration and the first `wait` are
    /// buffered, not lost.
    #[cfg(unix)]
    pub fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let sigint = signal(SignalKind::interrupt())?;
        let sigterm = signal(SignalKind::terminate())?;
        tracing::debug!("Signal handlers installed for SIGINT and SIGTERM");

        Ok(Self {
            sigint,
            sigterm,
            shutdown: Shutdown::new(),
        })
    }

    #[cfg(not(unix))]
    pub fn register() -> std::io::Result<Self> {
        Ok(Self {
            shutdown: Shutdown::new(),
        })
    }

    /// Observe the latched termination request.
    pub fn subscribe(&self) -> ShutdownListener {
        self.shutdown.subscribe()
    }

    #[cfg(unix)]
    async fn next_signal(&mut self) -> &'static str {
        tokio::select! {
            Some(()) = self.sigint.recv() => "SIGINT",
            Some(()) = self.sigterm.recv() => "SIGTERM",
            else => std::future::pending().await,
        }
    }

    #[cfg(not(unix))]
    async fn next_signal(&mut self) -> &'static str {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "CTRL_C",
            Err(e) => {
                tracing::error!(error = %e, "Unable to listen for Ctrl-C");
                std::future::pending().await
            }
        }
    }
}

impl SignalSource for SignalWatcher {
    async fn wait(&mut self) {
        let signal = self.next_signal().await;
        if self.shutdown.trigger() {
            tracing::info!(signal, "Termination signal received, shutting down");
        } else {
            tracing::warn!(signal, "Termination signal received during shutdown");
        }
    }
}

impl std::fmt::Debug for SignalWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalWatcher")
            .field("triggered", &self.shutdown.is_triggered())
            .finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn raise(signal: &str) {
        let status = tokio::process::Command::new("kill")
            .arg(format!("-{}", signal))
            .arg(std::process::id().to_string())
            .status()
            .await
            .unwrap();
        assert!(status.success());
    }

    #[tokio::test]
    async fn test_signal_before_wait_is_buffered_and_latched() {
        let mut watcher = SignalWatcher::register().unwrap();
        let mut listener = watcher.subscribe();
        assert!(!listener.is_triggered());

        // Delivered before anyone waits.
        raise("TERM").await;

        tokio::time::timeout(Duration::from_secs(5), watcher.wait())
            .await
            .expect("buffered SIGTERM should end the wait");
        assert!(listener.is_triggered());
        listener.recv().await;

        // A second request still resolves a new wait; the latch stays fired.
        raise("INT").await;
        tokio::time::timeout(Duration::from_secs(5), watcher.wait())
            .await
            .expect("SIGINT should end the second wait");
        assert!(watcher.subscribe().is_triggered());
    }
}
