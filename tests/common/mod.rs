//! Shared utilities for integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::mpsc;

use app_bootstrap::config::AppConfig;
use app_bootstrap::lifecycle::{SignalSource, StartError, StopError, Subsystem};

/// Configuration that passes validation, listening on `port` (0 = ephemeral).
pub fn test_config(port: u16) -> AppConfig {
    let mut config = AppConfig::default();
    config.app.name = "bootstrap-test".into();
    config.app.host = "127.0.0.1".into();
    config.app.port = port;
    config.database.host = "127.0.0.1".into();
    config.database.port = 3306;
    config.database.username = "app".into();
    config.database.database = "test".into();
    config
}

/// Ask the OS for a currently unused local port.
#[allow(dead_code)]
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .unwrap()
}

/// Plain HTTP client without pooling, so every request opens a connection.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Signal source driven by the test.
pub struct ChannelSignals {
    rx: mpsc::UnboundedReceiver<()>,
    pub waits: Arc<AtomicUsize>,
}

#[allow(dead_code)]
pub fn signals() -> (mpsc::UnboundedSender<()>, ChannelSignals) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        tx,
        ChannelSignals {
            rx,
            waits: Arc::new(AtomicUsize::new(0)),
        },
    )
}

impl SignalSource for ChannelSignals {
    async fn wait(&mut self) {
        self.waits.fetch_add(1, Ordering::SeqCst);
        if self.rx.recv().await.is_none() {
            futures_util::future::pending::<()>().await;
        }
    }
}

/// Subsystem that records calls and takes `stop_delay` to stop (`None` = never).
pub struct ProbeSubsystem {
    pub name: &'static str,
    pub stop_delay: Option<Duration>,
    pub starts: Arc<AtomicUsize>,
    pub stops: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl ProbeSubsystem {
    pub fn new(name: &'static str, stop_delay: Option<Duration>) -> Self {
        Self {
            name,
            stop_delay,
            starts: Arc::new(AtomicUsize::new(0)),
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Subsystem for ProbeSubsystem {
    fn name(&self) -> &str {
        self.name
    }

    fn start(&mut self) -> BoxFuture<'_, Result<(), StartError>> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        async { Ok(()) }.boxed()
    }

    fn stop(self: Box<Self>) -> BoxFuture<'static, Result<(), StopError>> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        let delay = self.stop_delay;
        async move {
            match delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => futures_util::future::pending::<()>().await,
            }
            Ok(())
        }
        .boxed()
    }
}
