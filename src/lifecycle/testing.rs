//! Scripted subsystems and signal sources for lifecycle unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::mpsc;

use crate::lifecycle::signals::SignalSource;
use crate::lifecycle::subsystem::{StartError, StopError, Subsystem};

/// Counters shared between a mock and the test that owns it.
#[derive(Debug, Default)]
pub(crate) struct Probe {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub released: AtomicBool,
}

#[derive(Clone)]
enum StopBehaviour {
    After(Duration),
    Never,
    Fail(String),
    Panic,
}

pub(crate) struct MockSubsystem {
    name: String,
    fail_start: bool,
    stop: StopBehaviour,
    probe: Arc<Probe>,
}

impl MockSubsystem {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail_start: false,
            stop: StopBehaviour::After(Duration::ZERO),
            probe: Arc::new(Probe::default()),
        }
    }

    pub fn stop_after(mut self, delay: Duration) -> Self {
        self.stop = StopBehaviour::After(delay);
        self
    }

    pub fn never_stops(mut self) -> Self {
        self.stop = StopBehaviour::Never;
        self
    }

    pub fn stop_error(mut self, detail: &str) -> Self {
        self.stop = StopBehaviour::Fail(detail.to_string());
        self
    }

    pub fn panic_on_stop(mut self) -> Self {
        self.stop = StopBehaviour::Panic;
        self
    }

    pub fn fail_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn probe(&self) -> Arc<Probe> {
        self.probe.clone()
    }
}

/// Flags the probe when the teardown future is dropped, finished or not.
struct ReleaseGuard(Arc<Probe>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.released.store(true, Ordering::SeqCst);
    }
}

impl Subsystem for MockSubsystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&mut self) -> BoxFuture<'_, Result<(), StartError>> {
        async move {
            self.probe.starts.fetch_add(1, Ordering::SeqCst);
            if self.fail_start {
                return Err(StartError::Other(format!("{}: address in use", self.name)));
            }
            Ok(())
        }
        .boxed()
    }

    fn stop(self: Box<Self>) -> BoxFuture<'static, Result<(), StopError>> {
        let probe = self.probe.clone();
        let behaviour = self.stop.clone();
        async move {
            probe.stops.fetch_add(1, Ordering::SeqCst);
            let _guard = ReleaseGuard(probe);
            match behaviour {
                StopBehaviour::After(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(())
                }
                StopBehaviour::Never => futures_util::future::pending().await,
                StopBehaviour::Fail(detail) => Err(StopError::Other(detail)),
                StopBehaviour::Panic => panic!("teardown blew up"),
            }
        }
        .boxed()
    }
}

/// Signal source fed by the test through a channel; counts waits.
pub(crate) struct ScriptedSignals {
    rx: mpsc::UnboundedReceiver<()>,
    pub waits: Arc<AtomicUsize>,
}

impl ScriptedSignals {
    pub fn new() -> (mpsc::UnboundedSender<()>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx, waits: Arc::new(AtomicUsize::new(0)) })
    }
}

impl SignalSource for ScriptedSignals {
    async fn wait(&mut self) {
        self.waits.fetch_add(1, Ordering::SeqCst);
        if self.rx.recv().await.is_none() {
            futures_util::future::pending::<()>().await;
        }
    }
}
