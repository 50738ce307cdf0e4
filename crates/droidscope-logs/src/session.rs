use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use droidscope_adb::DeviceBridge;
use droidscope_types::{LogRecord, SessionState, StatusEvent};

use crate::{
    Dispatcher, LogParser, LogStreamReader, PidTable, ReaderExit, SubscriptionHandle,
    spawn_pid_refresher,
};

/// Session construction options
#[derive(Clone, Debug)]
pub struct SessionOptions {
    /// How often the pid table is refreshed
    pub pid_refresh_interval: Duration,

    /// Start reading as soon as the session is created
    pub auto_start: bool,

    /// Line prefixes treated as banners and dropped
    pub skip_prefixes: Vec<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            pid_refresh_interval: Duration::from_secs(1),
            auto_start: true,
            skip_prefixes: vec!["-".to_string()],
        }
    }
}

/// A running reader task and the token that stops it
struct ReaderTask {
    cancel: CancellationToken,
    task: JoinHandle<ReaderExit>,
}

/// Start/stop/clear lifecycle of the log stream.
///
/// The session is `Running` exactly while a reader task is alive. A reader
/// that ends on its own (stream failure) drops the session back to `Idle`.
/// The pid refresher runs for the whole life of the controller, independent
/// of start/stop.
pub struct SessionController<B: DeviceBridge> {
    bridge: Arc<B>,
    reader: LogStreamReader,
    dispatcher: Dispatcher,
    pid_table: Arc<PidTable>,
    status_tx: mpsc::UnboundedSender<StatusEvent>,
    active: Option<ReaderTask>,
    shutdown: CancellationToken,
    refresher: Option<JoinHandle<()>>,
}

impl<B: DeviceBridge> SessionController<B> {
    /// Create the session, start the pid refresher, and auto-start if asked.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        bridge: Arc<B>,
        options: SessionOptions,
        status_tx: mpsc::UnboundedSender<StatusEvent>,
    ) -> Self {
        Self::with_dispatcher(bridge, options, Dispatcher::new(), status_tx)
    }

    /// Like [`new`](Self::new), publishing into an existing dispatcher so
    /// subscriptions made beforehand see the very first records
    pub fn with_dispatcher(
        bridge: Arc<B>,
        options: SessionOptions,
        dispatcher: Dispatcher,
        status_tx: mpsc::UnboundedSender<StatusEvent>,
    ) -> Self {
        let parser = Arc::new(LogParser::new(options.skip_prefixes));
        let pid_table = Arc::new(PidTable::new());
        let reader = LogStreamReader::new(
            parser,
            Arc::clone(&pid_table),
            dispatcher.clone(),
            status_tx.clone(),
        );

        let shutdown = CancellationToken::new();
        let refresher = spawn_pid_refresher(
            Arc::clone(&bridge),
            Arc::clone(&pid_table),
            options.pid_refresh_interval,
            shutdown.child_token(),
        );

        let mut session = Self {
            bridge,
            reader,
            dispatcher,
            pid_table,
            status_tx,
            active: None,
            shutdown,
            refresher: Some(refresher),
        };

        if options.auto_start {
            session.start();
        }

        session
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        match &self.active {
            Some(active) if !active.task.is_finished() => SessionState::Running,
            _ => SessionState::Idle,
        }
    }

    /// Start reading. Returns false if already running.
    pub fn start(&mut self) -> bool {
        if self.state().is_running() {
            return false;
        }
        // A reader that already ended on its own has reported its failure
        self.active = None;

        // Sent before the reader exists so a launch failure always lands after it
        let _ = self.status_tx.send(StatusEvent::Fetching);

        let cancel = CancellationToken::new();
        let task = {
            let reader = self.reader.clone();
            let bridge = Arc::clone(&self.bridge);
            let cancel = cancel.clone();
            tokio::spawn(async move { reader.run(bridge, cancel).await })
        };

        self.active = Some(ReaderTask { cancel, task });
        tracing::info!(subscribers = self.dispatcher.subscriber_count(), "session started");
        true
    }

    /// Stop reading and wait for the stream process to be released.
    /// Returns false if the session was not running.
    pub async fn stop(&mut self) -> bool {
        if !self.state().is_running() {
            self.active = None;
            return false;
        }
        let Some(active) = self.active.take() else {
            return false;
        };

        active.cancel.cancel();
        match active.task.await {
            Ok(exit) => tracing::debug!(?exit, "reader task joined"),
            Err(e) => tracing::error!(error = %e, "reader task did not shut down cleanly"),
        }

        tracing::info!("session stopped");
        let _ = self.status_tx.send(StatusEvent::Stopped);
        true
    }

    /// Clear the device log buffer, restarting the reader around it if running.
    /// The session ends in the state it started in.
    pub async fn clear(&mut self) {
        let was_running = self.stop().await;

        match self.bridge.clear_log_buffer().await {
            Ok(()) => {
                tracing::info!("device log buffer cleared");
                let _ = self.status_tx.send(StatusEvent::Cleared);
            }
            Err(e) => tracing::warn!(error = %e, "failed to clear device log buffer"),
        }

        if was_running {
            self.start();
        }
    }

    /// Register a pane predicate
    pub fn subscribe<F>(&self, name: impl Into<String>, predicate: F) -> SubscriptionHandle
    where
        F: Fn(&LogRecord) -> bool + Send + Sync + 'static,
    {
        self.dispatcher.subscribe(name, predicate)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn pid_table(&self) -> &Arc<PidTable> {
        &self.pid_table
    }

    /// Stop the session and the pid refresher (application exit)
    pub async fn shutdown(&mut self) {
        self.stop().await;
        self.shutdown.cancel();
        if let Some(refresher) = self.refresher.take()
            && let Err(e) = refresher.await
        {
            tracing::error!(error = %e, "pid refresher did not shut down cleanly");
        }
    }
}

impl<B: DeviceBridge> Drop for SessionController<B> {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::{Context, Poll};

    use parking_lot::Mutex;
    use tokio::io::{AsyncBufRead, AsyncRead, AsyncWriteExt, BufReader, DuplexStream, ReadBuf};
    use tokio::time::timeout;

    use droidscope_adb::{BridgeError, LogStreamHandle};

    const WAIT: Duration = Duration::from_secs(2);
    const PS_OUTPUT: &str = "USER PID PPID NAME\nu0_a1 1234 1 com.example.app\n";

    /// Counts live streams; decremented when the reader side is dropped
    struct LiveGuard(Arc<AtomicUsize>);

    impl Drop for LiveGuard {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    struct TrackedReader {
        inner: BufReader<DuplexStream>,
        _guard: LiveGuard,
    }

    impl AsyncRead for TrackedReader {
        fn poll_read(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
        }
    }

    impl AsyncBufRead for TrackedReader {
        fn poll_fill_buf(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<&[u8]>> {
            Pin::new(&mut self.get_mut().inner).poll_fill_buf(cx)
        }

        fn consume(self: Pin<&mut Self>, amt: usize) {
            Pin::new(&mut self.get_mut().inner).consume(amt)
        }
    }

    #[derive(Default)]
    struct FakeBridge {
        opened: AtomicUsize,
        live: Arc<AtomicUsize>,
        clears: AtomicUsize,
        ps_calls: AtomicUsize,
        fail_open: std::sync::atomic::AtomicBool,
        ps_output: Mutex<String>,
        writers: Mutex<Vec<DuplexStream>>,
    }

    impl FakeBridge {
        fn new() -> Arc<Self> {
            let bridge = Self::default();
            *bridge.ps_output.lock() = PS_OUTPUT.to_string();
            Arc::new(bridge)
        }

        fn latest_writer(&self) -> DuplexStream {
            self.writers.lock().pop().expect("no stream opened")
        }
    }

    impl DeviceBridge for FakeBridge {
        async fn open_log_stream(&self) -> Result<LogStreamHandle, BridgeError> {
            if self.fail_open.load(Ordering::SeqCst) {
                return Err(BridgeError::Io(io::Error::other("device offline")));
            }
            let (reader, writer) = tokio::io::duplex(4096);
            self.opened.fetch_add(1, Ordering::SeqCst);
            self.live.fetch_add(1, Ordering::SeqCst);
            self.writers.lock().push(writer);
            Ok(LogStreamHandle::from_reader(TrackedReader {
                inner: BufReader::new(reader),
                _guard: LiveGuard(Arc::clone(&self.live)),
            }))
        }

        async fn clear_log_buffer(&self) -> Result<(), BridgeError> {
            self.clears.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn list_processes(&self) -> Result<String, BridgeError> {
            self.ps_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.ps_output.lock().clone())
        }
    }

    fn options(auto_start: bool) -> SessionOptions {
        SessionOptions {
            pid_refresh_interval: Duration::from_millis(20),
            auto_start,
            ..SessionOptions::default()
        }
    }

    /// Poll until the fake bridge has opened `n` streams
    async fn wait_for_open(bridge: &FakeBridge, n: usize) {
        timeout(WAIT, async {
            while bridge.opened.load(Ordering::SeqCst) < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("stream was not opened");
    }

    async fn next_status(rx: &mut mpsc::UnboundedReceiver<StatusEvent>) -> StatusEvent {
        timeout(WAIT, rx.recv()).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_auto_start_and_delivery() {
        let bridge = FakeBridge::new();
        let (status_tx, mut status_rx) = mpsc::unbounded_channel();
        let mut session = SessionController::new(Arc::clone(&bridge), options(true), status_tx);
        let mut camera = session.subscribe("camera", |r: &LogRecord| r.message.contains("mm-camera"));

        assert_eq!(session.state(), SessionState::Running);
        assert_eq!(next_status(&mut status_rx).await, StatusEvent::Fetching);

        // Let the pid table warm up before the stream produces anything
        timeout(WAIT, async {
            while session.pid_table().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        wait_for_open(&bridge, 1).await;
        let mut writer = bridge.latest_writer();
        writer
            .write_all(
                b"--------- beginning of main\n\
                  10-16 09:41:02.117  1234  1290 I mm-camera: sensor up\n\
                  10-16 09:41:02.118  1234  1290 I Gallery: unrelated\n\
                  10-16 09:41:02.119  4321  4321 W mm-camera: late pid\n",
            )
            .await
            .unwrap();

        let first = timeout(WAIT, camera.recv()).await.unwrap().unwrap();
        assert_eq!(first.message, "mm-camera: sensor up");
        assert_eq!(first.process_name.as_deref(), Some("com.example.app"));

        let second = timeout(WAIT, camera.recv()).await.unwrap().unwrap();
        assert_eq!(second.message, "mm-camera: late pid");
        assert!(second.process_name.is_none());

        session.shutdown().await;
        assert_eq!(bridge.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_subscriptions_registered_before_auto_start() {
        let bridge = FakeBridge::new();
        let dispatcher = Dispatcher::new();
        let mut all = dispatcher.subscribe("all", |_: &LogRecord| true);
        let (status_tx, _status_rx) = mpsc::unbounded_channel();
        let mut session =
            SessionController::with_dispatcher(Arc::clone(&bridge), options(true), dispatcher, status_tx);
        assert_eq!(session.dispatcher().subscriber_count(), 1);

        wait_for_open(&bridge, 1).await;
        let mut writer = bridge.latest_writer();
        writer
            .write_all(b"10-16 09:41:02.117 1 1 D first: line\n")
            .await
            .unwrap();

        let record = timeout(WAIT, all.recv()).await.unwrap().unwrap();
        assert_eq!(record.message, "first: line");

        session.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_launch_failure_reported_after_fetching() {
        let bridge = FakeBridge::new();
        bridge.fail_open.store(true, Ordering::SeqCst);
        let (status_tx, mut status_rx) = mpsc::unbounded_channel();
        let mut session = SessionController::new(Arc::clone(&bridge), options(false), status_tx);

        for _ in 0..200 {
            assert!(session.start());
            assert_eq!(next_status(&mut status_rx).await, StatusEvent::Fetching);
            assert!(next_status(&mut status_rx).await.is_error());
            timeout(WAIT, async {
                while session.state().is_running() {
                    tokio::task::yield_now().await;
                }
            })
            .await
            .expect("failed reader did not finish");
        }

        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_while_idle_is_noop() {
        let bridge = FakeBridge::new();
        let (status_tx, mut status_rx) = mpsc::unbounded_channel();
        let mut session = SessionController::new(Arc::clone(&bridge), options(false), status_tx);

        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.stop().await);
        assert!(!session.stop().await);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(status_rx.try_recv().is_err());
        assert_eq!(bridge.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_restart_does_not_leak_streams() {
        let bridge = FakeBridge::new();
        let (status_tx, mut status_rx) = mpsc::unbounded_channel();
        let mut session = SessionController::new(Arc::clone(&bridge), options(false), status_tx);

        assert!(session.start());
        assert!(!session.start());
        wait_for_open(&bridge, 1).await;

        assert!(session.stop().await);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(bridge.live.load(Ordering::SeqCst), 0);

        assert!(session.start());
        wait_for_open(&bridge, 2).await;
        assert_eq!(session.state(), SessionState::Running);
        assert_eq!(bridge.live.load(Ordering::SeqCst), 1);

        assert_eq!(next_status(&mut status_rx).await, StatusEvent::Fetching);
        assert_eq!(next_status(&mut status_rx).await, StatusEvent::Stopped);
        assert_eq!(next_status(&mut status_rx).await, StatusEvent::Fetching);

        session.shutdown().await;
        assert_eq!(bridge.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_clear_while_running_restarts() {
        let bridge = FakeBridge::new();
        let (status_tx, _status_rx) = mpsc::unbounded_channel();
        let mut session = SessionController::new(Arc::clone(&bridge), options(true), status_tx);
        wait_for_open(&bridge, 1).await;

        session.clear().await;

        assert_eq!(bridge.clears.load(Ordering::SeqCst), 1);
        assert_eq!(session.state(), SessionState::Running);
        wait_for_open(&bridge, 2).await;
        assert_eq!(bridge.live.load(Ordering::SeqCst), 1);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_clear_while_idle_stays_idle() {
        let bridge = FakeBridge::new();
        let (status_tx, mut status_rx) = mpsc::unbounded_channel();
        let mut session = SessionController::new(Arc::clone(&bridge), options(false), status_tx);

        session.clear().await;

        assert_eq!(bridge.clears.load(Ordering::SeqCst), 1);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(bridge.opened.load(Ordering::SeqCst), 0);
        assert_eq!(next_status(&mut status_rx).await, StatusEvent::Cleared);
    }

    #[tokio::test]
    async fn test_stream_failure_returns_to_idle() {
        let bridge = FakeBridge::new();
        bridge.fail_open.store(true, Ordering::SeqCst);
        let (status_tx, mut status_rx) = mpsc::unbounded_channel();
        let mut session = SessionController::new(Arc::clone(&bridge), options(true), status_tx);

        assert_eq!(next_status(&mut status_rx).await, StatusEvent::Fetching);
        assert_eq!(
            next_status(&mut status_rx).await,
            StatusEvent::Error("device offline".to_string())
        );

        timeout(WAIT, async {
            while session.state().is_running() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        // Retrying is up to the caller
        bridge.fail_open.store(false, Ordering::SeqCst);
        assert!(session.start());
        wait_for_open(&bridge, 1).await;

        // Closing the stream from the device side is a failure too
        drop(bridge.latest_writer());
        assert_eq!(next_status(&mut status_rx).await, StatusEvent::Fetching);
        assert_eq!(
            next_status(&mut status_rx).await,
            StatusEvent::Error("log stream closed".to_string())
        );

        session.shutdown().await;
        assert_eq!(bridge.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bad_listing_keeps_table_and_refresher_survives_stop() {
        let bridge = FakeBridge::new();
        let (status_tx, _status_rx) = mpsc::unbounded_channel();
        let mut session = SessionController::new(Arc::clone(&bridge), options(true), status_tx);

        timeout(WAIT, async {
            while session.pid_table().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        *bridge.ps_output.lock() = "error: device unauthorized\n".to_string();
        session.stop().await;

        let calls = bridge.ps_calls.load(Ordering::SeqCst);
        timeout(WAIT, async {
            while bridge.ps_calls.load(Ordering::SeqCst) < calls + 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("refresher stopped with the session");

        assert_eq!(
            session.pid_table().name_for("1234").as_deref(),
            Some("com.example.app")
        );

        session.shutdown().await;
        let calls = bridge.ps_calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(bridge.ps_calls.load(Ordering::SeqCst), calls);
    }
}
