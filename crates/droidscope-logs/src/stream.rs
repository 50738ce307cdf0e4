use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use droidscope_adb::DeviceBridge;
use droidscope_types::{ArcLogRecord, StatusEvent};

use crate::{Dispatcher, LogParser, PidTable, decode_line, enrich};

/// How a reader run ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReaderExit {
    /// Stopped on request
    Cancelled,
    /// Launch failure, read error, or the stream closed
    Failed(String),
}

/// Reads the device log stream and pushes every parsed record through the
/// enricher to the dispatcher.
///
/// Cloning is cheap; the parser, pid table and dispatcher are shared.
#[derive(Clone)]
pub struct LogStreamReader {
    parser: Arc<LogParser>,
    pid_table: Arc<PidTable>,
    dispatcher: Dispatcher,
    status_tx: mpsc::UnboundedSender<StatusEvent>,
}

impl LogStreamReader {
    pub fn new(
        parser: Arc<LogParser>,
        pid_table: Arc<PidTable>,
        dispatcher: Dispatcher,
        status_tx: mpsc::UnboundedSender<StatusEvent>,
    ) -> Self {
        Self {
            parser,
            pid_table,
            dispatcher,
            status_tx,
        }
    }

    /// Decode, parse, enrich and publish one raw line.
    ///
    /// Returns the published record, or `None` if the line was skipped.
    pub fn process_line(&self, raw: &[u8]) -> Option<ArcLogRecord> {
        let line = decode_line(raw);
        let record = self.parser.parse(&line)?;
        let record = Arc::new(enrich(record, &self.pid_table));
        self.dispatcher.publish(Arc::clone(&record));
        Some(record)
    }

    /// Open the stream and read it until cancelled or broken.
    ///
    /// The stream process is shut down on every exit path. Failures are sent
    /// to the status channel; cancellation is silent.
    pub async fn run<B: DeviceBridge>(&self, bridge: Arc<B>, cancel: CancellationToken) -> ReaderExit {
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return ReaderExit::Cancelled,
            opened = bridge.open_log_stream() => opened,
        };

        let mut handle = match opened {
            Ok(handle) => handle,
            Err(e) => return self.fail(e.to_string()),
        };
        tracing::info!(child = ?handle.child_id(), "reading log stream");

        let mut buf = Vec::with_capacity(512);
        let mut records: u64 = 0;
        let exit = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break ReaderExit::Cancelled,
                result = handle.next_line(&mut buf) => match result {
                    Ok(0) => break ReaderExit::Failed("log stream closed".to_string()),
                    Ok(_) => {
                        if self.process_line(&buf).is_some() {
                            records += 1;
                        }
                    }
                    Err(e) => break ReaderExit::Failed(format!("reading log stream: {}", e)),
                },
            }
        };

        handle.shutdown().await;
        tracing::debug!(records, "log stream reader finished");

        match exit {
            ReaderExit::Failed(msg) => self.fail(msg),
            ReaderExit::Cancelled => ReaderExit::Cancelled,
        }
    }

    fn fail(&self, msg: String) -> ReaderExit {
        tracing::error!(error = %msg, "log stream failed");
        let _ = self.status_tx.send(StatusEvent::Error(msg.clone()));
        ReaderExit::Failed(msg)
    }
}
