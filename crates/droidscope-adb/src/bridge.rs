use std::future::Future;
use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Child;

use crate::BridgeError;

/// Operations droidscope needs from the device.
///
/// [`AdbBridge`](crate::AdbBridge) is the real implementation; tests supply
/// in-memory bridges.
pub trait DeviceBridge: Send + Sync + 'static {
    /// Launch the log-streaming process (`logcat -v threadtime`)
    fn open_log_stream(&self) -> impl Future<Output = Result<LogStreamHandle, BridgeError>> + Send;

    /// Clear the device log buffer (`logcat -c`)
    fn clear_log_buffer(&self) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Raw tabular output of the device process listing (`shell ps`)
    fn list_processes(&self) -> impl Future<Output = Result<String, BridgeError>> + Send;
}

/// An open log stream and the process producing it.
///
/// Dropping the handle kills the child (it is spawned with `kill_on_drop`);
/// [`shutdown`](Self::shutdown) kills and reaps it explicitly.
pub struct LogStreamHandle {
    reader: Box<dyn AsyncBufRead + Send + Unpin>,
    child: Option<Child>,
}

impl LogStreamHandle {
    /// Wrap a spawned child whose stdout is piped
    pub fn from_child(mut child: Child, command: &str) -> Result<Self, BridgeError> {
        let stdout = child.stdout.take().ok_or_else(|| BridgeError::MissingStdout {
            command: command.to_string(),
        })?;

        Ok(Self {
            reader: Box::new(BufReader::new(stdout)),
            child: Some(child),
        })
    }

    /// Wrap an arbitrary byte stream with no process behind it
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            child: None,
        }
    }

    /// Read one raw line, newline included, into `buf`.
    ///
    /// Returns the number of bytes read; 0 means the stream reached EOF.
    pub async fn next_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        buf.clear();
        self.reader.read_until(b'\n', buf).await
    }

    /// Process id of the child, if there is one and it has not been reaped
    pub fn child_id(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    /// Kill and reap the child process
    pub async fn shutdown(mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                tracing::debug!(error = %e, "log stream process already gone");
            }
        }
    }
}

impl std::fmt::Debug for LogStreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStreamHandle")
            .field("child_id", &self.child_id())
            .finish()
    }
}
