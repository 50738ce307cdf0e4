use std::process::Stdio;

use tokio::process::Command;

use crate::{BridgeError, DeviceBridge, LogStreamHandle};

const LOGCAT_STREAM_ARGS: [&str; 3] = ["logcat", "-v", "threadtime"];
const LOGCAT_CLEAR_ARGS: [&str; 2] = ["logcat", "-c"];
const PS_ARGS: [&str; 2] = ["shell", "ps"];

/// Device bridge backed by the `adb` executable
#[derive(Clone, Debug)]
pub struct AdbBridge {
    /// Path or name of the adb binary
    program: String,

    /// Target device serial (`adb -s`), if more than one device is attached
    serial: Option<String>,
}

impl AdbBridge {
    pub fn new(program: impl Into<String>, serial: Option<String>) -> Self {
        Self {
            program: program.into(),
            serial,
        }
    }

    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    /// Full argument vector for a bridge subcommand
    fn args<'a>(&'a self, sub: &[&'a str]) -> Vec<&'a str> {
        let mut args = Vec::with_capacity(sub.len() + 2);
        if let Some(serial) = &self.serial {
            args.push("-s");
            args.push(serial.as_str());
        }
        args.extend_from_slice(sub);
        args
    }

    /// Command line as shown in errors and logs
    fn describe(&self, sub: &[&str]) -> String {
        let mut parts = vec![self.program.as_str()];
        parts.extend(self.args(sub));
        parts.join(" ")
    }

    fn command(&self, sub: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args(sub)).stdin(Stdio::null());
        cmd
    }

    /// Run a one-shot command and return its stdout
    async fn run(&self, sub: &[&str]) -> Result<Vec<u8>, BridgeError> {
        let command = self.describe(sub);
        let output = self
            .command(sub)
            .output()
            .await
            .map_err(|source| BridgeError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(BridgeError::CommandFailed {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

impl Default for AdbBridge {
    fn default() -> Self {
        Self::new("adb", None)
    }
}

impl DeviceBridge for AdbBridge {
    async fn open_log_stream(&self) -> Result<LogStreamHandle, BridgeError> {
        let command = self.describe(&LOGCAT_STREAM_ARGS);
        let child = self
            .command(&LOGCAT_STREAM_ARGS)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BridgeError::Spawn {
                command: command.clone(),
                source,
            })?;

        tracing::debug!(command = %command, pid = ?child.id(), "log stream started");
        LogStreamHandle::from_child(child, &command)
    }

    async fn clear_log_buffer(&self) -> Result<(), BridgeError> {
        self.run(&LOGCAT_CLEAR_ARGS).await.map(|_| ())
    }

    async fn list_processes(&self) -> Result<String, BridgeError> {
        let stdout = self.run(&PS_ARGS).await?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_without_serial() {
        let adb = AdbBridge::default();
        assert_eq!(adb.args(&LOGCAT_STREAM_ARGS), vec!["logcat", "-v", "threadtime"]);
        assert_eq!(adb.describe(&PS_ARGS), "adb shell ps");
        assert_eq!(adb.serial(), None);
    }

    #[test]
    fn test_args_with_serial() {
        let adb = AdbBridge::new("/opt/android/adb", Some("emulator-5554".to_string()));
        assert_eq!(adb.serial(), Some("emulator-5554"));
        assert_eq!(
            adb.args(&LOGCAT_CLEAR_ARGS),
            vec!["-s", "emulator-5554", "logcat", "-c"]
        );
        assert_eq!(
            adb.describe(&LOGCAT_CLEAR_ARGS),
            "/opt/android/adb -s emulator-5554 logcat -c"
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let adb = AdbBridge::new("/nonexistent/droidscope-adb", None);
        match adb.open_log_stream().await {
            Err(BridgeError::Spawn { command, .. }) => {
                assert!(command.ends_with("logcat -v threadtime"));
            }
            other => panic!("expected spawn error, got {:?}", other),
        }
        assert!(matches!(
            adb.list_processes().await,
            Err(BridgeError::Spawn { .. })
        ));
    }
}
