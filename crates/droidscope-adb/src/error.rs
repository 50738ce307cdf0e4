use std::process::ExitStatus;

/// Failures talking to the device bridge
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` has no stdout pipe")]
    MissingStdout { command: String },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
