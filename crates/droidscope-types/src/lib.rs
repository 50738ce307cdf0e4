//! Shared types for droidscope
//!
//! This crate contains data structures used across multiple droidscope crates.

use ratatui::style::Color;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Log Types
// ============================================================================

/// Logcat severity, derived from the single-character level column
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum LogLevel {
    Verbose,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
    Unknown,
}

impl LogLevel {
    /// Parse a logcat level token (`V`, `D`, `I`, `W`, `E`, `F`, `A`)
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "V" | "v" => Self::Verbose,
            "D" | "d" => Self::Debug,
            "I" | "i" => Self::Info,
            "W" | "w" => Self::Warn,
            "E" | "e" => Self::Error,
            // Assert is reported as fatal
            "F" | "f" | "A" | "a" => Self::Fatal,
            _ => Self::Unknown,
        }
    }

    /// Ordering used for minimum-severity filters
    pub fn rank(&self) -> u8 {
        match self {
            Self::Verbose => 0,
            Self::Debug => 1,
            Self::Info => 2,
            Self::Warn => 3,
            Self::Error => 4,
            Self::Fatal => 5,
            Self::Unknown => 2, // Treat unknown as info level
        }
    }

    /// Get display color for this level
    pub fn color(&self) -> Color {
        match self {
            Self::Verbose => Color::DarkGray,
            Self::Debug => Color::Cyan,
            Self::Info => Color::Green,
            Self::Warn => Color::Yellow,
            Self::Error => Color::Red,
            Self::Fatal => Color::Magenta,
            Self::Unknown => Color::White,
        }
    }

    /// Single-character display code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verbose => "V",
            Self::Debug => "D",
            Self::Info => "I",
            Self::Warn => "W",
            Self::Error => "E",
            Self::Fatal => "F",
            Self::Unknown => "?",
        }
    }
}

/// One parsed logcat line.
///
/// Records are built once by the parser, get their process name attached by
/// the enricher, and are then shared read-only between panes as [`ArcLogRecord`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    pub date: String,
    pub time: String,

    /// Device-assigned process id, kept as tokenized
    pub pid: String,
    pub tid: String,

    /// Raw level token (normally a single character)
    pub level: String,

    /// Remainder of the line, internal whitespace preserved
    pub message: String,

    /// Resolved from the pid table at emit time, if known
    pub process_name: Option<String>,
}

/// Shared handle to an immutable record
pub type ArcLogRecord = Arc<LogRecord>;

impl LogRecord {
    pub fn new(
        date: impl Into<String>,
        time: impl Into<String>,
        pid: impl Into<String>,
        tid: impl Into<String>,
        level: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            time: time.into(),
            pid: pid.into(),
            tid: tid.into(),
            level: level.into(),
            message: message.into(),
            process_name: None,
        }
    }

    /// Return the record with its process name set
    pub fn with_process_name(mut self, process_name: Option<String>) -> Self {
        self.process_name = process_name;
        self
    }

    /// Severity parsed from the level token
    pub fn severity(&self) -> LogLevel {
        LogLevel::from_code(&self.level)
    }

    /// Logcat tag (the text before the first `": "` of the message)
    pub fn tag(&self) -> Option<&str> {
        self.message
            .split_once(": ")
            .map(|(tag, _)| tag.trim())
            .filter(|tag| !tag.is_empty())
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} ",
            self.date, self.time, self.pid, self.tid, self.level
        )?;
        if let Some(name) = &self.process_name {
            write!(f, "[{}] ", name)?;
        }
        f.write_str(&self.message)
    }
}

// ============================================================================
// Session Types
// ============================================================================

/// Logging session state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Running => "Running",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// Human-readable status reported by the session
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusEvent {
    Fetching,
    Stopped,
    Cleared,
    Error(String),
}

impl StatusEvent {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetching => f.write_str("Fetching..."),
            Self::Stopped => f.write_str("Stopped."),
            Self::Cleared => f.write_str("Cleared."),
            Self::Error(msg) => write!(f, "Error: {}", msg),
        }
    }
}
