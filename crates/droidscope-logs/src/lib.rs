//! Log processing for droidscope
//!
//! This crate turns raw logcat output into records, resolves process names,
//! and fans records out to keyword-filtered subscribers under a start/stop
//! session.

mod buffer;
mod decoder;
mod dispatcher;
mod enricher;
mod filter;
mod parser;
mod pid_table;
mod session;
mod stream;

pub use buffer::{LevelCounts, PaneBuffer};
pub use decoder::decode_line;
pub use dispatcher::{Dispatcher, SubscriptionHandle, SubscriptionId};
pub use enricher::enrich;
pub use filter::KeywordFilter;
pub use parser::LogParser;
pub use pid_table::{PidTable, PidTableError, parse_process_listing, spawn_pid_refresher};
pub use session::{SessionController, SessionOptions};
pub use stream::{LogStreamReader, ReaderExit};

// Re-export types used in our public API
pub use droidscope_types::{ArcLogRecord, LogLevel, LogRecord, SessionState, StatusEvent};
