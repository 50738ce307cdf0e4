use std::collections::VecDeque;

use droidscope_types::{ArcLogRecord, LogLevel};

/// Ring buffer holding one pane's scrollback
#[derive(Debug)]
pub struct PaneBuffer {
    entries: VecDeque<ArcLogRecord>,
    counts: LevelCounts,
    capacity: usize,
}

impl PaneBuffer {
    /// Create a new pane buffer with the given capacity
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(4096)),
            counts: LevelCounts::default(),
            capacity,
        }
    }

    /// Push a record, evicting the oldest if at capacity.
    /// Returns true if a record was evicted.
    pub fn push(&mut self, record: ArcLogRecord) -> bool {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        if let Some(old) = &evicted {
            self.counts.decrement(old.severity());
        }
        self.counts.increment(record.severity());
        self.entries.push_back(record);
        evicted.is_some()
    }

    /// Entries in a range (for scrolling)
    pub fn range(&self, start: usize, count: usize) -> impl Iterator<Item = &ArcLogRecord> {
        self.entries.iter().skip(start).take(count)
    }

    /// Entry count per severity
    pub fn level_counts(&self) -> &LevelCounts {
        &self.counts
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.entries.clear();
        self.counts = LevelCounts::default();
    }
}

/// Counts per severity
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LevelCounts {
    pub verbose: usize,
    pub debug: usize,
    pub info: usize,
    pub warn: usize,
    pub error: usize,
    pub fatal: usize,
    pub unknown: usize,
}

impl LevelCounts {
    fn slot(&mut self, level: LogLevel) -> &mut usize {
        match level {
            LogLevel::Verbose => &mut self.verbose,
            LogLevel::Debug => &mut self.debug,
            LogLevel::Info => &mut self.info,
            LogLevel::Warn => &mut self.warn,
            LogLevel::Error => &mut self.error,
            LogLevel::Fatal => &mut self.fatal,
            LogLevel::Unknown => &mut self.unknown,
        }
    }

    fn increment(&mut self, level: LogLevel) {
        *self.slot(level) += 1;
    }

    fn decrement(&mut self, level: LogLevel) {
        let slot = self.slot(level);
        *slot = slot.saturating_sub(1);
    }
}
