//! Outbound log boundary.
//!
//! Every line the recorder produces (dump headers, entries, session notices)
//! goes through a [`LogSink`]. Sinks never feed back into the flight recorder.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use crossbeam::channel::{SendError, Sender};
use log::Level;

/// Receives one log line at a time.
pub trait LogSink {
    fn append_line(&mut self, level: Level, message: &str);
}

impl<S: LogSink + ?Sized> LogSink for &mut S {
    fn append_line(&mut self, level: Level, message: &str) {
        (**self).append_line(level, message)
    }
}

/// A timestamped log line
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
}

impl LogEntry {
    pub fn now(level: Level, message: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
        }
    }

    /// Mirror the line through the `log` facade.
    fn emit(&self) {
        log::log!(target: "jolt_recorder::log", self.level, "{}", self.message);
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.message
        )
    }
}

/// In-memory session log
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Vec<LogEntry>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.message.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl LogSink for MemoryLog {
    fn append_line(&mut self, level: Level, message: &str) {
        let entry = LogEntry::now(level, message);
        entry.emit();
        self.entries.push(entry);
    }
}

/// Forwards entries to a writer thread and keeps the most recent ones for
/// the live log view.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<LogEntry>,
    recent: VecDeque<LogEntry>,
    tail_lines: usize,
    dropped: u64,
}

impl ChannelSink {
    pub fn new(tx: Sender<LogEntry>, tail_lines: usize) -> Self {
        Self {
            tx,
            recent: VecDeque::with_capacity(tail_lines),
            tail_lines,
            dropped: 0,
        }
    }

    /// Most recent lines, oldest first, at most `tail_lines` of them.
    pub fn tail(&self) -> String {
        self.recent
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Lines lost because the receiving side hung up.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl LogSink for ChannelSink {
    fn append_line(&mut self, level: Level, message: &str) {
        let entry = LogEntry::now(level, message);
        entry.emit();
        if self.tail_lines > 0 {
            if self.recent.len() == self.tail_lines {
                self.recent.pop_front();
            }
            self.recent.push_back(entry.clone());
        }
        if let Err(SendError(_)) = self.tx.send(entry) {
            if self.dropped == 0 {
                log::warn!("log writer disconnected, further lines are only mirrored");
            }
            self.dropped += 1;
        }
    }
}
