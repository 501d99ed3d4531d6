//! Rendering of flight recorder dumps.
//!
//! A dump is a header naming the trigger, one line per retained sample with
//! its age relative to the marker, and a footer. An empty recorder yields an
//! explicit placeholder line so "dump ran, nothing buffered" is visible.

use chrono::{DateTime, SecondsFormat, Utc};
use log::Level;

use crate::sample::{Sample, TimestampMs};
use crate::sink::LogSink;

pub const EMPTY_BUFFER_LINE: &str = "(flight recorder buffer is empty)";
pub const FOOTER_LINE: &str = "--- END FLIGHT RECORDER DUMP ---";

#[derive(Debug, Clone, PartialEq)]
pub struct DumpLine {
    pub level: Level,
    pub text: String,
}

impl DumpLine {
    fn warn(text: String) -> Self {
        Self {
            level: Level::Warn,
            text,
        }
    }

    fn info(text: String) -> Self {
        Self {
            level: Level::Info,
            text,
        }
    }
}

/// A rendered dump, ready to be written to a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct DumpReport {
    pub marker: TimestampMs,
    pub reason: String,
    pub sample_count: usize,
    pub lines: Vec<DumpLine>,
}

impl DumpReport {
    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }

    /// Lines describing samples (or the empty placeholder), without header/footer.
    pub fn body(&self) -> &[DumpLine] {
        let end = self.lines.len().saturating_sub(1);
        &self.lines[2.min(end)..end]
    }

    pub fn write_to<S: LogSink>(&self, sink: &mut S) {
        for line in &self.lines {
            sink.append_line(line.level, &line.text);
        }
    }
}

/// Summary returned to callers after a dump was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpSummary {
    pub marker: TimestampMs,
    pub samples: usize,
    pub lines: usize,
}

impl From<&DumpReport> for DumpSummary {
    fn from(report: &DumpReport) -> Self {
        Self {
            marker: report.marker,
            samples: report.sample_count,
            lines: report.lines.len(),
        }
    }
}

pub fn render(
    samples: &[Sample],
    marker: TimestampMs,
    reason: &str,
    window_ms: i64,
) -> DumpReport {
    let mut lines = Vec::with_capacity(samples.len().max(1) + 3);
    lines.push(DumpLine::warn(format!(
        "--- !!! {} ({}) !!! ---",
        reason,
        format_marker(marker)
    )));
    lines.push(DumpLine::warn(format!(
        "--- START FLIGHT RECORDER DUMP (last {}ms) ---",
        window_ms
    )));

    if samples.is_empty() {
        lines.push(DumpLine::warn(EMPTY_BUFFER_LINE.to_string()));
    } else {
        for sample in samples {
            lines.push(DumpLine::info(format!(
                "[{}] | {} | {}",
                relative_time(marker, sample.timestamp),
                sample.kind(),
                sample.reading.describe()
            )));
        }
    }

    lines.push(DumpLine::warn(FOOTER_LINE.to_string()));

    DumpReport {
        marker,
        reason: reason.to_string(),
        sample_count: samples.len(),
        lines,
    }
}

/// `T-1.234s` for samples before the marker, `T+0.010s` after it.
pub fn relative_time(marker: TimestampMs, timestamp: TimestampMs) -> String {
    let diff_ms = marker.saturating_sub(timestamp);
    let sign = if diff_ms < 0 { '+' } else { '-' };
    format!("T{}{:.3}s", sign, diff_ms.unsigned_abs() as f64 / 1000.0)
}

pub fn format_marker(marker: TimestampMs) -> String {
    match DateTime::<Utc>::from_timestamp_millis(marker) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => format!("{}ms", marker),
    }
}
