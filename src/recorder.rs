//! Time-windowed flight recorder.
//!
//! Retains samples whose timestamp lies within `window_ms` of the newest
//! sample seen. Eviction happens eagerly on every push, from the front, so
//! the deque is kept in timestamp order at all times. A sample exactly
//! `window_ms` older than the newest one is still retained.

use std::collections::VecDeque;

use crate::config::WINDOW_MS;
use crate::dump::{self, DumpReport};
use crate::sample::{Reading, Sample, TimestampMs};
use crate::sink::LogSink;

/// Result of a single push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushOutcome {
    /// False when the sample was already outside the window and got dropped.
    pub accepted: bool,
    pub evicted: usize,
}

#[derive(Debug, Clone)]
pub struct FlightRecorder {
    window_ms: i64,
    samples: VecDeque<Sample>,
    latest: Option<TimestampMs>,
}

impl FlightRecorder {
    pub fn new(window_ms: i64) -> Self {
        Self {
            window_ms,
            samples: VecDeque::with_capacity(256),
            latest: None,
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    /// Newest timestamp pushed since the last clear.
    pub fn latest_timestamp(&self) -> Option<TimestampMs> {
        self.latest
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn push_reading(&mut self, timestamp: TimestampMs, reading: Reading) -> PushOutcome {
        self.push(Sample::new(timestamp, reading))
    }

    pub fn push(&mut self, sample: Sample) -> PushOutcome {
        let latest = self.latest.map_or(sample.timestamp, |l| l.max(sample.timestamp));
        let cutoff = latest.saturating_sub(self.window_ms);

        if sample.timestamp < cutoff {
            return PushOutcome {
                accepted: false,
                evicted: 0,
            };
        }

        match self.samples.back() {
            Some(last) if sample.timestamp < last.timestamp => {
                // Late producer: keep timestamp order, after equal timestamps.
                let idx = self
                    .samples
                    .partition_point(|s| s.timestamp <= sample.timestamp);
                self.samples.insert(idx, sample);
            }
            _ => self.samples.push_back(sample),
        }
        self.latest = Some(latest);

        let mut evicted = 0;
        while self
            .samples
            .front()
            .is_some_and(|oldest| oldest.timestamp < cutoff)
        {
            self.samples.pop_front();
            evicted += 1;
        }

        PushOutcome {
            accepted: true,
            evicted,
        }
    }

    /// Point-in-time copy, oldest first. Safe to iterate while the recorder
    /// keeps receiving samples.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.latest = None;
    }

    /// Render the current contents relative to `marker` and write them to
    /// `sink`. Every dump trigger goes through here.
    pub fn dump<S: LogSink>(&self, marker: TimestampMs, reason: &str, sink: &mut S) -> DumpReport {
        let snapshot = self.snapshot();
        let report = dump::render(&snapshot, marker, reason, self.window_ms);
        report.write_to(sink);
        report
    }
}

impl Default for FlightRecorder {
    fn default() -> Self {
        Self::new(WINDOW_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dump::EMPTY_BUFFER_LINE;
    use crate::sink::MemoryLog;

    fn timestamps(recorder: &FlightRecorder) -> Vec<TimestampMs> {
        recorder.iter().map(|s| s.timestamp).collect()
    }

    #[test]
    fn test_evicts_outside_window() {
        let mut recorder = FlightRecorder::new(2500);
        recorder.push(Sample::motion(0, 0.0, 0.0, 9.8));
        recorder.push(Sample::motion(100, 0.0, 0.0, 9.8));
        let outcome = recorder.push(Sample::motion(2600, 30.0, 0.0, 0.0));

        assert!(outcome.accepted);
        assert_eq!(outcome.evicted, 1);
        assert_eq!(timestamps(&recorder), vec![100, 2600]);
    }

    #[test]
    fn test_boundary_sample_is_retained() {
        let mut recorder = FlightRecorder::new(1000);
        recorder.push(Sample::motion(0, 0.0, 0.0, 0.0));
        recorder.push(Sample::motion(1000, 0.0, 0.0, 0.0));
        assert_eq!(timestamps(&recorder), vec![0, 1000]);

        recorder.push(Sample::motion(1001, 0.0, 0.0, 0.0));
        assert_eq!(timestamps(&recorder), vec![1000, 1001]);
    }

    #[test]
    fn test_interleaved_producers_with_equal_timestamps() {
        let mut recorder = FlightRecorder::new(2500);
        recorder.push(Sample::motion(10, 0.0, 0.0, 9.8));
        recorder.push(Sample::orientation(10, 0.0, 0.0, 0.0));
        recorder.push(Sample::motion(20, 0.0, 0.0, 9.8));

        assert_eq!(recorder.len(), 3);
        assert_eq!(timestamps(&recorder), vec![10, 10, 20]);
    }

    #[test]
    fn test_late_sample_is_inserted_in_order() {
        let mut recorder = FlightRecorder::new(2500);
        recorder.push(Sample::motion(1000, 0.0, 0.0, 9.8));
        recorder.push(Sample::motion(2000, 0.0, 0.0, 9.8));
        let outcome = recorder.push(Sample::orientation(1500, 1.0, 2.0, 3.0));

        assert!(outcome.accepted);
        assert_eq!(timestamps(&recorder), vec![1000, 1500, 2000]);
        assert_eq!(recorder.latest_timestamp(), Some(2000));
    }

    #[test]
    fn test_stale_sample_is_rejected() {
        let mut recorder = FlightRecorder::new(2500);
        recorder.push(Sample::motion(10_000, 0.0, 0.0, 9.8));
        let outcome = recorder.push(Sample::motion(7_000, 0.0, 0.0, 9.8));

        assert!(!outcome.accepted);
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn test_extreme_timestamps() {
        let mut recorder = FlightRecorder::new(2500);
        assert!(recorder.push(Sample::motion(i64::MIN + 800, 0.0, 0.0, 9.8)).accepted);
        assert!(recorder.push(Sample::motion(i64::MIN, 0.0, 0.0, 9.8)).accepted);
        assert_eq!(recorder.len(), 2);

        let outcome = recorder.push(Sample::motion(i64::MAX, 0.0, 0.0, 9.8));
        assert_eq!(outcome.evicted, 2);
        assert!(!recorder.push(Sample::motion(0, 0.0, 0.0, 9.8)).accepted);

        let mut log = MemoryLog::new();
        let report = recorder.dump(i64::MIN, "EXTREME", &mut log);
        assert_eq!(report.sample_count, 1);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut recorder = FlightRecorder::new(2500);
        recorder.push(Sample::motion(0, 1.0, 0.0, 0.0));
        let snapshot = recorder.snapshot();

        recorder.push(Sample::motion(10, 2.0, 0.0, 0.0));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(recorder.len(), 2);
    }

    #[test]
    fn test_clear() {
        let mut recorder = FlightRecorder::default();
        recorder.push(Sample::motion(0, 0.0, 0.0, 9.8));
        recorder.clear();

        assert!(recorder.is_empty());
        assert_eq!(recorder.latest_timestamp(), None);

        // A fresh session may start with older clock values.
        assert!(recorder.push(Sample::motion(-50_000, 0.0, 0.0, 9.8)).accepted);
    }

    #[test]
    fn test_dump_empty_recorder() {
        let recorder = FlightRecorder::default();
        let mut log = MemoryLog::new();
        let report = recorder.dump(0, "MANUAL", &mut log);

        assert!(report.is_empty());
        assert!(log.messages().any(|m| m == EMPTY_BUFFER_LINE));
    }

    #[test]
    fn test_dump_does_not_consume() {
        let mut recorder = FlightRecorder::default();
        recorder.push(Sample::motion(0, 0.0, 0.0, 9.8));
        recorder.push(Sample::orientation(5, 0.0, 0.0, 0.0));

        let mut log = MemoryLog::new();
        let first = recorder.dump(10, "ONE", &mut log);
        let second = recorder.dump(10, "ONE", &mut log);

        assert_eq!(first, second);
        assert_eq!(recorder.len(), 2);
    }
}
