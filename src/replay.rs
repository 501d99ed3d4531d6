//! Offline replay of recorded sensor events.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::config::RecorderConfig;
use crate::error::{RecorderError, RecorderResult};
use crate::export::SessionExport;
use crate::sample::TimestampMs;
use crate::sensors::SensorEvent;
use crate::session::RecordingSession;
use crate::sink::MemoryLog;

/// Read JSON-lines events. Blank lines are ignored.
pub fn read_events<R: Read>(reader: R) -> RecorderResult<Vec<SensorEvent>> {
    let mut events = Vec::new();
    for (idx, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event = serde_json::from_str(&line).map_err(|e| {
            RecorderError::InvalidParameters(format!("line {}: {}", idx + 1, e))
        })?;
        events.push(event);
    }
    Ok(events)
}

/// Load `events_*.jsonl` or `events_*.jsonl.gz`.
pub fn load_events(path: &Path) -> RecorderResult<Vec<SensorEvent>> {
    let file = File::open(path)?;
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        read_events(GzDecoder::new(file))
    } else {
        read_events(file)
    }
}

/// Feed events through a fresh session. Manual markers fire just before
/// the first event that is newer than them, or at the end of the stream.
pub fn replay(
    config: RecorderConfig,
    events: &[SensorEvent],
    marks: &[TimestampMs],
) -> RecorderResult<SessionExport> {
    let mut session = RecordingSession::new(config, MemoryLog::new())?;
    let start = events.first().map(|e| e.timestamp()).unwrap_or(0);
    session.start(start)?;

    let mut marks = marks.to_vec();
    marks.sort_unstable();
    let mut pending = marks.into_iter().peekable();

    let mut last = start;
    for event in events {
        while let Some(mark) = pending.next_if(|m| *m < event.timestamp()) {
            session.mark_incident(mark)?;
        }
        crate::apply_event(&mut session, event);
        last = last.max(event.timestamp());
    }
    for mark in pending {
        session.mark_incident(mark)?;
    }

    session.check_sensors(last);
    let status = session.status(last);
    session.stop(last)?;
    Ok(SessionExport::from_log(status, session.sink()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::MotionEvent;

    #[test]
    fn test_read_events_reports_line() {
        let input = "{\"type\":\"motion\",\"timestamp\":0,\"x\":0.0,\"y\":0.0,\"z\":9.8}\n\nnot json\n";
        let err = read_events(input.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_read_events_with_nulls() {
        let input = "{\"type\":\"motion\",\"timestamp\":5,\"x\":null,\"y\":1.0,\"z\":2.0}\n";
        let events = read_events(input.as_bytes()).unwrap();
        assert_eq!(
            events,
            vec![SensorEvent::Motion {
                timestamp: 5,
                event: MotionEvent {
                    x: None,
                    y: Some(1.0),
                    z: Some(2.0),
                },
            }]
        );
    }

    #[test]
    fn test_replay_extreme_timestamps() {
        let input = concat!(
            "{\"type\":\"motion\",\"timestamp\":-9223372036854775000,\"x\":30.0,\"y\":0.0,\"z\":0.0}\n",
            "{\"type\":\"motion\",\"timestamp\":9223372036854775000,\"x\":30.0,\"y\":0.0,\"z\":0.0}\n",
            "{\"type\":\"motion\",\"timestamp\":-9223372036854775000,\"x\":30.0,\"y\":0.0,\"z\":0.0}\n",
        );
        let events = read_events(input.as_bytes()).unwrap();
        let export = replay(RecorderConfig::default(), &events, &[i64::MIN, i64::MAX]).unwrap();

        let stats = &export.status.stats;
        assert_eq!(stats.jolts_detected, 2);
        assert_eq!(stats.rejected_samples, 1);
        assert_eq!(stats.dumps_written, 4);
    }

    #[test]
    fn test_replay_position_error() {
        let input = "{\"type\":\"position_error\",\"timestamp\":3,\"error\":\"position_unavailable\"}\n";
        let events = read_events(input.as_bytes()).unwrap();
        let export = replay(RecorderConfig::default(), &events, &[]).unwrap();

        assert_eq!(export.status.stats.position_errors, 1);
        assert!(export
            .log
            .iter()
            .any(|l| l.ends_with("| GPS-ERROR: position unavailable (no signal)")));
    }

    #[test]
    fn test_replay_empty_stream_with_mark() {
        let export = replay(RecorderConfig::default(), &[], &[10]).unwrap();
        assert_eq!(export.status.stats.dumps_written, 1);
        assert!(export
            .log
            .iter()
            .any(|l| l.ends_with(crate::dump::EMPTY_BUFFER_LINE)));
    }
}
