//! Property-based tests for the flight recorder and jolt detector.

use jolt_recorder_rs::dump::EMPTY_BUFFER_LINE;
use jolt_recorder_rs::{
    FlightRecorder, JoltDetector, MemoryLog, MotionEvent, RecorderConfig, RecordingSession,
    Sample,
};
use proptest::prelude::*;

const WINDOW_MS: i64 = 2500;

/// Non-decreasing timestamps built from random gaps.
fn timestamps() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(0i64..1_500, 1..200).prop_map(|gaps| {
        gaps.iter()
            .scan(1_700_000_000_000i64, |t, gap| {
                *t += gap;
                Some(*t)
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Every retained sample lies within the window of the newest push.
    #[test]
    fn prop_window_invariant(ts in timestamps()) {
        let mut recorder = FlightRecorder::new(WINDOW_MS);
        for &t in &ts {
            recorder.push(Sample::motion(t, 0.0, 0.0, 9.8));
            for sample in recorder.iter() {
                prop_assert!(sample.timestamp >= t - WINDOW_MS,
                    "sample {} retained after push at {}", sample.timestamp, t);
            }
            prop_assert_eq!(recorder.latest_timestamp(), Some(t));
        }
    }

    /// Size grows by at most one per push and only shrinks through eviction.
    #[test]
    fn prop_size_changes_only_on_push(ts in timestamps()) {
        let mut recorder = FlightRecorder::new(WINDOW_MS);
        for &t in &ts {
            let before = recorder.len();
            let outcome = recorder.push(Sample::orientation(t, 1.0, 2.0, 3.0));
            prop_assert!(outcome.accepted);
            prop_assert_eq!(recorder.len(), before + 1 - outcome.evicted);
        }
        recorder.clear();
        prop_assert!(recorder.is_empty());
    }

    /// Retained samples stay in timestamp order even when producers are late.
    #[test]
    fn prop_order_with_jitter(raw in prop::collection::vec((0i64..10_000, -300i64..300), 1..150)) {
        let mut recorder = FlightRecorder::new(WINDOW_MS);
        let mut clock = 0;
        for (step, jitter) in raw {
            clock += step % 200;
            let t = clock + jitter;
            recorder.push(Sample::motion(t, 0.0, 0.0, 9.8));
            let ordered: Vec<i64> = recorder.iter().map(|s| s.timestamp).collect();
            prop_assert!(ordered.windows(2).all(|w| w[0] <= w[1]));
            let latest = recorder.latest_timestamp().unwrap();
            prop_assert!(ordered.iter().all(|&s| s >= latest - WINDOW_MS));
        }
    }

    /// Dumping twice without a push renders identical lines.
    #[test]
    fn prop_dump_is_non_destructive(ts in timestamps()) {
        let mut recorder = FlightRecorder::new(WINDOW_MS);
        for &t in &ts {
            recorder.push(Sample::motion(t, 1.0, 2.0, 3.0));
        }
        let marker = *ts.last().unwrap();
        let len = recorder.len();

        let mut log = MemoryLog::new();
        let first = recorder.dump(marker, "A", &mut log);
        let second = recorder.dump(marker, "A", &mut log);

        prop_assert_eq!(first.lines, second.lines);
        prop_assert_eq!(recorder.len(), len);
        prop_assert_eq!(first.sample_count, len);
    }

    /// A rapid burst above threshold fires exactly once.
    #[test]
    fn prop_burst_fires_once(
        start in 0i64..1_000_000,
        count in 2usize..200,
        step in 1i64..20,
        magnitude in 25.01f64..200.0,
    ) {
        let mut detector = JoltDetector::new(25.0, 5000);
        let fired = (0..count)
            .filter(|i| detector.check(start + *i as i64 * step, magnitude).is_some())
            .count();
        prop_assert_eq!(fired, 1);
    }

    /// Spikes spaced beyond the cooldown each fire.
    #[test]
    fn prop_spaced_spikes_each_fire(count in 1usize..50, extra in 1i64..10_000) {
        let mut detector = JoltDetector::new(25.0, 5000);
        let fired = (0..count)
            .filter(|i| detector.check(*i as i64 * (5000 + extra), 30.0).is_some())
            .count();
        prop_assert_eq!(fired, count);
    }

    /// Null axis samples never reach the recorder or the detector.
    #[test]
    fn prop_null_axis_is_skipped(y in -100.0f64..100.0, z in -100.0f64..100.0) {
        let mut session = RecordingSession::new(RecorderConfig::default(), MemoryLog::new()).unwrap();
        session.start(0).unwrap();
        let jolt = session.on_motion(10, MotionEvent { x: None, y: Some(y), z: Some(z) });

        prop_assert!(jolt.is_none());
        prop_assert!(session.recorder().is_empty());
        prop_assert_eq!(session.detector().last_jolt(), None);
    }
}

#[test]
fn dump_after_clear_shows_empty_marker() {
    let mut recorder = FlightRecorder::new(WINDOW_MS);
    recorder.push(Sample::motion(0, 0.0, 0.0, 9.8));
    recorder.clear();

    for _ in 0..3 {
        let mut log = MemoryLog::new();
        let report = recorder.dump(0, "AFTER CLEAR", &mut log);
        assert_eq!(report.body().len(), 1);
        assert_eq!(log.messages().filter(|m| *m == EMPTY_BUFFER_LINE).count(), 1);
    }
}
