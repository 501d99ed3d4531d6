use log::Level;
use serde::{Deserialize, Serialize};

use crate::config::RecorderConfig;
use crate::dump::DumpSummary;
use crate::error::{RecorderError, RecorderResult};
use crate::heartbeat::{FirstFire, SensorHeartbeat};
use crate::jolt::{Jolt, JoltDetector};
use crate::recorder::{FlightRecorder, PushOutcome};
use crate::sample::{
    MotionEvent, OrientationEvent, PositionError, PositionFix, Reading, SampleKind, TimestampMs,
};
use crate::sensors::{DataSource, SensorChannel};
use crate::sink::LogSink;
use crate::status::RecorderStatus;

pub const MANUAL_MARK_REASON: &str = "INCIDENT MARKED BY USER";

/// Session state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Created, not recording
    Idle,
    /// Feeding samples into the flight recorder
    Recording,
}

/// Counters kept for the lifetime of a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub motion_samples: u64,
    pub orientation_samples: u64,
    pub skipped_samples: u64,
    pub rejected_samples: u64,
    pub evicted_samples: u64,
    pub position_fixes: u64,
    pub position_errors: u64,
    pub jolts_detected: u64,
    pub dumps_written: u64,
}

/// A logging session. Owns every piece of mutable recorder state.
pub struct RecordingSession<S: LogSink> {
    config: RecorderConfig,
    state: SessionState,
    recorder: FlightRecorder,
    detector: JoltDetector,
    motion: SensorHeartbeat,
    orientation: SensorHeartbeat,
    sink: S,
    stats: SessionStats,
    started_at: Option<TimestampMs>,
}

impl<S: LogSink> RecordingSession<S> {
    pub fn new(config: RecorderConfig, sink: S) -> RecorderResult<Self> {
        config.validate()?;

        Ok(Self {
            recorder: FlightRecorder::new(config.window_ms),
            detector: JoltDetector::new(config.jolt_threshold, config.jolt_cooldown_ms),
            motion: SensorHeartbeat::new(SampleKind::Motion, config.sensor_silence_ms),
            orientation: SensorHeartbeat::new(SampleKind::Orientation, config.sensor_silence_ms),
            config,
            state: SessionState::Idle,
            sink,
            stats: SessionStats::default(),
            started_at: None,
        })
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn recorder(&self) -> &FlightRecorder {
        &self.recorder
    }

    pub fn detector(&self) -> &JoltDetector {
        &self.detector
    }

    pub fn started_at(&self) -> Option<TimestampMs> {
        self.started_at
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Transition Idle → Recording
    pub fn start(&mut self, now: TimestampMs) -> RecorderResult<()> {
        if self.is_recording() {
            return Err(RecorderError::AlreadyRunning);
        }

        self.recorder.clear();
        self.detector.reset();
        self.motion.arm(now);
        self.orientation.arm(now);
        self.stats = SessionStats::default();
        self.started_at = Some(now);
        self.state = SessionState::Recording;

        self.log(
            Level::Info,
            &format!(
                "Logging started (window {}ms, jolt threshold {:.1} m/s², cooldown {}ms)",
                self.config.window_ms, self.config.jolt_threshold, self.config.jolt_cooldown_ms
            ),
        );
        Ok(())
    }

    /// Transition Recording → Idle
    pub fn stop(&mut self, _now: TimestampMs) -> RecorderResult<()> {
        if !self.is_recording() {
            return Err(RecorderError::NotRunning);
        }

        self.recorder.clear();
        self.state = SessionState::Idle;
        self.log(Level::Info, "Logging stopped.");
        Ok(())
    }

    /// Accelerometer callback. Returns the jolt if this sample triggered a dump.
    pub fn on_motion(&mut self, timestamp: TimestampMs, event: MotionEvent) -> Option<Jolt> {
        if !self.is_recording() {
            return None;
        }

        let reading = event.reading();
        let first = self.motion.observe(timestamp, reading.is_some());
        self.acknowledge(SampleKind::Motion, first);

        let Some(reading) = reading else {
            self.stats.skipped_samples += 1;
            return None;
        };
        self.stats.motion_samples += 1;
        if !self.buffer(timestamp, reading).accepted {
            // Too old for the window, so it could not appear in its own dump
            return None;
        }

        let magnitude = reading.magnitude()?;
        let jolt = self.detector.check(timestamp, magnitude)?;
        self.stats.jolts_detected += 1;
        self.dump(timestamp, &jolt.reason());
        Some(jolt)
    }

    pub fn on_orientation(&mut self, timestamp: TimestampMs, event: OrientationEvent) {
        if !self.is_recording() {
            return;
        }

        let reading = event.reading();
        let first = self.orientation.observe(timestamp, reading.is_some());
        self.acknowledge(SampleKind::Orientation, first);

        match reading {
            Some(reading) => {
                self.stats.orientation_samples += 1;
                self.buffer(timestamp, reading);
            }
            None => self.stats.skipped_samples += 1,
        }
    }

    /// GPS fixes go straight to the log; they are too sparse for the recorder.
    pub fn on_position(&mut self, _timestamp: TimestampMs, fix: PositionFix) {
        if !self.is_recording() {
            return;
        }
        self.stats.position_fixes += 1;
        self.log(Level::Info, &fix.describe());
    }

    pub fn on_position_error(&mut self, _timestamp: TimestampMs, error: PositionError) {
        if !self.is_recording() {
            return;
        }
        self.stats.position_errors += 1;
        self.log(Level::Error, &error.describe());
    }

    /// Note which source a sensor loop reads from. Logged in any state.
    pub fn on_source(&mut self, sensor: SensorChannel, source: DataSource) {
        match source {
            DataSource::Termux => self.log(
                Level::Info,
                &format!("SENSOR: {} reading from termux", sensor),
            ),
            DataSource::Synthetic => self.log(
                Level::Warn,
                &format!("SENSOR: {} using SYNTHETIC data", sensor),
            ),
        }
    }

    /// Manual marker from the user. Same dump path as a jolt.
    pub fn mark_incident(&mut self, now: TimestampMs) -> RecorderResult<DumpSummary> {
        if !self.is_recording() {
            return Err(RecorderError::NotRunning);
        }
        Ok(self.dump(now, MANUAL_MARK_REASON))
    }

    /// Write the flight recorder contents to the log relative to `marker`.
    pub fn dump(&mut self, marker: TimestampMs, reason: &str) -> DumpSummary {
        let report = self.recorder.dump(marker, reason, &mut self.sink);
        self.stats.dumps_written += 1;
        DumpSummary::from(&report)
    }

    /// Warn about sensors that stopped delivering data.
    pub fn check_sensors(&mut self, now: TimestampMs) {
        if !self.is_recording() {
            return;
        }
        for kind in [SampleKind::Motion, SampleKind::Orientation] {
            let heartbeat = match kind {
                SampleKind::Motion => &mut self.motion,
                SampleKind::Orientation => &mut self.orientation,
            };
            if let Some(silent_ms) = heartbeat.poll_silence(now) {
                self.log(
                    Level::Warn,
                    &format!("SENSOR: {} silent for {:.1}s", kind, silent_ms as f64 / 1000.0),
                );
            }
        }
    }

    pub fn status(&self, now: TimestampMs) -> RecorderStatus {
        RecorderStatus {
            timestamp: now,
            state: self.state,
            uptime_ms: self.started_at.map_or(0, |s| now.saturating_sub(s).max(0)),
            buffered_samples: self.recorder.len(),
            window_ms: self.recorder.window_ms(),
            motion_alive: self.motion.has_fired() && !self.motion.is_silent(now),
            orientation_alive: self.orientation.has_fired() && !self.orientation.is_silent(now),
            last_jolt: self.detector.last_jolt(),
            stats: self.stats.clone(),
        }
    }

    fn buffer(&mut self, timestamp: TimestampMs, reading: Reading) -> PushOutcome {
        let outcome = self.recorder.push_reading(timestamp, reading);
        if !outcome.accepted {
            self.stats.rejected_samples += 1;
        }
        self.stats.evicted_samples += outcome.evicted as u64;
        outcome
    }

    fn acknowledge(&mut self, kind: SampleKind, first: Option<FirstFire>) {
        match first {
            Some(FirstFire::WithData) => self.log(
                Level::Info,
                &format!("SENSOR: {} is firing with data.", kind),
            ),
            Some(FirstFire::NullData) => self.log(
                Level::Warn,
                &format!("SENSOR: {} is firing, BUT DATA IS NULL.", kind),
            ),
            None => {}
        }
    }

    fn log(&mut self, level: Level, message: &str) {
        self.sink.append_line(level, message);
    }
}
