use crate::config::SENSOR_SILENCE_MS;
use crate::sample::{SampleKind, TimestampMs};

/// What the first callback from a sensor looked like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstFire {
    WithData,
    NullData,
}

/// Tracks liveness of a single sensor source
#[derive(Debug, Clone)]
pub struct SensorHeartbeat {
    kind: SampleKind,
    fired: bool,
    armed_at: Option<TimestampMs>,
    last_data: Option<TimestampMs>,
    silence_ms: i64,
    silence_reported: bool,
}

impl SensorHeartbeat {
    pub fn new(kind: SampleKind, silence_ms: i64) -> Self {
        Self {
            kind,
            fired: false,
            armed_at: None,
            last_data: None,
            silence_ms,
            silence_reported: false,
        }
    }

    pub fn with_default_silence(kind: SampleKind) -> Self {
        Self::new(kind, SENSOR_SILENCE_MS)
    }

    pub fn kind(&self) -> SampleKind {
        self.kind
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    pub fn last_data(&self) -> Option<TimestampMs> {
        self.last_data
    }

    /// Start a fresh watch period.
    pub fn arm(&mut self, now: TimestampMs) {
        self.fired = false;
        self.armed_at = Some(now);
        self.last_data = None;
        self.silence_reported = false;
    }

    /// Record a callback. Returns `Some` only for the very first callback
    /// since the last `arm`.
    pub fn observe(&mut self, timestamp: TimestampMs, has_data: bool) -> Option<FirstFire> {
        if has_data {
            self.last_data = Some(self.last_data.map_or(timestamp, |t| t.max(timestamp)));
            self.silence_reported = false;
        }

        if self.fired {
            return None;
        }
        self.fired = true;
        Some(if has_data {
            FirstFire::WithData
        } else {
            FirstFire::NullData
        })
    }

    pub fn silent_for(&self, now: TimestampMs) -> Option<i64> {
        let reference = self.last_data.or(self.armed_at)?;
        let elapsed = now.saturating_sub(reference);
        (elapsed > self.silence_ms).then_some(elapsed)
    }

    pub fn is_silent(&self, now: TimestampMs) -> bool {
        self.silent_for(now).is_some()
    }

    /// Silence duration, reported once per silent stretch.
    pub fn poll_silence(&mut self, now: TimestampMs) -> Option<i64> {
        if self.silence_reported {
            return None;
        }
        let elapsed = self.silent_for(now)?;
        self.silence_reported = true;
        Some(elapsed)
    }
}
