use serde::{Deserialize, Serialize};

use crate::config::{JOLT_COOLDOWN_MS, JOLT_THRESHOLD_MS2};
use crate::sample::TimestampMs;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Jolt {
    pub timestamp: TimestampMs,
    pub magnitude: f64, // m/s^2, gravity included
    pub threshold: f64,
}

impl Jolt {
    /// Dump reason for a jolt-triggered dump.
    pub fn reason(&self) -> String {
        format!("HARD JOLT DETECTED (G-Force: {:.1})", self.magnitude)
    }
}

/// Flags acceleration spikes above a fixed threshold, at most once per cooldown.
pub struct JoltDetector {
    threshold: f64,
    cooldown_ms: i64,
    last_jolt: Option<TimestampMs>,
}

impl JoltDetector {
    pub fn new(threshold: f64, cooldown_ms: i64) -> Self {
        Self {
            threshold,
            cooldown_ms,
            last_jolt: None,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn last_jolt(&self) -> Option<TimestampMs> {
        self.last_jolt
    }

    pub fn check(&mut self, timestamp: TimestampMs, magnitude: f64) -> Option<Jolt> {
        if magnitude <= self.threshold {
            return None;
        }

        let cooled_down = self
            .last_jolt
            .map_or(true, |last| timestamp.saturating_sub(last) > self.cooldown_ms);
        if !cooled_down {
            return None;
        }

        self.last_jolt = Some(timestamp);
        Some(Jolt {
            timestamp,
            magnitude,
            threshold: self.threshold,
        })
    }

    pub fn reset(&mut self) {
        self.last_jolt = None;
    }
}

impl Default for JoltDetector {
    fn default() -> Self {
        Self::new(JOLT_THRESHOLD_MS2, JOLT_COOLDOWN_MS)
    }
}
