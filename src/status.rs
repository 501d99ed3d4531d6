use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::sample::TimestampMs;
use crate::session::{SessionState, SessionStats};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RecorderStatus {
    pub timestamp: TimestampMs,
    pub state: SessionState,
    pub uptime_ms: i64,
    pub buffered_samples: usize,
    pub window_ms: i64,
    // Sensor liveness
    pub motion_alive: bool,
    pub orientation_alive: bool,
    pub last_jolt: Option<TimestampMs>,
    pub stats: SessionStats,
}

impl RecorderStatus {
    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// One-line summary for the console.
    pub fn summary(&self) -> String {
        format!(
            "{:?} | up {:.1}s | buffered {} | motion {} | orientation {} | jolts {} | dumps {}",
            self.state,
            self.uptime_ms as f64 / 1000.0,
            self.buffered_samples,
            if self.motion_alive { "✓" } else { "⚠" },
            if self.orientation_alive { "✓" } else { "⚠" },
            self.stats.jolts_detected,
            self.stats.dumps_written,
        )
    }
}

/// Wall-clock milliseconds since the Unix epoch.
pub fn current_timestamp_ms() -> TimestampMs {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as TimestampMs
}
