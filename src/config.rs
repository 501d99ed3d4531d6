use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RecorderError, RecorderResult};

/// Trailing window retained by the flight recorder.
pub const WINDOW_MS: i64 = 2500;
/// Empirical jolt threshold in m/s^2 (gravity included). Tunable, not derived.
pub const JOLT_THRESHOLD_MS2: f64 = 25.0;
/// Minimum spacing between two jolt-triggered dumps.
pub const JOLT_COOLDOWN_MS: i64 = 5000;
/// A sensor with no data for this long is reported as silent.
pub const SENSOR_SILENCE_MS: i64 = 5000;
/// Lines shown by the live log view.
pub const LOG_TAIL_LINES: usize = 100;

/// Tunables for a recording session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub window_ms: i64,
    pub jolt_threshold: f64,
    pub jolt_cooldown_ms: i64,
    pub sensor_silence_ms: i64,
    pub log_tail_lines: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            window_ms: WINDOW_MS,
            jolt_threshold: JOLT_THRESHOLD_MS2,
            jolt_cooldown_ms: JOLT_COOLDOWN_MS,
            sensor_silence_ms: SENSOR_SILENCE_MS,
            log_tail_lines: LOG_TAIL_LINES,
        }
    }
}

impl RecorderConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> RecorderResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RecorderResult<()> {
        if self.window_ms <= 0 {
            return Err(RecorderError::InvalidParameters(format!(
                "window_ms must be positive (got {})",
                self.window_ms
            )));
        }
        if !self.jolt_threshold.is_finite() || self.jolt_threshold <= 0.0 {
            return Err(RecorderError::InvalidParameters(format!(
                "jolt_threshold must be a positive number (got {})",
                self.jolt_threshold
            )));
        }
        if self.jolt_cooldown_ms < 0 {
            return Err(RecorderError::InvalidParameters(format!(
                "jolt_cooldown_ms must not be negative (got {})",
                self.jolt_cooldown_ms
            )));
        }
        if self.sensor_silence_ms <= 0 {
            return Err(RecorderError::InvalidParameters(format!(
                "sensor_silence_ms must be positive (got {})",
                self.sensor_silence_ms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = RecorderConfig::default();
        assert_eq!(config.window_ms, 2500);
        assert_eq!(config.jolt_threshold, 25.0);
        assert_eq!(config.jolt_cooldown_ms, 5000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = RecorderConfig {
            window_ms: 0,
            ..RecorderConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RecorderError::InvalidParameters(_))
        ));

        let config = RecorderConfig {
            jolt_threshold: f64::NAN,
            ..RecorderConfig::default()
        };
        assert!(config.validate().is_err());

        let config = RecorderConfig {
            jolt_cooldown_ms: -1,
            ..RecorderConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "jolt_threshold": 18.5 }}"#).unwrap();

        let config = RecorderConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.jolt_threshold, 18.5);
        assert_eq!(config.window_ms, WINDOW_MS);
        assert_eq!(config.log_tail_lines, LOG_TAIL_LINES);
    }

    #[test]
    fn test_invalid_json_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "window_ms": -5 }}"#).unwrap();

        assert!(matches!(
            RecorderConfig::from_json_file(file.path()),
            Err(RecorderError::InvalidParameters(_))
        ));
    }
}
