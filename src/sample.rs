use std::fmt;

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
pub type TimestampMs = i64;

/// Source tag of a recorded sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SampleKind {
    Motion,
    Orientation,
}

impl SampleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleKind::Motion => "MOTION",
            SampleKind::Orientation => "ORIENTATION",
        }
    }
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured sensor values. Formatting is deferred to `describe()`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reading {
    /// Acceleration including gravity, m/s^2
    Motion { x: f64, y: f64, z: f64 },
    /// Device orientation, degrees
    Orientation { alpha: f64, beta: f64, gamma: f64 },
}

impl Reading {
    pub fn kind(&self) -> SampleKind {
        match self {
            Reading::Motion { .. } => SampleKind::Motion,
            Reading::Orientation { .. } => SampleKind::Orientation,
        }
    }

    /// Human-readable payload used in dump lines.
    pub fn describe(&self) -> String {
        match self {
            Reading::Motion { x, y, z } => format!("X: {:.2} | Y: {:.2} | Z: {:.2}", x, y, z),
            Reading::Orientation { alpha, beta, gamma } => format!(
                "Alpha(Z): {:.1} | Beta(X): {:.1} | Gamma(Y): {:.1}",
                alpha, beta, gamma
            ),
        }
    }

    /// Acceleration magnitude; `None` for non-motion readings.
    pub fn magnitude(&self) -> Option<f64> {
        match self {
            Reading::Motion { x, y, z } => Some(vector_magnitude(*x, *y, *z)),
            Reading::Orientation { .. } => None,
        }
    }
}

/// One flight recorder entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: TimestampMs,
    pub reading: Reading,
}

impl Sample {
    pub fn new(timestamp: TimestampMs, reading: Reading) -> Self {
        Self { timestamp, reading }
    }

    pub fn motion(timestamp: TimestampMs, x: f64, y: f64, z: f64) -> Self {
        Self::new(timestamp, Reading::Motion { x, y, z })
    }

    pub fn orientation(timestamp: TimestampMs, alpha: f64, beta: f64, gamma: f64) -> Self {
        Self::new(timestamp, Reading::Orientation { alpha, beta, gamma })
    }

    pub fn kind(&self) -> SampleKind {
        self.reading.kind()
    }
}

pub fn vector_magnitude(x: f64, y: f64, z: f64) -> f64 {
    (x * x + y * y + z * z).sqrt()
}

fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Raw accelerometer callback payload. Platforms may deliver null axes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionEvent {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

impl MotionEvent {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
        }
    }

    /// `None` unless every axis carries a finite value.
    pub fn reading(&self) -> Option<Reading> {
        Some(Reading::Motion {
            x: usable(self.x)?,
            y: usable(self.y)?,
            z: usable(self.z)?,
        })
    }
}

/// Raw orientation callback payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OrientationEvent {
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub gamma: Option<f64>,
}

impl OrientationEvent {
    pub fn new(alpha: f64, beta: f64, gamma: f64) -> Self {
        Self {
            alpha: Some(alpha),
            beta: Some(beta),
            gamma: Some(gamma),
        }
    }

    pub fn reading(&self) -> Option<Reading> {
        Some(Reading::Orientation {
            alpha: usable(self.alpha)?,
            beta: usable(self.beta)?,
            gamma: usable(self.gamma)?,
        })
    }
}

/// GPS fix. Logged directly, never buffered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: f64,
    pub speed_ms: Option<f64>,
}

impl PositionFix {
    pub fn speed_kmh(&self) -> f64 {
        self.speed_ms.map(|s| s * 3.6).unwrap_or(0.0)
    }

    pub fn describe(&self) -> String {
        format!(
            "GPS-OK | Acc: {:.1}m | Speed: {:.1} km/h",
            self.accuracy_m,
            self.speed_kmh()
        )
    }
}

/// Why a GPS fix could not be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionError {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Unknown(i32),
}

impl PositionError {
    pub fn describe(&self) -> String {
        match self {
            PositionError::PermissionDenied => "GPS-ERROR: location access denied".to_string(),
            PositionError::PositionUnavailable => {
                "GPS-ERROR: position unavailable (no signal)".to_string()
            }
            PositionError::Timeout => "GPS-ERROR: timeout".to_string(),
            PositionError::Unknown(code) => format!("GPS-ERROR: unknown error (code {})", code),
        }
    }
}
