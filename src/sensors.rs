use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tokio::time::{interval, Duration};

use crate::sample::{MotionEvent, OrientationEvent, PositionError, PositionFix, TimestampMs};
use crate::status::current_timestamp_ms;

/// One sensor callback, as delivered to the session owner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SensorEvent {
    Motion {
        timestamp: TimestampMs,
        #[serde(flatten)]
        event: MotionEvent,
    },
    Orientation {
        timestamp: TimestampMs,
        #[serde(flatten)]
        event: OrientationEvent,
    },
    Position {
        timestamp: TimestampMs,
        #[serde(flatten)]
        fix: PositionFix,
    },
    PositionError {
        timestamp: TimestampMs,
        error: PositionError,
    },
    /// A sensor loop started on, or switched to, a different data source.
    Source {
        timestamp: TimestampMs,
        sensor: SensorChannel,
        source: DataSource,
    },
}

impl SensorEvent {
    pub fn timestamp(&self) -> TimestampMs {
        match self {
            SensorEvent::Motion { timestamp, .. }
            | SensorEvent::Orientation { timestamp, .. }
            | SensorEvent::Position { timestamp, .. }
            | SensorEvent::PositionError { timestamp, .. }
            | SensorEvent::Source { timestamp, .. } => *timestamp,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SensorEvent::Motion { .. } => "motion",
            SensorEvent::Orientation { .. } => "orientation",
            SensorEvent::Position { .. } | SensorEvent::PositionError { .. } => "position",
            SensorEvent::Source { .. } => "source",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorChannel {
    Motion,
    Orientation,
    Position,
}

impl fmt::Display for SensorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SensorChannel::Motion => "MOTION",
            SensorChannel::Orientation => "ORIENTATION",
            SensorChannel::Position => "POSITION",
        })
    }
}

/// Where a loop's readings come from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Termux,
    Synthetic,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataSource::Termux => "termux",
            DataSource::Synthetic => "synthetic",
        })
    }
}

/// Remembers the last data source of one loop and reports changes.
#[derive(Debug)]
pub struct SourceTracker {
    sensor: SensorChannel,
    current: Option<DataSource>,
}

impl SourceTracker {
    pub fn new(sensor: SensorChannel) -> Self {
        Self {
            sensor,
            current: None,
        }
    }

    pub fn current(&self) -> Option<DataSource> {
        self.current
    }

    /// `Some` on the first reading and whenever the source switches.
    pub fn update(&mut self, timestamp: TimestampMs, source: DataSource) -> Option<SensorEvent> {
        if self.current == Some(source) {
            return None;
        }
        match (self.current, source) {
            (None, DataSource::Termux) => log::info!("[{}] reading from termux", self.sensor),
            (None, DataSource::Synthetic) => log::warn!("[{}] using synthetic data", self.sensor),
            (Some(from), to) => log::warn!("[{}] source switched {} -> {}", self.sensor, from, to),
        }
        self.current = Some(source);
        Some(SensorEvent::Source {
            timestamp,
            sensor: self.sensor,
            source,
        })
    }
}

fn source_of<T>(measured: &Option<T>) -> DataSource {
    if measured.is_some() {
        DataSource::Termux
    } else {
        DataSource::Synthetic
    }
}

/// How sensor loops obtain their data
#[derive(Clone, Copy, Debug, Default)]
pub struct SourceOptions {
    /// Skip `termux-sensor` and always synthesize data
    pub synthetic_only: bool,
    /// Inject an acceleration spike every N synthetic motion samples (0 = never)
    pub spike_every: u64,
}

/// Forward an event; false once the receiver is gone.
fn forward(tx: &Sender<SensorEvent>, event: SensorEvent, sent: &mut u64) -> bool {
    let label = event.label();
    match tx.try_send(event) {
        Ok(_) => {
            *sent += 1;
            if *sent % 500 == 0 {
                log::debug!("[{}] {} samples", label, sent);
            }
            true
        }
        Err(TrySendError::Closed(_)) => {
            log::debug!("[{}] channel closed after {} samples", label, sent);
            false
        }
        // Channel full, drop this sample
        Err(TrySendError::Full(_)) => true,
    }
}

/// Deliver a source notice. Waits for room, these are rare and must not be dropped.
async fn announce(tx: &Sender<SensorEvent>, notice: Option<SensorEvent>) -> bool {
    match notice {
        Some(event) => tx.send(event).await.is_ok(),
        None => true,
    }
}

pub async fn motion_loop(tx: Sender<SensorEvent>, period: Duration, options: SourceOptions) {
    let mut interval = interval(period);
    let mut sent = 0u64;
    let mut tracker = SourceTracker::new(SensorChannel::Motion);

    loop {
        interval.tick().await;

        let measured = if options.synthetic_only {
            None
        } else {
            read_termux("accelerometer").map(|text| parse_motion_output(&text))
        };
        let source = source_of(&measured);
        let event = measured.unwrap_or_else(|| synthetic_motion(options.spike_every));

        let timestamp = current_timestamp_ms();
        if !announce(&tx, tracker.update(timestamp, source)).await {
            break;
        }
        if !forward(&tx, SensorEvent::Motion { timestamp, event }, &mut sent) {
            break;
        }
    }
}

pub async fn orientation_loop(tx: Sender<SensorEvent>, period: Duration, options: SourceOptions) {
    let mut interval = interval(period);
    let mut sent = 0u64;
    let mut tracker = SourceTracker::new(SensorChannel::Orientation);

    loop {
        interval.tick().await;

        let measured = if options.synthetic_only {
            None
        } else {
            read_termux("orientation").map(|text| parse_orientation_output(&text))
        };
        let source = source_of(&measured);
        let event = measured.unwrap_or_else(synthetic_orientation);

        let timestamp = current_timestamp_ms();
        if !announce(&tx, tracker.update(timestamp, source)).await {
            break;
        }
        if !forward(&tx, SensorEvent::Orientation { timestamp, event }, &mut sent) {
            break;
        }
    }
}

pub async fn position_loop(tx: Sender<SensorEvent>, period: Duration, options: SourceOptions) {
    let mut interval = interval(period);
    let mut sent = 0u64;
    let mut tracker = SourceTracker::new(SensorChannel::Position);

    loop {
        interval.tick().await;

        let measured = if options.synthetic_only {
            None
        } else {
            read_location()
        };
        let source = source_of(&measured);
        let timestamp = current_timestamp_ms();
        if !announce(&tx, tracker.update(timestamp, source)).await {
            break;
        }

        let event = match measured.unwrap_or_else(|| Ok(synthetic_position())) {
            Ok(fix) => SensorEvent::Position { timestamp, fix },
            Err(error) => SensorEvent::PositionError { timestamp, error },
        };
        if !forward(&tx, event, &mut sent) {
            break;
        }
    }
}

fn read_termux(sensor: &str) -> Option<String> {
    let output = Command::new("termux-sensor")
        .arg("-n")
        .arg("1")
        .arg("-s")
        .arg(sensor)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// `None` when termux-location cannot be run at all.
fn read_location() -> Option<Result<PositionFix, PositionError>> {
    let output = Command::new("termux-location")
        .arg("-p")
        .arg("gps")
        .arg("-r")
        .arg("once")
        .output()
        .ok()?;
    if !output.status.success() {
        return Some(Err(classify_location_error(&String::from_utf8_lossy(
            &output.stderr,
        ))));
    }
    Some(parse_location_output(&String::from_utf8_lossy(&output.stdout)))
}

#[derive(Deserialize)]
struct TermuxLocation {
    latitude: f64,
    longitude: f64,
    accuracy: f64,
    speed: Option<f64>,
}

/// Parse the JSON object printed by termux-location.
pub fn parse_location_output(output: &str) -> Result<PositionFix, PositionError> {
    let output = output.trim();
    if output.is_empty() {
        // termux-location prints nothing when no fix arrived in time
        return Err(PositionError::Timeout);
    }
    match serde_json::from_str::<TermuxLocation>(output) {
        Ok(location) => Ok(PositionFix {
            latitude: location.latitude,
            longitude: location.longitude,
            accuracy_m: location.accuracy,
            speed_ms: location.speed,
        }),
        Err(_) => Err(classify_location_error(output)),
    }
}

fn classify_location_error(text: &str) -> PositionError {
    let text = text.to_ascii_lowercase();
    if text.contains("permission") {
        PositionError::PermissionDenied
    } else if text.contains("timeout") || text.contains("timed out") {
        PositionError::Timeout
    } else {
        PositionError::PositionUnavailable
    }
}

/// Result of probing one Termux:API tool at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCheck {
    pub tool: &'static str,
    pub available: bool,
}

impl ToolCheck {
    pub fn describe(&self) -> String {
        let verdict = if self.available { "AVAILABLE" } else { "NOT AVAILABLE" };
        format!("SYSTEM-CHECK: {} ... {}", self.tool, verdict)
    }
}

/// Probe the external tools the sensor loops depend on.
pub fn system_check() -> Vec<ToolCheck> {
    ["termux-sensor", "termux-location"]
        .into_iter()
        .map(|tool| ToolCheck {
            tool,
            available: Command::new(tool).arg("-h").output().is_ok(),
        })
        .collect()
}

/// Pull `key=value` pairs out of a termux-sensor line. Missing or unparsable
/// values stay `None`, which the session treats as a null reading.
fn parse_field(output: &str, key: &str) -> Option<f64> {
    output.split(',').find_map(|part| {
        let part = part.trim();
        let value = part
            .strip_prefix(key)
            .and_then(|rest| rest.strip_prefix('='))?;
        value.trim().parse().ok()
    })
}

/// Example: "Accelerometer event: x=0.5, y=0.3, z=9.8, accuracy=0"
pub fn parse_motion_output(output: &str) -> MotionEvent {
    let body = output.split_once(':').map_or(output, |(_, rest)| rest);
    MotionEvent {
        x: parse_field(body, "x"),
        y: parse_field(body, "y"),
        z: parse_field(body, "z"),
    }
}

/// Example: "Orientation event: alpha=10.0, beta=-2.5, gamma=0.1"
pub fn parse_orientation_output(output: &str) -> OrientationEvent {
    let body = output.split_once(':').map_or(output, |(_, rest)| rest);
    OrientationEvent {
        alpha: parse_field(body, "alpha"),
        beta: parse_field(body, "beta"),
        gamma: parse_field(body, "gamma"),
    }
}

fn synthetic_motion(spike_every: u64) -> MotionEvent {
    use std::f64::consts::PI;
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let t = n as f64 * 0.02;

    if spike_every > 0 && n > 0 && n % spike_every == 0 {
        return MotionEvent::new(28.0, 6.0, 9.81);
    }

    MotionEvent::new(
        (t * 2.0 * PI).sin() * 0.5,
        (t * 2.0 * PI).cos() * 0.3,
        9.81 + (t * PI).sin() * 0.1,
    )
}

fn synthetic_orientation() -> OrientationEvent {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let t = COUNTER.fetch_add(1, Ordering::Relaxed) as f64 * 0.02;

    OrientationEvent::new((t * 5.0) % 360.0, (t * 0.5).sin() * 10.0, (t * 0.3).cos() * 5.0)
}

fn synthetic_position() -> PositionFix {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed) as f64;

    PositionFix {
        latitude: 37.7749 + seq * 0.00001,
        longitude: -122.4194 + seq * 0.00001,
        accuracy_m: 5.0 + (seq * 0.1).sin() * 2.0,
        speed_ms: Some(10.0 + (seq * 0.5).sin() * 5.0),
    }
}
