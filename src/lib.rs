// Jolt Recorder
// Time-windowed sensor flight recorder with jolt-triggered dumps

pub mod config;
pub mod dump;
pub mod error;
pub mod export;
pub mod heartbeat;
pub mod jolt;
pub mod recorder;
pub mod replay;
pub mod sample;
pub mod sensors;
pub mod session;
pub mod sink;
pub mod status;

pub use config::RecorderConfig;
pub use dump::{DumpReport, DumpSummary};
pub use error::{RecorderError, RecorderResult};
pub use jolt::{Jolt, JoltDetector};
pub use recorder::{FlightRecorder, PushOutcome};
pub use sample::{
    MotionEvent, OrientationEvent, PositionError, PositionFix, Reading, Sample, SampleKind,
    TimestampMs,
};
pub use sensors::SensorEvent;
pub use session::{RecordingSession, SessionState, SessionStats};
pub use sink::{ChannelSink, LogEntry, LogSink, MemoryLog};
pub use status::RecorderStatus;

/// Route one recorded/polled event into a session.
pub fn apply_event<S: LogSink>(session: &mut RecordingSession<S>, event: &SensorEvent) -> Option<Jolt> {
    match *event {
        SensorEvent::Motion { timestamp, event } => session.on_motion(timestamp, event),
        SensorEvent::Orientation { timestamp, event } => {
            session.on_orientation(timestamp, event);
            None
        }
        SensorEvent::Position { timestamp, fix } => {
            session.on_position(timestamp, fix);
            None
        }
        SensorEvent::PositionError { timestamp, error } => {
            session.on_position_error(timestamp, error);
            None
        }
        SensorEvent::Source { sensor, source, .. } => {
            session.on_source(sensor, source);
            None
        }
    }
}
