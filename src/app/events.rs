//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, forward to a host,
//! etc.

use super::commands::NetCommand;
use crate::desk::{Direction, MotionState};

/// Why a desk movement ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The hold-to-run key was let go.
    Released,
    /// An explicit stop command.
    Command,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The application service has started.
    Started,

    /// The desk started moving.
    DeskMoving { direction: Direction, since_ms: u64 },

    /// The desk stopped normally after `moved_ms`.
    DeskStopped { reason: StopReason, moved_ms: u64 },

    /// A movement outlived the limit and was cut.  Reported once per
    /// runaway movement.
    EmergencyStop { elapsed_ms: u64 },

    /// The network queue was full.
    NetworkCommandDropped(NetCommand),

    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone)]
pub struct TelemetryData {
    pub uptime_ms: u64,
    pub desk: MotionState,
    pub height_cm: Option<f32>,
    pub fan_duty: u8,
    pub fan_percent: u8,
    pub volume_encoder: i32,
    pub hue_encoder: i32,
    pub hue_brightness: u8,
    pub hue_on: bool,
    pub sonar_timeouts: u32,
    pub emergency_stops: u32,
    pub dropped_commands: u32,
}
