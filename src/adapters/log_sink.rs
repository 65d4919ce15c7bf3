//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{error, info, warn};

use crate::app::events::{AppEvent, TelemetryData};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events written since boot.
    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        self.emitted = self.emitted.wrapping_add(1);
        match event {
            AppEvent::Telemetry(t) => info!("{}", telemetry_line(t)),
            AppEvent::DeskMoving { direction, since_ms } => {
                info!("DESK  | moving {:?} since t={}ms", direction, since_ms);
            }
            AppEvent::DeskStopped { reason, moved_ms } => {
                info!("DESK  | stopped ({:?}) after {}ms", reason, moved_ms);
            }
            AppEvent::EmergencyStop { elapsed_ms } => {
                error!("ESTOP | desk movement cut after {}ms", elapsed_ms);
            }
            AppEvent::NetworkCommandDropped(cmd) => {
                warn!("NET   | dropped {:?}", cmd);
            }
            AppEvent::Started => info!("START | console ready"),
        }
    }
}

fn telemetry_line(t: &TelemetryData) -> String {
    let height = t
        .height_cm
        .map_or_else(|| "---".to_string(), |h| format!("{h:.0}"));
    format!(
        "TELEM | up={}s | desk={:?} h={}cm | fan={}% (duty {}) | \
         enc vol={} hue={} | hue={} bri={} | sonar_to={} estops={} dropped={}",
        t.uptime_ms / 1_000,
        t.desk,
        height,
        t.fan_percent,
        t.fan_duty,
        t.volume_encoder,
        t.hue_encoder,
        if t.hue_on { "ON" } else { "OFF" },
        t.hue_brightness,
        t.sonar_timeouts,
        t.emergency_stops,
        t.dropped_commands,
    )
}
