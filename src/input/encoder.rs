//! Quadrature rotary encoder with integrated push-button.
//!
//! Rotation is counted on CLK falling edges only.  The DT level sampled on
//! the same tick decides the direction: DT at the configured clockwise level
//! means one step clockwise, the other level one step counter-clockwise.
//! Rising CLK edges and DT changes alone never count.
//!
//! The push-button is edge-triggered through the shared debounce window.

use embedded_hal::digital::InputPin;
use log::warn;

use super::debounce::DebounceRecord;
use super::push_event;
use crate::config::{InputConfig, Level};
use crate::events::{EncoderId, InputEvent, InputEvents, Rotation};

/// CLK, DT and switch lines of one encoder.
pub struct EncoderPins<I> {
    pub clk: I,
    pub dt: I,
    pub sw: I,
}

pub struct RotaryEncoder<I> {
    id: EncoderId,
    pins: EncoderPins<I>,
    clockwise_dt: Level,
    debounce_ms: u64,
    value: i32,
    /// Idle level of CLK with the pull-up is high.
    prev_clk: Level,
    button: DebounceRecord,
}

impl<I: InputPin> RotaryEncoder<I> {
    pub fn new(id: EncoderId, pins: EncoderPins<I>, cfg: &InputConfig) -> Self {
        Self {
            id,
            pins,
            clockwise_dt: cfg.encoder_clockwise_dt_level,
            debounce_ms: cfg.debounce_ms,
            value: 0,
            prev_clk: Level::High,
            button: DebounceRecord::new(),
        }
    }

    pub fn id(&self) -> EncoderId {
        self.id
    }

    /// Net detents turned since boot (clockwise positive).
    pub fn value(&self) -> i32 {
        self.value
    }

    /// Sample all three lines and append button then rotation events.
    pub fn poll(&mut self, now_ms: u64, events: &mut InputEvents) {
        let (Ok(clk), Ok(dt), Ok(sw_low)) = (
            self.pins.clk.is_high(),
            self.pins.dt.is_high(),
            self.pins.sw.is_low(),
        ) else {
            warn!("Encoder {:?}: read error, sample skipped", self.id);
            return;
        };

        if self.button.accept_edge(now_ms, sw_low, self.debounce_ms) {
            push_event(events, InputEvent::EncoderButtonPressed(self.id));
        }

        if let Some(rotation) = self.step(Level::from(clk), Level::from(dt)) {
            push_event(events, InputEvent::EncoderTurned(self.id, rotation));
        }
    }

    /// Feed one CLK/DT sample; returns the rotation if this sample is a
    /// CLK falling edge.
    fn step(&mut self, clk: Level, dt: Level) -> Option<Rotation> {
        let falling = self.prev_clk == Level::High && clk == Level::Low;
        self.prev_clk = clk;
        if !falling {
            return None;
        }
        let rotation = if dt == self.clockwise_dt {
            Rotation::Clockwise
        } else {
            Rotation::CounterClockwise
        };
        self.value = self.value.wrapping_add(rotation.step());
        Some(rotation)
    }
}
