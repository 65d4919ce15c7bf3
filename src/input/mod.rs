//! Switch and encoder polling.
//!
//! [`Poller::poll`] samples every input line once and returns the ordered
//! events of the tick: single-row switches, matrix cells (row-major), then
//! encoder 1 and encoder 2.

pub mod debounce;
pub mod encoder;
pub mod matrix;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::warn;

use crate::config::InputConfig;
use crate::events::{EncoderId, InputEvent, InputEvents, SwitchId};
use debounce::DebounceRecord;
use encoder::{EncoderPins, RotaryEncoder};
use matrix::{MATRIX_COLS, MATRIX_ROWS, SwitchMatrix};

pub const SINGLE_ROW_COUNT: usize = 5;

/// Every input line the poller owns, already configured by board bring-up.
pub struct InputPins<I, O> {
    pub single_row: [I; SINGLE_ROW_COUNT],
    pub matrix_rows: [O; MATRIX_ROWS],
    pub matrix_cols: [I; MATRIX_COLS],
    pub encoder_volume: EncoderPins<I>,
    pub encoder_hue: EncoderPins<I>,
}

pub struct Poller<I, O, D> {
    single_row: [I; SINGLE_ROW_COUNT],
    single_row_records: [DebounceRecord; SINGLE_ROW_COUNT],
    matrix: SwitchMatrix<O, I, D>,
    encoders: [RotaryEncoder<I>; 2],
    debounce_ms: u64,
}

impl<I, O, D> Poller<I, O, D>
where
    I: InputPin,
    O: OutputPin,
    D: DelayNs,
{
    pub fn new(pins: InputPins<I, O>, delay: D, cfg: &InputConfig) -> Self {
        Self {
            single_row: pins.single_row,
            single_row_records: [DebounceRecord::new(); SINGLE_ROW_COUNT],
            matrix: SwitchMatrix::new(pins.matrix_rows, pins.matrix_cols, delay, cfg),
            encoders: [
                RotaryEncoder::new(EncoderId::Volume, pins.encoder_volume, cfg),
                RotaryEncoder::new(EncoderId::Hue, pins.encoder_hue, cfg),
            ],
            debounce_ms: cfg.debounce_ms,
        }
    }

    /// Sample every line once.
    pub fn poll(&mut self, now_ms: u64) -> InputEvents {
        let mut events = InputEvents::new();

        for (i, (pin, record)) in self
            .single_row
            .iter_mut()
            .zip(self.single_row_records.iter_mut())
            .enumerate()
        {
            let active = match pin.is_low() {
                Ok(low) => low,
                Err(_) => {
                    warn!("Switch {}: read error", i + 1);
                    false
                }
            };
            if record.accept(now_ms, active, self.debounce_ms) {
                push_event(&mut events, InputEvent::SwitchPressed(SwitchId::SingleRow(i as u8)));
            }
        }

        self.matrix.scan(now_ms, &mut events);

        for encoder in &mut self.encoders {
            encoder.poll(now_ms, &mut events);
        }

        events
    }

    pub fn encoder_value(&self, id: EncoderId) -> i32 {
        self.encoders
            .iter()
            .find(|e| e.id() == id)
            .map_or(0, RotaryEncoder::value)
    }
}

/// Append an event, logging instead of panicking if the tick overflows.
pub(crate) fn push_event(events: &mut InputEvents, event: InputEvent) {
    if events.push(event).is_err() {
        warn!("Input: event buffer full, dropped {event:?}");
    }
}
