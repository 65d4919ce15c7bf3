//! Fuzz target: `DeskMotionController`
//!
//! Drives arbitrary start/stop/safety-check sequences with arbitrary time
//! steps and asserts that both relays are never closed together and that
//! no movement survives a safety check past the limit.
//!
//! cargo fuzz run fuzz_desk_commands

#![no_main]

use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;

use desk_console::app::ports::DisplayPort;
use desk_console::config::{DeskConfig, UiConfig};
use desk_console::desk::{DeskMotionController, Direction};
use desk_console::drivers::relay::Relay;
use desk_console::ui::{UiState, VolumeAction};
use embedded_hal::digital::{ErrorType, OutputPin};
use libfuzzer_sys::fuzz_target;

#[derive(Clone)]
struct Pin(Rc<Cell<bool>>);

impl ErrorType for Pin {
    type Error = Infallible;
}

impl OutputPin for Pin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.set(false);
        Ok(())
    }
    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.set(true);
        Ok(())
    }
}

struct NullUi;

impl DisplayPort for NullUi {
    fn set_desk_context(&mut self, _: Option<f32>, _: bool, _: bool) {}
    fn set_ui_state(&mut self, _: UiState, _: u32) {}
    fn set_fan_context(&mut self, _: u8, _: bool) {}
    fn set_hue_context(&mut self, _: u8, _: bool) {}
    fn set_volume_context(&mut self, _: VolumeAction) {}
    fn set_window_context(&mut self, _: bool) {}
}

fuzz_target!(|data: &[u8]| {
    let cfg = DeskConfig::default();
    let up = Pin(Rc::new(Cell::new(false)));
    let down = Pin(Rc::new(Cell::new(false)));
    let mut desk = DeskMotionController::new(up.clone(), down.clone(), &cfg, &UiConfig::default());
    let mut ui = NullUi;
    let mut now = 0u64;

    for chunk in data.chunks(3) {
        let op = chunk[0];
        let dt = chunk.get(1..).map_or(0, |b| {
            b.iter().fold(0u64, |acc, &x| (acc << 8) | u64::from(x))
        });
        now = now.saturating_add(dt);

        match op % 4 {
            0 => {
                desk.start(Direction::Up, now, &mut ui);
            }
            1 => {
                desk.start(Direction::Down, now, &mut ui);
            }
            2 => {
                desk.stop(&mut ui);
            }
            _ => {}
        }
        desk.check_safety_timeout(now, &mut ui);

        // Active-low relays: low pin = closed.
        assert!(up.0.get() || down.0.get(), "both relays closed");
        assert!(!(desk.is_energized(Relay::Up) && desk.is_energized(Relay::Down)));
        if let Some(since) = desk.state().since_ms() {
            assert!(now.saturating_sub(since) <= cfg.max_movement_ms);
        }
    }
});
