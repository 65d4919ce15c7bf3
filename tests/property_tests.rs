//! Property tests for the input and safety primitives.
//!
//! Runs on host (x86_64) only: proptest is not available for ESP32 targets.
//! On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use proptest::prelude::*;

use desk_console::app::ports::DisplayPort;
use desk_console::config::{DeskConfig, FanConfig, InputConfig, UiConfig};
use desk_console::control::fan::curve_duty;
use desk_console::desk::{DeskMotionController, Direction, MotionState};
use desk_console::drivers::relay::{Relay, RelayPair};
use desk_console::events::{InputEvent, InputEvents};
use desk_console::input::debounce::DebounceRecord;
use desk_console::input::encoder::{EncoderPins, RotaryEncoder};
use desk_console::ui::{UiState, VolumeAction};

// ── Test doubles ──────────────────────────────────────────────

#[derive(Clone)]
struct Shared(Rc<Cell<bool>>);

impl ErrorType for Shared {
    type Error = Infallible;
}

impl InputPin for Shared {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.0.get())
    }
    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.0.get())
    }
}

impl OutputPin for Shared {
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

fn line(level: bool) -> Shared {
    Shared(Rc::new(Cell::new(level)))
}

// ── Debounce ──────────────────────────────────────────────────

proptest! {
    /// Two accepted presses are always more than the interval apart, for
    /// any non-decreasing sample times and any levels.
    #[test]
    fn accepted_presses_respect_interval(
        steps in proptest::collection::vec((0u64..400, any::<bool>()), 1..200),
        interval in 1u64..300,
    ) {
        let mut rec = DebounceRecord::new();
        let mut now = 0u64;
        let mut last: Option<u64> = None;
        for (dt, active) in steps {
            now += dt;
            if rec.accept(now, active, interval) {
                prop_assert!(active);
                if let Some(prev) = last {
                    prop_assert!(now - prev > interval);
                }
                last = Some(now);
            }
        }
    }

    /// A clock that jumps backwards never panics and never accepts inside
    /// the window of the last press.
    #[test]
    fn backwards_clock_is_suppressed(first in 1_000u64..100_000, back in 1u64..1_000) {
        let mut rec = DebounceRecord::new();
        prop_assert!(rec.accept(first, true, 150));
        prop_assert!(!rec.accept(first - back, true, 150));
    }
}

// ── Relay exclusion ───────────────────────────────────────────

proptest! {
    /// Whatever the sequence of energize/release calls, both relays are
    /// never closed together, at the pin level or in the book-keeping.
    #[test]
    fn relays_never_both_closed(ops in proptest::collection::vec(0u8..4, 0..64)) {
        let up = line(true);
        let down = line(true);
        let mut pair = RelayPair::new(up.clone(), down.clone(), true);
        for op in ops {
            match op {
                0 => pair.energize(Relay::Up).unwrap(),
                1 => pair.energize(Relay::Down).unwrap(),
                2 => pair.release(Relay::Up).unwrap(),
                _ => pair.release_all(),
            }
            // Active-low: a closed relay is a low pin.
            prop_assert!(up.0.get() || down.0.get());
            prop_assert!(!(pair.is_energized(Relay::Up) && pair.is_energized(Relay::Down)));
        }
    }

    /// The desk controller's state always matches the relay that is closed,
    /// and any movement that runs past the limit is cut on the next check.
    #[test]
    fn desk_state_tracks_relays(
        ops in proptest::collection::vec((0u8..4, 0u64..3_000), 0..64),
    ) {
        let cfg = DeskConfig::default();
        let up = line(true);
        let down = line(true);
        let mut desk = DeskMotionController::new(up.clone(), down.clone(), &cfg, &UiConfig::default());
        let mut ui = NullUi;
        let mut now = 0u64;
        for (op, dt) in ops {
            now += dt;
            match op {
                0 => { desk.start(Direction::Up, now, &mut ui); }
                1 => { desk.start(Direction::Down, now, &mut ui); }
                2 => { desk.stop(&mut ui); }
                _ => {}
            }
            let before = desk.state();
            let tripped = desk.check_safety_timeout(now, &mut ui);
            if let Some(since) = before.since_ms() {
                prop_assert_eq!(tripped.is_some(), now - since > cfg.max_movement_ms);
            }

            match desk.state() {
                MotionState::Idle => prop_assert!(up.0.get() && down.0.get()),
                MotionState::MovingUp { since_ms } => {
                    prop_assert!(!up.0.get() && down.0.get());
                    prop_assert!(now - since_ms <= cfg.max_movement_ms);
                }
                MotionState::MovingDown { since_ms } => {
                    prop_assert!(up.0.get() && !down.0.get());
                    prop_assert!(now - since_ms <= cfg.max_movement_ms);
                }
            }
        }
    }
}

// ── Encoder ───────────────────────────────────────────────────

proptest! {
    /// The encoder value equals (clockwise - counter-clockwise) events, and
    /// only CLK falling edges ever produce one.
    #[test]
    fn encoder_value_matches_events(
        samples in proptest::collection::vec((any::<bool>(), any::<bool>()), 0..300),
    ) {
        let clk = line(true);
        let dt = line(true);
        let pins = EncoderPins { clk: clk.clone(), dt: dt.clone(), sw: line(true) };
        let mut enc = RotaryEncoder::new(
            desk_console::events::EncoderId::Volume,
            pins,
            &InputConfig::default(),
        );

        let mut prev_clk = true;
        let mut expected = 0i32;
        for (i, (c, d)) in samples.into_iter().enumerate() {
            clk.0.set(c);
            dt.0.set(d);
            let mut events = InputEvents::new();
            enc.poll(i as u64 * 5, &mut events);

            let turns: Vec<_> = events
                .iter()
                .filter_map(|e| match e {
                    InputEvent::EncoderTurned(_, r) => Some(r.step()),
                    _ => None,
                })
                .collect();
            if prev_clk && !c {
                prop_assert_eq!(turns.len(), 1);
                prop_assert_eq!(turns[0], if d { 1 } else { -1 });
            } else {
                prop_assert!(turns.is_empty());
            }
            expected += turns.iter().sum::<i32>();
            prev_clk = c;
        }
        prop_assert_eq!(enc.value(), expected);
    }
}

// ── Fan curve ─────────────────────────────────────────────────

proptest! {
    /// Turning the pot towards the "off" end never speeds the fan up.
    #[test]
    fn fan_curve_is_non_increasing(a in 0u16..4096, b in 0u16..4096) {
        let cfg = FanConfig::default();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(curve_duty(&cfg, lo) >= curve_duty(&cfg, hi));
    }
}
