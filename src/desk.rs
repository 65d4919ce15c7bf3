//! Desk motion controller.
//!
//! Owns the UP/DOWN relay pair and is the only code that moves the desk.
//!
//! ```text
//!            start(Up)              start(Down)
//!   MovingUp ◀──────── Idle ────────▶ MovingDown
//!       │               ▲                  │
//!       └── stop() ─────┴───── stop() ─────┘
//! ```
//!
//! A reversal goes through `stop()`, so both relays are open before the
//! other one closes.  Any movement running longer than `max_movement_ms`
//! is force-stopped by [`DeskMotionController::check_safety_timeout`],
//! which the poll loop calls on every tick whether or not a button changed.

use embedded_hal::digital::OutputPin;
use log::{debug, error, info, warn};

use crate::app::ports::DisplayPort;
use crate::config::{DeskConfig, UiConfig};
use crate::drivers::relay::{Relay, RelayPair};
use crate::ui::UiState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn relay(self) -> Relay {
        match self {
            Self::Up => Relay::Up,
            Self::Down => Relay::Down,
        }
    }
}

/// Desk motion state.  The start time only exists while moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Idle,
    MovingUp { since_ms: u64 },
    MovingDown { since_ms: u64 },
}

impl MotionState {
    pub fn direction(self) -> Option<Direction> {
        match self {
            Self::Idle => None,
            Self::MovingUp { .. } => Some(Direction::Up),
            Self::MovingDown { .. } => Some(Direction::Down),
        }
    }

    pub fn since_ms(self) -> Option<u64> {
        match self {
            Self::Idle => None,
            Self::MovingUp { since_ms } | Self::MovingDown { since_ms } => Some(since_ms),
        }
    }
}

pub struct DeskMotionController<P> {
    relays: RelayPair<P>,
    state: MotionState,
    max_movement_ms: u64,
    moving_display_ms: u32,
    event_display_ms: u32,
    height_cm: Option<f32>,
}

impl<P: OutputPin> DeskMotionController<P> {
    /// Boots Idle with both relays released.
    pub fn new(relay_up: P, relay_down: P, desk: &DeskConfig, ui: &UiConfig) -> Self {
        Self {
            relays: RelayPair::new(relay_up, relay_down, desk.relay_active_low),
            state: MotionState::Idle,
            max_movement_ms: desk.max_movement_ms,
            moving_display_ms: ui.desk_moving_display_ms,
            event_display_ms: ui.event_display_ms,
            height_cm: None,
        }
    }

    /// Start moving in `direction`.
    ///
    /// Returns `false` when the desk was already moving that way (no-op).
    pub fn start(&mut self, direction: Direction, now_ms: u64, ui: &mut impl DisplayPort) -> bool {
        match self.state.direction() {
            Some(d) if d == direction => return false,
            Some(_) => {
                info!("Desk: reversing to {:?}", direction);
                self.stop(ui);
            }
            None => {}
        }

        if let Err(e) = self.relays.energize(direction.relay()) {
            // Relays are left released; the desk stays Idle.
            warn!("Desk: cannot start {:?}: {}", direction, e);
            self.relays.release_all();
            return false;
        }

        self.state = match direction {
            Direction::Up => MotionState::MovingUp { since_ms: now_ms },
            Direction::Down => MotionState::MovingDown { since_ms: now_ms },
        };
        info!("Desk: moving {:?} at t={}ms", direction, now_ms);

        ui.set_desk_context(self.height_cm, true, direction == Direction::Up);
        ui.set_ui_state(UiState::Desk, self.moving_display_ms);
        true
    }

    /// Release both relays and go Idle.  Returns the state that was left.
    pub fn stop(&mut self, ui: &mut impl DisplayPort) -> MotionState {
        let previous = self.state;
        self.relays.release_all();
        self.state = MotionState::Idle;
        if previous != MotionState::Idle {
            info!("Desk: stopped (was {:?})", previous);
        }
        ui.set_desk_context(self.height_cm, false, false);
        ui.set_ui_state(UiState::Desk, self.event_display_ms);
        previous
    }

    /// Force a stop if the current movement has outlived the limit.
    ///
    /// Returns the elapsed time of the movement that was cut.  The forced
    /// stop leaves the controller Idle, so one runaway movement is reported
    /// once.
    pub fn check_safety_timeout(&mut self, now_ms: u64, ui: &mut impl DisplayPort) -> Option<u64> {
        let since = self.state.since_ms()?;
        let elapsed = now_ms.saturating_sub(since);
        if elapsed <= self.max_movement_ms {
            return None;
        }
        error!(
            "Desk: movement {:?} ran {}ms (limit {}ms), emergency stop",
            self.state.direction(),
            elapsed,
            self.max_movement_ms
        );
        self.stop(ui);
        Some(elapsed)
    }

    /// Feed the latest ranger result; `None` keeps the previous height.
    pub fn record_height(&mut self, height_cm: Option<f32>) {
        let Some(h) = height_cm else { return };
        self.height_cm = Some(h);
        if let Some(direction) = self.state.direction() {
            debug!("Desk: {:?} at {:.1}cm", direction, h);
        }
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn height_cm(&self) -> Option<f32> {
        self.height_cm
    }

    pub fn is_energized(&self, relay: Relay) -> bool {
        self.relays.is_energized(relay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;

    struct NullPin;

    impl ErrorType for NullPin {
        type Error = Infallible;
    }

    impl OutputPin for NullPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Infallible> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Screen {
        states: Vec<(UiState, u32)>,
        desk: Option<(Option<f32>, bool, bool)>,
    }

    impl DisplayPort for Screen {
        fn set_desk_context(&mut self, height_cm: Option<f32>, moving: bool, moving_up: bool) {
            self.desk = Some((height_cm, moving, moving_up));
        }
        fn set_ui_state(&mut self, state: UiState, duration_ms: u32) {
            self.states.push((state, duration_ms));
        }
        fn set_fan_context(&mut self, _percent: u8, _active: bool) {}
        fn set_hue_context(&mut self, _brightness_percent: u8, _lights_on: bool) {}
        fn set_volume_context(&mut self, _action: crate::ui::VolumeAction) {}
        fn set_window_context(&mut self, _opening: bool) {}
    }

    fn desk() -> DeskMotionController<NullPin> {
        DeskMotionController::new(NullPin, NullPin, &DeskConfig::default(), &UiConfig::default())
    }

    #[test]
    fn boots_idle_and_released() {
        let d = desk();
        assert_eq!(d.state(), MotionState::Idle);
        assert!(!d.is_energized(Relay::Up));
        assert!(!d.is_energized(Relay::Down));
    }

    #[test]
    fn start_records_time_and_sets_ui() {
        let mut d = desk();
        let mut ui = Screen::default();
        assert!(d.start(Direction::Up, 500, &mut ui));
        assert_eq!(d.state(), MotionState::MovingUp { since_ms: 500 });
        assert!(d.is_energized(Relay::Up));
        assert_eq!(ui.desk, Some((None, true, true)));
        assert_eq!(ui.states.last(), Some(&(UiState::Desk, 10_000)));
    }

    #[test]
    fn repeated_start_keeps_original_time() {
        let mut d = desk();
        let mut ui = Screen::default();
        d.start(Direction::Down, 100, &mut ui);
        assert!(!d.start(Direction::Down, 900, &mut ui));
        assert_eq!(d.state(), MotionState::MovingDown { since_ms: 100 });
    }

    #[test]
    fn reversal_swaps_relays() {
        let mut d = desk();
        let mut ui = Screen::default();
        d.start(Direction::Up, 0, &mut ui);
        d.start(Direction::Down, 50, &mut ui);
        assert!(!d.is_energized(Relay::Up));
        assert!(d.is_energized(Relay::Down));
        assert_eq!(d.state(), MotionState::MovingDown { since_ms: 50 });
    }

    #[test]
    fn stop_is_idempotent() {
        let mut d = desk();
        let mut ui = Screen::default();
        d.start(Direction::Up, 0, &mut ui);
        assert_eq!(d.stop(&mut ui), MotionState::MovingUp { since_ms: 0 });
        assert_eq!(d.stop(&mut ui), MotionState::Idle);
        assert!(!d.is_energized(Relay::Up));
        assert_eq!(ui.states.last(), Some(&(UiState::Desk, 3_000)));
    }

    #[test]
    fn timeout_boundary() {
        let mut d = desk();
        let mut ui = Screen::default();
        d.start(Direction::Up, 0, &mut ui);
        assert_eq!(d.check_safety_timeout(10_000, &mut ui), None);
        assert_eq!(d.state(), MotionState::MovingUp { since_ms: 0 });
        assert_eq!(d.check_safety_timeout(10_001, &mut ui), Some(10_001));
        assert_eq!(d.state(), MotionState::Idle);
        assert!(!d.is_energized(Relay::Up));
        // Already idle: not reported again.
        assert_eq!(d.check_safety_timeout(20_000, &mut ui), None);
    }

    #[test]
    fn height_kept_across_timeouts() {
        let mut d = desk();
        d.record_height(Some(98.0));
        d.record_height(None);
        assert_eq!(d.height_cm(), Some(98.0));
    }
}
