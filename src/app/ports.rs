//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (display, HTTP, USB HID, event sinks, clocks) implement
//! these traits.  The [`AppService`](super::service::AppService) consumes
//! them via generics, so the domain core never touches an ESP-IDF API.
//!
//! GPIO, PWM and delay go through the `embedded-hal` traits directly; a
//! [`Board`] only names which concrete types bring-up hands over.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::pwm::SetDutyCycle;

use super::commands::NetCommand;
use super::events::AppEvent;
use crate::error::SensorError;
use crate::input::InputPins;
use crate::ui::{UiState, VolumeAction};

// ───────────────────────────────────────────────────────────────
// Display port (driven adapter: domain → screen)
// ───────────────────────────────────────────────────────────────

/// UI state setters.  The adapter owns layout and timing of the screen.
pub trait DisplayPort {
    /// Desk height and motion.  `None` keeps the last shown height.
    fn set_desk_context(&mut self, height_cm: Option<f32>, moving: bool, moving_up: bool);

    /// Show `state` for `duration_ms`, then fall back to the main screen.
    fn set_ui_state(&mut self, state: UiState, duration_ms: u32);

    fn set_fan_context(&mut self, percent: u8, active: bool);

    fn set_hue_context(&mut self, brightness_percent: u8, lights_on: bool);

    /// Last volume key sent to the host.
    fn set_volume_context(&mut self, action: VolumeAction);

    /// Last skylight command (`true` = opening).
    fn set_window_context(&mut self, opening: bool);
}

// ───────────────────────────────────────────────────────────────
// Network port (driven adapter: domain → HTTP collaborators)
// ───────────────────────────────────────────────────────────────

/// Fire-and-forget outbound commands.
pub trait NetworkPort {
    /// Queue `cmd`.  Returns `false` if it was dropped; the HTTP result is
    /// never reported back.
    fn send_command(&mut self, cmd: NetCommand) -> bool;
}

// ───────────────────────────────────────────────────────────────
// HID port (driven adapter: domain → USB host)
// ───────────────────────────────────────────────────────────────

/// Consumer and system control keys sent to the attached computer.
pub trait HidPort {
    fn send_volume_up(&mut self);
    fn send_volume_down(&mut self);
    fn send_mute(&mut self);
    fn send_sleep(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Time and analog input
// ───────────────────────────────────────────────────────────────

/// Monotonic, non-wrapping time since boot.
pub trait MonotonicClock {
    fn now_us(&self) -> u64;

    fn now_ms(&self) -> u64 {
        self.now_us() / 1_000
    }
}

/// One-shot ADC channel.
pub trait AnalogInput {
    /// Raw conversion result.
    fn read_raw(&mut self) -> Result<u16, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Board bring-up
// ───────────────────────────────────────────────────────────────

/// Binds the concrete peripheral types of one board.
pub trait Board {
    type Input: InputPin;
    type Output: OutputPin;
    /// Shared by the matrix scanner and the ranger.
    type Delay: DelayNs + Clone;
    /// Shared by the poll loop and the ranger.
    type Clock: MonotonicClock + Clone;
    type Adc: AnalogInput;
    type Pwm: SetDutyCycle;
}

/// Every configured peripheral the application core owns.
pub struct BoardIo<B: Board> {
    pub inputs: InputPins<B::Input, B::Output>,
    pub relay_up: B::Output,
    pub relay_down: B::Output,
    pub sonar_trigger: B::Output,
    pub sonar_echo: B::Input,
    pub fan_adc: B::Adc,
    pub fan_pwm: B::Pwm,
    pub delay: B::Delay,
    pub clock: B::Clock,
}
