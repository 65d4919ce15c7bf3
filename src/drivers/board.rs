//! `embedded-hal` wrappers over the raw [`hw_init`](super::hw_init)
//! accessors, and the [`EspBoard`] binding handed to the application core.
//!
//! The pins are configured once by `hw_init::init_peripherals`; these types
//! only carry the GPIO number or channel they talk to.

use core::convert::Infallible;
use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, ErrorType, InputPin, OutputPin};
use embedded_hal::pwm::{self, SetDutyCycle};

use super::hw_init;
use crate::adapters::time::Esp32TimeAdapter;
use crate::app::ports::{AnalogInput, Board, BoardIo};
use crate::error::SensorError;
use crate::input::encoder::EncoderPins;
use crate::input::InputPins;
use crate::pins;

/// ESP-IDF return code from a failed register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EspCode(pub i32);

impl fmt::Display for EspCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "esp_err {}", self.0)
    }
}

impl digital::Error for EspCode {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

impl pwm::Error for EspCode {
    fn kind(&self) -> pwm::ErrorKind {
        pwm::ErrorKind::Other
    }
}

// ── GPIO ──────────────────────────────────────────────────────

#[derive(Debug)]
pub struct GpioInput(i32);

impl ErrorType for GpioInput {
    type Error = Infallible;
}

impl InputPin for GpioInput {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(hw_init::gpio_read(self.0))
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!hw_init::gpio_read(self.0))
    }
}

#[derive(Debug)]
pub struct GpioOutput(i32);

impl ErrorType for GpioOutput {
    type Error = EspCode;
}

impl OutputPin for GpioOutput {
    fn set_low(&mut self) -> Result<(), EspCode> {
        hw_init::gpio_write(self.0, false).map_err(EspCode)
    }

    fn set_high(&mut self) -> Result<(), EspCode> {
        hw_init::gpio_write(self.0, true).map_err(EspCode)
    }
}

// ── LEDC ──────────────────────────────────────────────────────

#[derive(Debug)]
pub struct LedcPwm {
    channel: u32,
}

impl pwm::ErrorType for LedcPwm {
    type Error = EspCode;
}

impl SetDutyCycle for LedcPwm {
    fn max_duty_cycle(&self) -> u16 {
        (1u16 << pins::PWM_RESOLUTION_BITS) - 1
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), EspCode> {
        let duty = duty.min(self.max_duty_cycle()) as u8;
        hw_init::ledc_set(self.channel, duty).map_err(EspCode)
    }
}

// ── ADC ───────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Adc1Channel(u32);

impl AnalogInput for Adc1Channel {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        hw_init::adc1_read(self.0).map_err(|rc| {
            log::debug!("ADC1 CH{} read failed ({})", self.0, rc);
            SensorError::AdcReadFailed
        })
    }
}

// ── Delay ─────────────────────────────────────────────────────

/// Busy-wait delay for the matrix settle time and the trigger pulse.
#[derive(Debug, Clone, Copy, Default)]
pub struct RomDelay;

impl DelayNs for RomDelay {
    #[cfg(target_os = "espidf")]
    fn delay_ns(&mut self, ns: u32) {
        // SAFETY: ROM busy-wait, no shared state.
        unsafe { esp_idf_svc::sys::esp_rom_delay_us(ns.div_ceil(1_000)) };
    }

    #[cfg(not(target_os = "espidf"))]
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }
}

// ── Board binding ─────────────────────────────────────────────

/// The desk console PCB.
pub struct EspBoard;

impl Board for EspBoard {
    type Input = GpioInput;
    type Output = GpioOutput;
    type Delay = RomDelay;
    type Clock = Esp32TimeAdapter;
    type Adc = Adc1Channel;
    type Pwm = LedcPwm;
}

fn encoder_pins([clk, dt, sw]: [i32; 3]) -> EncoderPins<GpioInput> {
    EncoderPins {
        clk: GpioInput(clk),
        dt: GpioInput(dt),
        sw: GpioInput(sw),
    }
}

/// Hand every console line to the application core.
///
/// Call after `hw_init::init_peripherals` succeeded.
pub fn board_io() -> BoardIo<EspBoard> {
    BoardIo {
        inputs: InputPins {
            single_row: pins::SINGLE_ROW_GPIOS.map(GpioInput),
            matrix_rows: pins::MATRIX_ROW_GPIOS.map(GpioOutput),
            matrix_cols: pins::MATRIX_COL_GPIOS.map(GpioInput),
            encoder_volume: encoder_pins(pins::ENCODER1_GPIOS),
            encoder_hue: encoder_pins(pins::ENCODER2_GPIOS),
        },
        relay_up: GpioOutput(pins::RELAY_UP_GPIO),
        relay_down: GpioOutput(pins::RELAY_DOWN_GPIO),
        sonar_trigger: GpioOutput(pins::SONAR_TRIGGER_GPIO),
        sonar_echo: GpioInput(pins::SONAR_ECHO_GPIO),
        fan_adc: Adc1Channel(pins::FAN_POT_ADC1_CHANNEL),
        fan_pwm: LedcPwm {
            channel: hw_init::LEDC_CH_FAN,
        },
        delay: RomDelay,
        clock: Esp32TimeAdapter::new(),
    }
}
