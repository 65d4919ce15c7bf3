//! Console configuration parameters
//!
//! All tunable parameters for the desk console.  Values are compiled in;
//! the whole struct is logged as JSON at boot so a field build can be
//! checked against the bench configuration.

use embedded_hal::digital::PinState;
use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum number of breakpoints in a stepped fan curve.
pub const MAX_FAN_STEPS: usize = 8;

/// Number of Hue scenes reachable from the single-row switches.
pub const HUE_SCENE_COUNT: usize = 4;

/// DT level sampled at a CLK falling edge that means "clockwise".
///
/// Hardware calibration: the two encoder footprints on the console PCB read
/// DT high on a clockwise detent.  Flip this if a replacement encoder turns
/// the wrong way.
pub const ENCODER_CLOCKWISE_DT_LEVEL: Level = Level::High;

/// Minimum quiet interval after an accepted switch transition.
pub const DEBOUNCE_INTERVAL_MS: u64 = 150;

/// Dead-man limit for continuous desk movement.
pub const MAX_MOVEMENT_TIME_MS: u64 = 10_000;

/// Logic level of a digital line, as stored in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        matches!(self, Self::High)
    }

    #[must_use]
    pub fn inverted(self) -> Self {
        match self {
            Self::Low => Self::High,
            Self::High => Self::Low,
        }
    }
}

impl From<Level> for PinState {
    fn from(level: Level) -> Self {
        match level {
            Level::Low => PinState::Low,
            Level::High => PinState::High,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

// ---------------------------------------------------------------------------
// Sub-configurations
// ---------------------------------------------------------------------------

/// Switch, matrix and encoder scanning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Minimum interval between accepted presses of the same line (ms).
    pub debounce_ms: u64,
    /// Delay between driving a matrix row and sampling its columns (µs).
    pub matrix_settle_us: u32,
    /// Level a matrix row is driven to while it is being scanned.
    pub row_active_level: Level,
    /// DT level at a CLK falling edge that counts as a clockwise step.
    pub encoder_clockwise_dt_level: Level,
}

/// Desk relay interlock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeskConfig {
    /// Continuous movement longer than this is force-stopped (ms).
    pub max_movement_ms: u64,
    /// Relay modules on the console energize on a low input.
    pub relay_active_low: bool,
}

/// Ultrasonic height sensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SonarConfig {
    /// Upper bound for each of the two echo waits (µs).
    pub timeout_us: u32,
    /// Width of the trigger pulse (µs).
    pub trigger_pulse_us: u32,
    /// How often the poll loop samples the height (ms).
    pub height_sample_interval_ms: u64,
    /// Added to every raw reading to turn sensor distance into desk height.
    pub height_offset_cm: f32,
}

/// One breakpoint of a stepped fan curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanStep {
    /// Filtered ADC values up to and including this bound use `duty`.
    pub adc_upper_bound: u16,
    pub duty: u8,
}

/// How the potentiometer range between the max and off zones maps to duty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FanCurve {
    /// Ordered table; the first step whose bound is >= the value wins.
    Stepped(Vec<FanStep, MAX_FAN_STEPS>),
    /// Straight line from 255 at `max_threshold` down to `min_duty` at
    /// `off_threshold`.
    Linear { min_duty: u8 },
}

/// Fan speed from the potentiometer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanConfig {
    /// Filtered ADC at or above this is the off zone.
    pub off_threshold: u16,
    /// Filtered ADC at or below this is full speed.
    pub max_threshold: u16,
    /// Consecutive off-zone readings required before the fan stops.
    pub off_confirm_readings: u8,
    /// Raw changes at least this large bypass the smoothing filter.
    pub large_jump: u16,
    /// Smaller changes move the filter by delta >> shift.
    pub smoothing_shift: u8,
    pub curve: FanCurve,
}

/// How long the display holds an event screen before returning to main.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    pub desk_moving_display_ms: u32,
    pub event_display_ms: u32,
}

/// Capacity of a configured host name.
pub const HOST_CAP: usize = 64;
pub const HUE_API_KEY_CAP: usize = 64;
pub const HUE_GROUP_ID_CAP: usize = 8;
pub const HUE_SCENE_ID_CAP: usize = 24;

/// Outbound HTTP targets.  Credentials are left empty in the image and
/// filled in per installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub wifi_ssid: String<32>,
    pub wifi_password: String<64>,
    /// Host (and optional port) of the skylight remote controller.
    pub skylight_host: String<HOST_CAP>,
    /// Host of the Hue bridge.
    pub hue_bridge_host: String<HOST_CAP>,
    pub hue_api_key: String<HUE_API_KEY_CAP>,
    pub hue_group_id: String<HUE_GROUP_ID_CAP>,
    /// Scene ids recalled by single-row switches 1 to 4.
    pub hue_scene_ids: [String<HUE_SCENE_ID_CAP>; HUE_SCENE_COUNT],
    /// Brightness change per encoder detent (Hue scale 0-254).
    pub hue_brightness_step: u8,
    /// Brightness assumed at boot until the first change is sent.
    pub hue_initial_brightness: u8,
}

// ---------------------------------------------------------------------------
// Top-level configuration
// ---------------------------------------------------------------------------

/// Core console configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Poll loop period (ms).
    pub poll_interval_ms: u32,
    /// Telemetry event period (ms).
    pub telemetry_interval_ms: u64,
    /// Task watchdog timeout (s).
    pub watchdog_timeout_secs: u32,

    pub input: InputConfig,
    pub desk: DeskConfig,
    pub sonar: SonarConfig,
    pub fan: FanConfig,
    pub ui: UiConfig,
    pub network: NetworkConfig,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEBOUNCE_INTERVAL_MS,
            matrix_settle_us: 1_000,
            // Columns are pulled up, so a scanned row pulls its closed
            // cells low and every other row parks high.
            row_active_level: Level::Low,
            encoder_clockwise_dt_level: ENCODER_CLOCKWISE_DT_LEVEL,
        }
    }
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            max_movement_ms: MAX_MOVEMENT_TIME_MS,
            relay_active_low: true,
        }
    }
}

impl Default for SonarConfig {
    fn default() -> Self {
        Self {
            timeout_us: 50_000,
            trigger_pulse_us: 10,
            height_sample_interval_ms: 250,
            height_offset_cm: 30.0,
        }
    }
}

impl Default for FanConfig {
    fn default() -> Self {
        // The console pot tops out around 942 counts at the default
        // attenuation; duty falls as the reading rises.
        let steps = [
            FanStep { adc_upper_bound: 200, duty: 224 },
            FanStep { adc_upper_bound: 400, duty: 176 },
            FanStep { adc_upper_bound: 600, duty: 128 },
            FanStep { adc_upper_bound: 800, duty: 80 },
            FanStep { adc_upper_bound: 899, duty: 48 },
        ];
        Self {
            off_threshold: 900,
            max_threshold: 40,
            off_confirm_readings: 3,
            large_jump: 200,
            smoothing_shift: 2,
            curve: FanCurve::Stepped(steps.into_iter().collect()),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            desk_moving_display_ms: 10_000,
            event_display_ms: 3_000,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let mut hue_group_id = String::new();
        // "1" always fits in eight bytes.
        let _ = hue_group_id.push('1');
        Self {
            wifi_ssid: String::new(),
            wifi_password: String::new(),
            skylight_host: String::new(),
            hue_bridge_host: String::new(),
            hue_api_key: String::new(),
            hue_group_id,
            hue_scene_ids: Default::default(),
            hue_brightness_step: 16,
            hue_initial_brightness: 100,
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,         // 100 Hz
            telemetry_interval_ms: 60_000, // 1/min
            watchdog_timeout_secs: 10,
            input: InputConfig::default(),
            desk: DeskConfig::default(),
            sonar: SonarConfig::default(),
            fan: FanConfig::default(),
            ui: UiConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

impl ConsoleConfig {
    /// Reject combinations the control path cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll interval must be non-zero"));
        }
        if self.desk.max_movement_ms == 0 {
            return Err(Error::Config("desk movement limit must be non-zero"));
        }
        if self.sonar.timeout_us == 0 {
            return Err(Error::Config("sonar timeout must be non-zero"));
        }
        if self.fan.max_threshold >= self.fan.off_threshold {
            return Err(Error::Config("fan max threshold must be below off threshold"));
        }
        if self.fan.off_confirm_readings == 0 {
            return Err(Error::Config("fan off confirmation needs at least one reading"));
        }
        if self.fan.smoothing_shift > 15 {
            return Err(Error::Config("fan smoothing shift out of range"));
        }
        if let FanCurve::Stepped(steps) = &self.fan.curve {
            if steps.is_empty() {
                return Err(Error::Config("stepped fan curve is empty"));
            }
            let ordered = steps
                .windows(2)
                .all(|w| w[0].adc_upper_bound < w[1].adc_upper_bound && w[0].duty >= w[1].duty);
            if !ordered {
                return Err(Error::Config(
                    "fan steps must have rising bounds and non-increasing duty",
                ));
            }
        }
        Ok(())
    }
}
