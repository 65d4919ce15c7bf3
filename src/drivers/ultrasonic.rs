//! HC-SR04 style ultrasonic ranger.
//!
//! A short trigger pulse starts a ping; the sensor answers with an echo
//! pulse whose width is the round-trip time of flight.  Both waits (for the
//! echo to start and for it to end) are bounded spins against the monotonic
//! clock, so a missing or stuck echo costs at most two timeouts.
//!
//! ## Distance
//!
//! `distance_cm = pulse_us * 0.0343 / 2`, i.e. 343 m/s, the speed of sound
//! in dry air at about 20 °C.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::{debug, warn};

use crate::app::ports::MonotonicClock;
use crate::config::SonarConfig;
use crate::error::SensorError;

/// Speed of sound in cm per µs (dry air, 20 °C).
pub const SPEED_OF_SOUND_CM_PER_US: f32 = 0.0343;

/// Settle time with the trigger held low before the pulse.
const TRIGGER_SETTLE_US: u32 = 2;

/// One-way distance for a round-trip echo of `pulse_us`.
pub fn pulse_to_cm(pulse_us: u64) -> f32 {
    pulse_us as f32 * SPEED_OF_SOUND_CM_PER_US / 2.0
}

pub struct UltrasonicRanger<T, E, D, C> {
    trigger: T,
    echo: E,
    delay: D,
    clock: C,
    timeout_us: u64,
    trigger_pulse_us: u32,
    timeouts: u32,
}

impl<T, E, D, C> UltrasonicRanger<T, E, D, C>
where
    T: OutputPin,
    E: InputPin,
    D: DelayNs,
    C: MonotonicClock,
{
    pub fn new(trigger: T, echo: E, delay: D, clock: C, cfg: &SonarConfig) -> Self {
        Self {
            trigger,
            echo,
            delay,
            clock,
            timeout_us: u64::from(cfg.timeout_us),
            trigger_pulse_us: cfg.trigger_pulse_us,
            timeouts: 0,
        }
    }

    /// Ping once.  `None` when either echo wait timed out or a line failed.
    pub fn measure_distance(&mut self) -> Option<f32> {
        match self.ping() {
            Ok(pulse_us) => {
                let cm = pulse_to_cm(pulse_us);
                debug!("Sonar: echo {pulse_us}us -> {cm:.1}cm");
                Some(cm)
            }
            Err(SensorError::EchoTimeout) => {
                self.timeouts = self.timeouts.saturating_add(1);
                debug!("Sonar: echo timeout (total {})", self.timeouts);
                None
            }
            Err(e) => {
                warn!("Sonar: {e}");
                None
            }
        }
    }

    /// Echo waits that ran out since boot.
    pub fn timeout_count(&self) -> u32 {
        self.timeouts
    }

    fn ping(&mut self) -> Result<u64, SensorError> {
        self.send_trigger()?;
        self.wait_for_echo(true)?;
        let rise = self.clock.now_us();
        self.wait_for_echo(false)?;
        let fall = self.clock.now_us();
        Ok(fall.saturating_sub(rise))
    }

    fn send_trigger(&mut self) -> Result<(), SensorError> {
        self.trigger
            .set_low()
            .map_err(|_| SensorError::TriggerFailed)?;
        self.delay.delay_us(TRIGGER_SETTLE_US);
        self.trigger
            .set_high()
            .map_err(|_| SensorError::TriggerFailed)?;
        self.delay.delay_us(self.trigger_pulse_us);
        self.trigger
            .set_low()
            .map_err(|_| SensorError::TriggerFailed)
    }

    /// Spin until the echo line reads `high`, at most `timeout_us`.
    fn wait_for_echo(&mut self, high: bool) -> Result<(), SensorError> {
        let start = self.clock.now_us();
        loop {
            let level = self
                .echo
                .is_high()
                .map_err(|_| SensorError::GpioReadFailed)?;
            if level == high {
                return Ok(());
            }
            if self.clock.now_us().saturating_sub(start) > self.timeout_us {
                return Err(SensorError::EchoTimeout);
            }
        }
    }
}
