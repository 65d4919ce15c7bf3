//! Fan speed from the front-panel potentiometer.
//!
//! ```text
//!   ADC ──▶ filter ──▶ zone / curve ──▶ 8-bit duty ──▶ LEDC PWM
//! ```
//!
//! The pot is wired so the reading falls as the knob turns up:
//!
//! | Filtered ADC              | Duty                               |
//! |---------------------------|------------------------------------|
//! | `>= off_threshold`        | 0, after N consecutive readings    |
//! | `<= max_threshold`        | 255                                |
//! | in between                | stepped table or linear ramp       |
//!
//! The off zone needs several readings in a row so wiper noise near the
//! end stop does not make the fan stutter.

use embedded_hal::pwm::SetDutyCycle;
use log::{debug, warn};

use crate::app::ports::AnalogInput;
use crate::config::{FanConfig, FanCurve};
use crate::error::ActuatorError;

pub const FULL_DUTY: u8 = 255;

/// What the fan is doing after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanStatus {
    pub duty: u8,
    pub percent: u8,
    pub active: bool,
}

impl FanStatus {
    fn from_duty(duty: u8) -> Self {
        Self {
            duty,
            percent: (u16::from(duty) * 100 / u16::from(FULL_DUTY)) as u8,
            active: duty > 0,
        }
    }
}

pub struct FanSpeedController<A, P> {
    adc: A,
    pwm: P,
    cfg: FanConfig,
    filtered: Option<u16>,
    off_confirmations: u8,
    duty: u8,
    /// Duty last written successfully; `None` forces the next write.
    applied: Option<u8>,
}

impl<A: AnalogInput, P: SetDutyCycle> FanSpeedController<A, P> {
    /// Takes the ADC channel and PWM output; the fan starts stopped.
    pub fn new(adc: A, pwm: P, cfg: FanConfig) -> Self {
        let mut fan = Self {
            adc,
            pwm,
            cfg,
            filtered: None,
            off_confirmations: 0,
            duty: 0,
            applied: None,
        };
        fan.apply(0);
        fan
    }

    /// Read the pot once and update the PWM output.
    pub fn update(&mut self) -> FanStatus {
        let raw = match self.adc.read_raw() {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Fan: {e}, keeping duty {}", self.duty);
                return FanStatus::from_duty(self.duty);
            }
        };

        let filtered = self.filter(raw);
        let target = if filtered >= self.cfg.off_threshold {
            self.off_confirmations = self.off_confirmations.saturating_add(1);
            if self.off_confirmations >= self.cfg.off_confirm_readings {
                0
            } else {
                self.duty
            }
        } else {
            self.off_confirmations = 0;
            curve_duty(&self.cfg, filtered)
        };

        if target != self.duty {
            debug!("Fan: adc={raw} filtered={filtered} duty {} -> {target}", self.duty);
        }
        self.duty = target;
        self.apply(target);
        FanStatus::from_duty(self.duty)
    }

    pub fn status(&self) -> FanStatus {
        FanStatus::from_duty(self.duty)
    }

    pub fn filtered(&self) -> Option<u16> {
        self.filtered
    }

    /// First sample as-is, big moves pass through, small moves are smoothed.
    fn filter(&mut self, raw: u16) -> u16 {
        let next = match self.filtered {
            None => raw,
            Some(prev) => {
                let delta = i32::from(raw) - i32::from(prev);
                if delta.unsigned_abs() >= u32::from(self.cfg.large_jump) {
                    raw
                } else {
                    // Arithmetic shift floors, so only small rises round to zero.
                    let step = match delta >> self.cfg.smoothing_shift {
                        0 => delta.signum(),
                        step => step,
                    };
                    (i32::from(prev) + step).clamp(0, i32::from(u16::MAX)) as u16
                }
            }
        };
        self.filtered = Some(next);
        next
    }

    fn apply(&mut self, duty: u8) {
        if self.applied == Some(duty) {
            return;
        }
        match self
            .pwm
            .set_duty_cycle_fraction(u16::from(duty), u16::from(FULL_DUTY))
        {
            Ok(()) => self.applied = Some(duty),
            Err(_) => {
                warn!("Fan: {} (duty {duty})", ActuatorError::PwmWriteFailed);
                self.applied = None;
            }
        }
    }
}

/// Duty for a filtered reading outside the off zone.
pub fn curve_duty(cfg: &FanConfig, filtered: u16) -> u8 {
    if filtered <= cfg.max_threshold {
        return FULL_DUTY;
    }
    match &cfg.curve {
        FanCurve::Stepped(steps) => steps
            .iter()
            .find(|s| s.adc_upper_bound >= filtered)
            .or(steps.last())
            .map_or(FULL_DUTY, |s| s.duty),
        FanCurve::Linear { min_duty } => {
            let span = u32::from(cfg.off_threshold.saturating_sub(cfg.max_threshold)).max(1);
            let above_max = u32::from(filtered.saturating_sub(cfg.max_threshold)).min(span);
            let range = u32::from(FULL_DUTY.saturating_sub(*min_duty));
            (u32::from(FULL_DUTY) - above_max * range / span) as u8
        }
    }
}
