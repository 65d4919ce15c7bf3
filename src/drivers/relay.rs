//! Desk motor relay pair (UP / DOWN).
//!
//! Two single-channel relay modules switch the desk controller's up and
//! down contacts.  Closing both at once shorts the motor supply, so the
//! pair is only ever driven through [`RelayPair::energize`], which releases
//! the opposite relay first and refuses to continue if that fails.
//!
//! ## Polarity
//!
//! The console's modules energize on a low input; `active_low` flips the
//! written level for boards that use high-side drivers.

use embedded_hal::digital::{OutputPin, PinState};
use log::{error, warn};

use crate::error::ActuatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relay {
    Up,
    Down,
}

impl Relay {
    pub fn other(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

pub struct RelayPair<P> {
    up: P,
    down: P,
    active_low: bool,
    up_energized: bool,
    down_energized: bool,
}

impl<P: OutputPin> RelayPair<P> {
    /// Takes both outputs and releases them.
    pub fn new(up: P, down: P, active_low: bool) -> Self {
        let mut pair = Self {
            up,
            down,
            active_low,
            up_energized: false,
            down_energized: false,
        };
        pair.release_all();
        pair
    }

    /// Close `relay`, releasing the other one first.
    pub fn energize(&mut self, relay: Relay) -> Result<(), ActuatorError> {
        self.release(relay.other())?;
        if let Err(e) = self.write(relay, true) {
            error!("Relay {:?}: energize failed", relay);
            return Err(e);
        }
        *self.flag_mut(relay) = true;
        debug_assert!(!(self.up_energized && self.down_energized));
        Ok(())
    }

    /// Open one relay.
    pub fn release(&mut self, relay: Relay) -> Result<(), ActuatorError> {
        let result = self.write(relay, false);
        if result.is_err() {
            warn!("Relay {:?}: release write failed", relay);
        } else {
            *self.flag_mut(relay) = false;
        }
        result
    }

    /// Open both relays.  Write failures are logged and otherwise ignored.
    pub fn release_all(&mut self) {
        let _ = self.release(Relay::Up);
        let _ = self.release(Relay::Down);
    }

    /// Whether `relay` was last commanded closed.
    pub fn is_energized(&self, relay: Relay) -> bool {
        match relay {
            Relay::Up => self.up_energized,
            Relay::Down => self.down_energized,
        }
    }

    fn flag_mut(&mut self, relay: Relay) -> &mut bool {
        match relay {
            Relay::Up => &mut self.up_energized,
            Relay::Down => &mut self.down_energized,
        }
    }

    fn write(&mut self, relay: Relay, energized: bool) -> Result<(), ActuatorError> {
        let high = energized != self.active_low;
        let pin = match relay {
            Relay::Up => &mut self.up,
            Relay::Down => &mut self.down,
        };
        pin.set_state(PinState::from(high))
            .map_err(|_| ActuatorError::GpioWriteFailed)
    }
}
