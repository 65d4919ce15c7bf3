//! SSD1306 128x64 OLED on I2C.
//!
//! Text frames only: [`LINE_COUNT`] rows in the 8x13 font, 16 px apart, so
//! a [`Line`] of `LINE_WIDTH` characters spans the panel.  A frame is
//! composed in the driver's buffer and pushed with a single flush.
//!
//! The controller is (re)initialised lazily, on the first frame and again
//! after any bus error, so a panel that was unplugged or browned out comes
//! back without a reboot.
//!
//! [`LINE_WIDTH`]: crate::ui::LINE_WIDTH

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::FONT_8X13;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use embedded_hal::i2c::I2c;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};

use crate::error::ActuatorError;
use crate::ui::{LINE_COUNT, Line};

/// 7-bit bus address with SA0 tied low.
pub const OLED_I2C_ADDRESS: u8 = 0x3C;

/// Text row pitch in pixels.
const ROW_PITCH: i32 = 16;

type Panel<I> =
    Ssd1306<I2CInterface<I>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

pub struct Oled<I> {
    panel: Panel<I>,
    initialised: bool,
}

impl<I: I2c> Oled<I> {
    /// Wraps the bus; nothing is sent until the first [`draw`](Self::draw).
    pub fn new(i2c: I) -> Self {
        let panel = Ssd1306::new(
            I2CDisplayInterface::new(i2c),
            DisplaySize128x64,
            DisplayRotation::Rotate0,
        )
        .into_buffered_graphics_mode();
        Self {
            panel,
            initialised: false,
        }
    }

    pub fn draw(&mut self, lines: &[Line; LINE_COUNT]) -> Result<(), ActuatorError> {
        let result = self.compose_and_flush(lines);
        if result.is_err() {
            self.initialised = false;
        }
        result
    }

    fn compose_and_flush(&mut self, lines: &[Line; LINE_COUNT]) -> Result<(), ActuatorError> {
        if !self.initialised {
            self.panel
                .init()
                .map_err(|_| ActuatorError::DisplayWriteFailed)?;
            self.initialised = true;
        }

        self.panel
            .clear(BinaryColor::Off)
            .map_err(|_| ActuatorError::DisplayWriteFailed)?;
        let style = MonoTextStyle::new(&FONT_8X13, BinaryColor::On);
        for (row, text) in lines.iter().enumerate() {
            let origin = Point::new(0, row as i32 * ROW_PITCH);
            Text::with_baseline(text.as_str(), origin, style, Baseline::Top)
                .draw(&mut self.panel)
                .map_err(|_| ActuatorError::DisplayWriteFailed)?;
        }
        self.panel
            .flush()
            .map_err(|_| ActuatorError::DisplayWriteFailed)
    }
}
